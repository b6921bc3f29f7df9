//! Buffered line reader over an async byte stream.

use bytes::BytesMut;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Initial read buffer size
const BUFFER_SIZE: usize = 4 * 1024;

/// Splits an async byte stream into text lines.
///
/// Bytes are accumulated until a `\n` arrives, so a line spread over several
/// reads is returned once. One reader is bound to one connection.
pub struct LineReader<R> {
    inner: R,
    buffer: BytesMut,
    /// Prefix of `buffer` already known to contain no `\n`.
    scanned: usize,
    eof: bool,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: BytesMut::with_capacity(BUFFER_SIZE),
            scanned: 0,
            eof: false,
        }
    }

    /// Return the next line with its terminator removed.
    ///
    /// Reads from the stream only when no complete line is buffered. At EOF a
    /// non-empty unterminated remainder is returned as a final line, after
    /// which `Ok(None)` is returned.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(pos) = find_lf(&self.buffer[self.scanned..]) {
                let end = self.scanned + pos;
                let line = self.buffer.split_to(end + 1);
                self.scanned = 0;
                return Ok(Some(decode(&line[..end])));
            }
            self.scanned = self.buffer.len();

            if self.eof {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let rest = self.buffer.split();
                self.scanned = 0;
                return Ok(Some(decode(&rest)));
            }

            let n = self.inner.read_buf(&mut self.buffer).await?;
            if n == 0 {
                self.eof = true;
            }
        }
    }

    /// Bytes received but not yet returned as a line.
    #[cfg(test)]
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }
}

/// Find \n in buffer.
fn find_lf(buffer: &[u8]) -> Option<usize> {
    buffer.iter().position(|&b| b == b'\n')
}

/// Strip an optional trailing \r and decode as UTF-8, replacing invalid sequences.
fn decode(line: &[u8]) -> String {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}
