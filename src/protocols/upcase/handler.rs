//! Uppercase echo connection handler.

use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{info, trace};

use super::parser::{self, Command};
use super::reader::LineReader;

/// Handle an uppercase echo connection.
///
/// Reads lines until the client sends `BYE` or closes its side. Any read or
/// write error ends the session.
pub async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (reader, writer) = stream.into_split();
    serve(LineReader::new(reader), writer, peer).await?;
    Ok(())
}

/// Run the line loop over any reader/writer pair.
pub async fn serve<R, W>(
    mut lines: LineReader<R>,
    mut writer: W,
    peer: SocketAddr,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    while let Some(line) = lines.next_line().await? {
        info!(peer = %peer, line = %line, "Client has sent");

        match parser::parse(&line) {
            Command::Bye => {
                info!(peer = %peer, "Client has sent 'bye', closing connection");
                writer.shutdown().await?;
                return Ok(());
            }
            Command::Echo(upper) => {
                writer.write_all(&parser::response(&upper)).await?;
            }
        }
    }

    trace!(peer = %peer, "Connection closed by client");
    Ok(())
}
