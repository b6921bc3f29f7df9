//! Uppercase echo protocol parser.

use bytes::BytesMut;

/// Parsed line command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Echo the line back, already uppercased.
    Echo(String),
    /// Close the connection without a reply.
    Bye,
}

/// Parse a received line.
///
/// The line is uppercased with full Unicode case mapping; a line whose
/// uppercase form is exactly `BYE` ends the session.
pub fn parse(line: &str) -> Command {
    let upper = line.to_uppercase();
    if upper == "BYE" {
        Command::Bye
    } else {
        Command::Echo(upper)
    }
}

/// Format a reply line.
pub fn response(text: &str) -> BytesMut {
    let mut resp = BytesMut::with_capacity(text.len() + 1);
    resp.extend_from_slice(text.as_bytes());
    resp.extend_from_slice(b"\n");
    resp
}
