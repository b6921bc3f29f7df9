//! Uppercase echo protocol implementation.
//!
//! A line-oriented text service:
//! - Client sends: `<text>\n`
//! - Server responds: `<TEXT>\n`
//!
//! ## Protocol Format
//!
//! ```text
//! Request:  hello\n
//! Response: HELLO\n
//!
//! Request:  bye\n
//! Response: (none, connection is closed)
//! ```
//!
//! Lines are UTF-8 and may end with `\r\n`. `BYE` is matched in any case.
//! There is no line length limit and no idle timeout.

pub mod handler;
pub mod parser;
pub mod reader;

pub use handler::handle_connection;
