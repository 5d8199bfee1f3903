//! Byte-exact HTTP/1.1 plumbing for reverse proxies
//!
//! This crate provides the pieces a proxy needs to move HTTP/1.1 messages from
//! one TCP connection to another without re-encoding them: a buffered
//! connection, a preamble reader and writer, and body relaying that honors the
//! message framing.
//!
//! # Features
//!
//! - Buffered connections with independently borrowable read and write halves
//! - Line-oriented preamble reading with per-line and total size limits
//! - Content-Length, chunked and close-delimited body relay
//! - Chunk framing validated but relayed verbatim
//! - Errors that report how far a read got, so an idle disconnect is not
//!   mistaken for a broken message
//!
//! # Example
//!
//! ```no_run
//! use simult_http::codec::{read_preamble, write_payload, write_preamble};
//! use simult_http::connection::BufConn;
//! use simult_http::protocol::PayloadSize;
//! use tokio::net::TcpStream;
//!
//! # async fn run(client: TcpStream, backend: TcpStream) -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = BufConn::new(client)?;
//! let mut backend = BufConn::new(backend)?;
//!
//! let preamble = read_preamble(client.reader()?).await?;
//! write_preamble(backend.writer()?, &preamble).await?;
//! let payload_size = PayloadSize::from_headers(preamble.headers(), true)?;
//! write_payload(backend.writer()?, client.reader()?, payload_size).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`connection`]: [`connection::BufConn`] and socket options
//! - [`protocol`]: preamble, body framing and error types
//! - [`codec`]: reading, writing and relaying messages
//!
//! # Error Handling
//!
//! - [`protocol::HttpError`]: body relay errors, with the close-delimited body
//!   sentinel [`protocol::HttpError::EofBody`]
//! - [`protocol::ParseError`]: malformed input and read failures
//! - [`protocol::SendError`]: write failures
//! - [`protocol::PreambleError`]: a preamble read failure and the bytes it consumed
//!
//! # Limitations
//!
//! - HTTP/1.x only
//! - No TLS
//! - Maximum preamble line: 1 MiB, maximum preamble: 10 MiB (configurable)
//! - Maximum number of headers: 256

pub mod codec;
pub mod connection;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
