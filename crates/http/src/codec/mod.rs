//! HTTP/1.x codec for proxies
//!
//! This module reads and writes message preambles and relays message bodies
//! between two buffered streams. Nothing is re-encoded on the way through: the
//! start line is kept as received, headers are only rewritten where the caller
//! changes them, and bodies keep their original framing.
//!
//! # Architecture
//!
//! - Preamble handling via the [`header`] functions:
//!   - [`read_preamble`]: line-oriented reader with size limits
//!   - [`write_preamble`] and [`write_status`]: serialization
//! - Body handling via the [`body`] functions:
//!   - [`write_payload`] / [`write_body`]: streaming copy of one body
//!   - [`ChunkedDecoder`]: chunked framing validation
//!
//! # Example
//!
//! ```no_run
//! use simult_http::codec::{read_preamble, write_payload, write_preamble};
//! use simult_http::protocol::{HttpError, PayloadSize};
//! use tokio::io::{AsyncBufRead, AsyncWrite};
//!
//! async fn forward<R, W>(reader: &mut R, writer: &mut W) -> Result<u64, HttpError>
//! where
//!     R: AsyncBufRead + Unpin,
//!     W: AsyncWrite + Unpin,
//! {
//!     let preamble = read_preamble(reader).await.map_err(|e| e.into_parse_error())?;
//!     write_preamble(writer, &preamble).await?;
//!     let payload_size = PayloadSize::from_headers(preamble.headers(), true)?;
//!     write_payload(writer, reader, payload_size).await
//! }
//! ```

mod body;
mod header;

pub use body::{ChunkedDecoder, Decoded, write_body, write_payload};
pub use header::{
    MAX_LINE_BYTES, MAX_PREAMBLE_BYTES, PreambleLimits, encode_preamble, read_preamble, read_preamble_with_limits, write_preamble,
    write_status,
};
