//! HTTP preamble processing: reading the start line and header block off a
//! buffered stream, and writing them back out.
//!
//! - [`read_preamble`] / [`read_preamble_with_limits`]: line-oriented reader with
//!   size limits that never consumes past the end of the header block
//! - [`write_preamble`]: serializes a [`Preamble`](crate::protocol::Preamble)
//! - [`write_status`]: synthesizes a bodiless status-only response

mod header_decoder;
mod header_encoder;

pub use header_decoder::{MAX_LINE_BYTES, MAX_PREAMBLE_BYTES, PreambleLimits, read_preamble, read_preamble_with_limits};
pub use header_encoder::{encode_preamble, write_preamble, write_status};
