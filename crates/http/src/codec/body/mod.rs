//! HTTP body handling for relaying request and response payloads
//!
//! Bodies are never reassembled: [`write_payload`] copies them from one
//! connection to the other as they arrive, using the framing announced by the
//! message preamble to find where they end.
//!
//! # Components
//!
//! - [`ChunkedDecoder`]: validating scanner for chunked transfer encoding
//! - [`write_payload`] / [`write_body`]: stream exactly one body
//!
//! # Features
//!
//! - Content-Length, chunked and close-delimited bodies
//! - Chunk framing relayed verbatim, extensions and trailers included
//! - Bytes past the end of the body stay in the reader

mod chunked_decoder;
mod payload_writer;

pub use chunked_decoder::{ChunkedDecoder, Decoded};
pub use payload_writer::{write_body, write_payload};
