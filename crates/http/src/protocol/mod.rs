//! Core HTTP protocol types shared by the codec and the connection layer.
//!
//! - **Preamble** ([`preamble`]): start line plus header block
//!   - [`Preamble`]: the message preamble as read off the wire
//!   - [`RequestLine`] / [`StatusLine`]: parsed views of the start line
//!
//! - **Body framing** ([`message`]):
//!   - [`PayloadSize`]: how a body is delimited on the wire
//!
//! - **Error Handling** ([`error`]):
//!   - [`HttpError`]: body relay errors, including the close-delimited sentinel
//!   - [`ParseError`]: malformed input and read failures
//!   - [`SendError`]: write failures
//!   - [`PreambleError`]: preamble read failure plus the bytes consumed

mod message;
pub use message::PayloadSize;

mod preamble;
pub use preamble::{Preamble, RequestLine, StatusLine, X_FORWARDED_FOR};

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::PreambleError;
pub use error::SendError;
