use std::io;
use thiserror::Error;

/// Error produced while streaming a message body from one connection to another.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("read error: {source}")]
    ReadError {
        #[from]
        source: ParseError,
    },

    #[error("write error: {source}")]
    WriteError {
        #[from]
        source: SendError,
    },

    /// The body had no explicit length and ended when the peer closed the
    /// connection. Every byte was relayed, but the connection is finished.
    #[error("body ended by peer close after {written} bytes")]
    EofBody { written: u64 },
}

impl HttpError {
    /// Returns true for the close-delimited body sentinel.
    #[inline]
    pub fn is_eof_body(&self) -> bool {
        matches!(self, HttpError::EofBody { .. })
    }
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("line size exceed the limit {max_size}")]
    TooLongLine { max_size: usize },

    #[error("preamble size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargePreamble { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid start line: {reason}")]
    InvalidStartLine { reason: String },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("invalid transfer-encoding header: {reason}")]
    InvalidTransferEncoding { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("unexpected eof")]
    UnexpectedEof,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_long_line(max_size: usize) -> Self {
        Self::TooLongLine { max_size }
    }

    pub fn too_large_preamble(current_size: usize, max_size: usize) -> Self {
        Self::TooLargePreamble { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_start_line<S: ToString>(str: S) -> Self {
        Self::InvalidStartLine { reason: str.to_string() }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn invalid_transfer_encoding<S: ToString>(str: S) -> Self {
        Self::InvalidTransferEncoding { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// A preamble read failure together with the number of bytes consumed before it.
///
/// Zero consumed bytes means the peer went away (or idled out) before sending
/// anything, which callers treat as an ordinary disconnect rather than a
/// protocol error.
#[derive(Error, Debug)]
#[error("{source} (after {read} bytes)")]
pub struct PreambleError {
    read: usize,
    #[source]
    source: ParseError,
}

impl PreambleError {
    pub fn new(read: usize, source: ParseError) -> Self {
        Self { read, source }
    }

    /// Number of bytes consumed from the reader before the failure.
    #[inline]
    pub fn read(&self) -> usize {
        self.read
    }

    #[inline]
    pub fn is_empty_read(&self) -> bool {
        self.read == 0
    }

    pub fn parse_error(&self) -> &ParseError {
        &self.source
    }

    pub fn into_parse_error(self) -> ParseError {
        self.source
    }
}
