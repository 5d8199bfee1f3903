use http::header::{CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderValue, Method};

use crate::ensure;
use crate::protocol::ParseError;

/// Represents how the body of an HTTP message is framed on the wire.
///
/// This enum is used to determine how the payload should be relayed:
/// - Known length: copy exactly that many bytes
/// - Chunked: relay chunk framing up to and including the last chunk and trailers
/// - Empty: no payload at all
/// - Close: the payload runs until the peer closes the connection (responses only)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// Payload with known length in bytes
    Length(u64),
    /// Payload using chunked transfer encoding
    Chunked,
    /// Empty payload (no body)
    Empty,
    /// Payload delimited by connection close
    Close,
}

impl PayloadSize {
    /// Returns true if the payload uses chunked transfer encoding
    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    /// Returns true if the payload is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty)
    }

    /// Returns true if the payload ends only when the connection closes
    #[inline]
    pub fn is_close(&self) -> bool {
        matches!(self, PayloadSize::Close)
    }

    /// Determines body framing from the message headers, following
    /// [RFC 9112 section 6.3](https://www.rfc-editor.org/rfc/rfc9112.html#name-message-body-length).
    ///
    /// Requests without a Content-Length or chunked marker have no body; responses
    /// without either are delimited by connection close.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if:
    /// - Both Content-Length and Transfer-Encoding headers are present
    /// - Content-Length values are invalid or disagree
    /// - A request carries a Transfer-Encoding whose final coding is not chunked
    pub fn from_headers(headers: &HeaderMap, is_request: bool) -> Result<Self, ParseError> {
        let has_te = headers.contains_key(TRANSFER_ENCODING);
        let has_cl = headers.contains_key(CONTENT_LENGTH);

        match (has_te, has_cl) {
            (false, false) if is_request => Ok(PayloadSize::Empty),
            (false, false) => Ok(PayloadSize::Close),

            (true, false) => {
                if is_chunked(headers.get_all(TRANSFER_ENCODING).iter().last()) {
                    Ok(PayloadSize::Chunked)
                } else if is_request {
                    Err(ParseError::invalid_transfer_encoding("final coding of a request must be chunked"))
                } else {
                    Ok(PayloadSize::Close)
                }
            }

            (false, true) => parse_content_length(headers).map(PayloadSize::Length),

            (true, true) => Err(ParseError::invalid_content_length("transfer_encoding and content_length both present in headers")),
        }
    }

    /// Determines the framing of a response to a request made with `method`.
    ///
    /// Responses to HEAD and responses with status 1xx, 204 or 304 never carry
    /// a body, whatever their headers announce.
    pub fn for_response(method: &Method, status: u16, headers: &HeaderMap) -> Result<Self, ParseError> {
        if method == Method::HEAD || (100..200).contains(&status) || status == 204 || status == 304 {
            return Ok(PayloadSize::Empty);
        }
        Self::from_headers(headers, false)
    }
}

/// Parses every Content-Length value (including comma separated lists) and
/// requires them to agree.
fn parse_content_length(headers: &HeaderMap) -> Result<u64, ParseError> {
    let mut length = None;
    for value in headers.get_all(CONTENT_LENGTH) {
        let cl_str = value.to_str().map_err(|_| ParseError::invalid_content_length("value can't to_str"))?;
        for item in cl_str.split(',') {
            let item = item.trim();
            ensure!(!item.is_empty() && item.bytes().all(|b| b.is_ascii_digit()), ParseError::invalid_content_length(format!("value {cl_str} is not u64")));
            let parsed = item.parse::<u64>().map_err(|_| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))?;
            match length {
                Some(previous) if previous != parsed => {
                    return Err(ParseError::invalid_content_length(format!("conflicting values {previous} and {parsed}")));
                }
                _ => length = Some(parsed),
            }
        }
    }
    length.ok_or_else(|| ParseError::invalid_content_length("empty value"))
}

/// Checks if the Transfer-Encoding header indicates chunked encoding.
///
/// According to RFC 9112, chunked must be the last encoding if present.
fn is_chunked(header_value: Option<&HeaderValue>) -> bool {
    const CHUNKED: &[u8] = b"chunked";
    if let Some(value) = header_value {
        if let Some(bytes) = value.as_bytes().rsplit(|b| *b == b',').next() {
            return bytes.trim_ascii().eq_ignore_ascii_case(CHUNKED);
        }
    }
    false
}
