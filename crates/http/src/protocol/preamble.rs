//! HTTP message preamble: the start line plus the header block.
//!
//! A [`Preamble`] keeps the start line exactly as received and the headers in an
//! [`http::HeaderMap`], which is case-insensitive and keeps every value of a
//! repeated header in arrival order. Requests and responses share the type; the
//! start line is interpreted on demand through [`Preamble::request_line`] or
//! [`Preamble::status_line`].

use std::net::IpAddr;

use bytes::{BufMut, Bytes, BytesMut};
use http::header::{CONNECTION, HOST};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri, Version};

use crate::protocol::ParseError;

/// Name of the header carrying the chain of client addresses seen by proxies.
pub static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preamble {
    start_line: Bytes,
    headers: HeaderMap,
    len: usize,
}

impl Preamble {
    /// Creates a preamble from a start line (without its line terminator) and headers.
    pub fn new(start_line: impl Into<Bytes>, headers: HeaderMap) -> Self {
        let mut preamble = Self { start_line: start_line.into(), headers, len: 0 };
        preamble.len = preamble.encoded_len();
        preamble
    }

    pub(crate) fn from_wire(start_line: Bytes, headers: HeaderMap, len: usize) -> Self {
        Self { start_line, headers, len }
    }

    /// The start line, without the trailing CRLF.
    #[inline]
    pub fn start_line(&self) -> &[u8] {
        &self.start_line
    }

    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Number of bytes this preamble occupied on the wire when it was read,
    /// or its serialized size when it was built in memory.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Serializes the preamble: start line, header lines and the blank terminator.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(self.encoded_len());
        dst.put_slice(&self.start_line);
        dst.put_slice(b"\r\n");
        for (header_name, header_value) in &self.headers {
            dst.put_slice(header_name.as_ref());
            dst.put_slice(b": ");
            dst.put_slice(header_value.as_ref());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
    }

    fn encoded_len(&self) -> usize {
        let headers: usize = self.headers.iter().map(|(name, value)| name.as_str().len() + value.len() + 4).sum();
        self.start_line.len() + 2 + headers + 2
    }

    /// Interprets the start line as a request line.
    pub fn request_line(&self) -> Result<RequestLine, ParseError> {
        let buf = terminated(&self.start_line);
        let mut req = httparse::Request::new(&mut []);
        match req.parse(&buf) {
            Ok(httparse::Status::Complete(_)) => {}
            Ok(httparse::Status::Partial) => return Err(ParseError::invalid_start_line("incomplete request line")),
            Err(e) => return Err(ParseError::invalid_start_line(e)),
        }

        let method = req.method.ok_or_else(|| ParseError::invalid_start_line("missing method"))?;
        let method = Method::from_bytes(method.as_bytes()).map_err(ParseError::invalid_start_line)?;
        let target = req.path.ok_or_else(|| ParseError::invalid_start_line("missing request target"))?.to_owned();
        let version = to_version(req.version)?;

        Ok(RequestLine { method, target, version })
    }

    /// Interprets the start line as a status line.
    pub fn status_line(&self) -> Result<StatusLine, ParseError> {
        let buf = terminated(&self.start_line);
        let mut res = httparse::Response::new(&mut []);
        match res.parse(&buf) {
            Ok(httparse::Status::Complete(_)) => {}
            Ok(httparse::Status::Partial) => return Err(ParseError::invalid_start_line("incomplete status line")),
            Err(e) => return Err(ParseError::invalid_start_line(e)),
        }

        let code = res.code.ok_or_else(|| ParseError::invalid_start_line("missing status code"))?;
        let version = to_version(res.version)?;

        Ok(StatusLine { version, code })
    }

    /// Returns true if the first `Connection` value is `keep-alive`, ignoring case.
    pub fn is_keep_alive(&self) -> bool {
        self.headers
            .get(CONNECTION)
            .is_some_and(|value| value.as_bytes().trim_ascii().eq_ignore_ascii_case(b"keep-alive"))
    }

    /// The `Host` header value, if present and textual.
    pub fn host(&self) -> Option<&str> {
        self.headers.get(HOST).and_then(|value| value.to_str().ok())
    }

    /// Appends `addr` to `X-Forwarded-For`.
    ///
    /// Earlier values, including ones spread over several header lines, are kept
    /// in order and joined with `, ` before the new address.
    pub fn append_forwarded_for(&mut self, addr: IpAddr) {
        let mut forwarded = BytesMut::new();
        for value in self.headers.get_all(&X_FORWARDED_FOR) {
            let value = value.as_bytes().trim_ascii();
            if value.is_empty() {
                continue;
            }
            forwarded.put_slice(value);
            forwarded.put_slice(b", ");
        }
        forwarded.put_slice(addr.to_string().as_bytes());

        if let Ok(value) = HeaderValue::from_maybe_shared(forwarded.freeze()) {
            self.headers.insert(X_FORWARDED_FOR.clone(), value);
        }
    }

    /// Applies configured header overrides: the first configured value for a name
    /// replaces whatever the message carried, later values for that name are appended.
    pub fn apply_overrides(&mut self, overrides: &HeaderMap) {
        for name in overrides.keys() {
            for (index, value) in overrides.get_all(name).iter().enumerate() {
                if index == 0 {
                    self.headers.insert(name.clone(), value.clone());
                } else {
                    self.headers.append(name.clone(), value.clone());
                }
            }
        }
    }
}

/// A parsed request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    pub target: String,
    pub version: Version,
}

impl RequestLine {
    /// The request target as a URI, when it parses as one.
    pub fn uri(&self) -> Option<Uri> {
        self.target.parse::<Uri>().ok()
    }

    /// The path of the request target without its query.
    pub fn path(&self) -> &str {
        let target = match self.target.find("://") {
            Some(scheme_end) => {
                let rest = &self.target[scheme_end + 3..];
                rest.find('/').map_or("/", |path_start| &rest[path_start..])
            }
            None => self.target.as_str(),
        };
        target.split(['?', '#']).next().unwrap_or(target)
    }
}

/// A parsed status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusLine {
    pub version: Version,
    pub code: u16,
}

impl StatusLine {
    /// Interim responses precede the final response of an exchange. `101` is not
    /// one of them: it ends HTTP/1.1 on the connection.
    #[inline]
    pub fn is_interim(&self) -> bool {
        (100..200).contains(&self.code) && self.code != 101
    }
}

fn terminated(start_line: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(start_line.len() + 4);
    buf.extend_from_slice(start_line);
    buf.extend_from_slice(b"\r\n\r\n");
    buf
}

fn to_version(version: Option<u8>) -> Result<Version, ParseError> {
    match version {
        Some(0) => Ok(Version::HTTP_10),
        Some(1) => Ok(Version::HTTP_11),
        // http2 and http3 are not spoken on this connection
        v => Err(ParseError::invalid_start_line(format!("invalid http version: {v:?}"))),
    }
}
