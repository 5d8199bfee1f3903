//! Preamble reader for HTTP/1.x messages.
//!
//! The reader pulls the start line and the header block off a buffered stream
//! one line at a time, enforcing a per-line limit and a limit on the whole
//! preamble. It stops right after the blank line that ends the header block, so
//! whatever follows (the body, or a pipelined message) stays in the reader.
//!
//! # Limits
//!
//! - Maximum line length: 1 MiB
//! - Maximum preamble size: 10 MiB
//! - Maximum number of headers: 256
//!
//! # Implementation Details
//!
//! The lines are accumulated into one buffer which is frozen once the blank line
//! is seen. The header block is then parsed with `httparse`, and header values
//! are sliced out of the frozen buffer instead of being copied.

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue};
use httparse::Status;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::trace;

use crate::ensure;
use crate::protocol::{ParseError, Preamble, PreambleError};

/// Default limit for a single preamble line, terminator included.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Default limit for the whole preamble.
pub const MAX_PREAMBLE_BYTES: usize = 10 * 1024 * 1024;

/// Maximum number of header lines in one preamble
const MAX_HEADER_NUM: usize = 256;

/// Size limits applied while reading a preamble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreambleLimits {
    pub max_line_bytes: usize,
    pub max_preamble_bytes: usize,
}

impl Default for PreambleLimits {
    fn default() -> Self {
        Self { max_line_bytes: MAX_LINE_BYTES, max_preamble_bytes: MAX_PREAMBLE_BYTES }
    }
}

/// Reads one message preamble with the default [`PreambleLimits`].
pub async fn read_preamble<R>(reader: &mut R) -> Result<Preamble, PreambleError>
where
    R: AsyncBufRead + Unpin + ?Sized,
{
    read_preamble_with_limits(reader, &PreambleLimits::default()).await
}

/// Reads one message preamble: the start line, the header lines and the blank line
/// ending them.
///
/// Empty lines before the start line are skipped. No byte after the blank line is
/// consumed from `reader`.
///
/// # Errors
///
/// Returns a [`PreambleError`] carrying the number of bytes consumed so far when:
/// - a line exceeds `max_line_bytes` or the preamble exceeds `max_preamble_bytes`
/// - the start line or a header line is malformed
/// - the stream ends before the blank line
/// - the underlying reader fails
pub async fn read_preamble_with_limits<R>(reader: &mut R, limits: &PreambleLimits) -> Result<Preamble, PreambleError>
where
    R: AsyncBufRead + Unpin + ?Sized,
{
    let mut block = BytesMut::new();
    let mut read = 0;
    let mut start_line_end = None;

    loop {
        let line_start = block.len();
        read = read_line(reader, &mut block, read, limits.max_line_bytes).await?;
        ensure!(
            read <= limits.max_preamble_bytes,
            PreambleError::new(read, ParseError::too_large_preamble(read, limits.max_preamble_bytes))
        );

        let is_blank = trim_line_end(&block[line_start..]).is_empty();
        match (start_line_end, is_blank) {
            (None, true) => block.truncate(line_start),
            (None, false) => start_line_end = Some(block.len()),
            (Some(_), true) => break,
            (Some(_), false) => {}
        }
    }

    // the loop only breaks after the start line was recorded
    let start_line_end = start_line_end.unwrap_or_default();
    let block = block.freeze();
    let start_line = block.slice_ref(trim_line_end(&block[..start_line_end]));
    check_start_line(&start_line).map_err(|e| PreambleError::new(read, e))?;

    let headers = parse_headers(&block, start_line_end).map_err(|e| PreambleError::new(read, e))?;
    trace!(preamble_size = read, header_count = headers.len(), "read preamble");

    Ok(Preamble::from_wire(start_line, headers, read))
}

/// Appends one line, LF included, to `dst` and returns the updated read count.
async fn read_line<R>(reader: &mut R, dst: &mut BytesMut, mut read: usize, max_line_bytes: usize) -> Result<usize, PreambleError>
where
    R: AsyncBufRead + Unpin + ?Sized,
{
    let mut line_len = 0;
    loop {
        let buf = reader.fill_buf().await.map_err(|e| PreambleError::new(read, ParseError::io(e)))?;
        ensure!(!buf.is_empty(), PreambleError::new(read, ParseError::UnexpectedEof));

        let (found, used) = match buf.iter().position(|b| *b == b'\n') {
            Some(index) => (true, index + 1),
            None => (false, buf.len()),
        };
        dst.extend_from_slice(&buf[..used]);
        reader.consume(used);
        read += used;
        line_len += used;

        ensure!(line_len <= max_line_bytes, PreambleError::new(read, ParseError::too_long_line(max_line_bytes)));
        if found {
            return Ok(read);
        }
    }
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Rejects start lines that cannot be a request line or a status line.
fn check_start_line(line: &[u8]) -> Result<(), ParseError> {
    ensure!(line.contains(&b' '), ParseError::invalid_start_line("missing separator"));
    ensure!(
        line.iter().all(|b| *b == b'\t' || !b.is_ascii_control()),
        ParseError::invalid_start_line("contains control characters")
    );
    ensure!(!line.starts_with(b" "), ParseError::invalid_start_line("leading whitespace"));
    Ok(())
}

fn parse_headers(block: &Bytes, offset: usize) -> Result<HeaderMap, ParseError> {
    let mut parsed = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
    let headers = match httparse::parse_headers(&block[offset..], &mut parsed) {
        Ok(Status::Complete((_, headers))) => headers,
        Ok(Status::Partial) => return Err(ParseError::invalid_header("incomplete header block")),
        Err(httparse::Error::TooManyHeaders) => return Err(ParseError::too_many_headers(MAX_HEADER_NUM)),
        Err(e) => return Err(ParseError::invalid_header(e)),
    };

    let mut map = HeaderMap::with_capacity(headers.len());
    for header in headers.iter() {
        let name = HeaderName::from_bytes(header.name.as_bytes()).map_err(ParseError::invalid_header)?;
        let value = HeaderValue::from_maybe_shared(block.slice_ref(header.value)).map_err(ParseError::invalid_header)?;
        map.append(name, value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{ACCEPT, CONNECTION, HOST, USER_AGENT};
    use http::{Method, Version};
    use indoc::indoc;
    use tokio::io::{AsyncReadExt, BufReader};

    #[tokio::test]
    async fn from_curl() {
        let str = indoc! {r##"
        GET /index.html HTTP/1.1
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        Accept: */*

        "##};

        let mut reader = str.as_bytes();
        let preamble = read_preamble(&mut reader).await.unwrap();

        assert_eq!(preamble.start_line(), b"GET /index.html HTTP/1.1");
        assert_eq!(preamble.len(), str.len());
        assert_eq!(preamble.headers().len(), 3);
        assert_eq!(preamble.headers().get(HOST).unwrap(), "127.0.0.1:8080");
        assert_eq!(preamble.headers().get(USER_AGENT).unwrap(), "curl/7.79.1");
        assert_eq!(preamble.headers().get(ACCEPT).unwrap(), "*/*");

        let line = preamble.request_line().unwrap();
        assert_eq!(line.method, Method::GET);
        assert_eq!(line.version, Version::HTTP_11);
        assert_eq!(line.path(), "/index.html");
    }

    #[tokio::test]
    async fn from_edge() {
        let str = indoc! {r##"
        GET /index/?a=1&b=2&a=3 HTTP/1.1
        Host: 127.0.0.1:8080
        Connection: keep-alive
        Cache-Control: max-age=0
        sec-ch-ua: "#Not_A Brand";v="99", "Microsoft Edge";v="109", "Chromium";v="109"
        sec-ch-ua-mobile: ?0
        sec-ch-ua-platform: "macOS"
        Upgrade-Insecure-Requests: 1
        User-Agent: Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/109.0.0.0 Safari/537.36 Edg/109.0.1518.52
        Accept: text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.9
        Sec-Fetch-Site: none
        Sec-Fetch-Mode: navigate
        Sec-Fetch-User: ?1
        Sec-Fetch-Dest: document
        Accept-Encoding: gzip, deflate, br
        Accept-Language: zh-CN,zh;q=0.9,en-US;q=0.8,en;q=0.7

        "##};

        let mut reader = str.as_bytes();
        let preamble = read_preamble(&mut reader).await.unwrap();

        assert_eq!(preamble.headers().len(), 15);
        assert!(preamble.is_keep_alive());
        assert_eq!(preamble.headers().get(CONNECTION).unwrap(), "keep-alive");
        assert_eq!(
            preamble.headers().get("sec-ch-ua").unwrap(),
            r##""#Not_A Brand";v="99", "Microsoft Edge";v="109", "Chromium";v="109""##
        );
        assert_eq!(preamble.headers().get("sec-fetch-user").unwrap(), "?1");
        assert_eq!(preamble.request_line().unwrap().target, "/index/?a=1&b=2&a=3");
    }

    #[tokio::test]
    async fn stops_at_blank_line() {
        let str = indoc! {r##"
        POST /upload HTTP/1.1
        Content-Length: 3

        123GET / HTTP/1.1"##};

        let mut reader = BufReader::with_capacity(4, str.as_bytes());
        let preamble = read_preamble(&mut reader).await.unwrap();
        assert_eq!(preamble.headers().get("content-length").unwrap(), "3");

        let mut rest = String::new();
        reader.read_to_string(&mut rest).await.unwrap();
        assert_eq!(rest, "123GET / HTTP/1.1");
    }

    #[tokio::test]
    async fn crlf_and_repeated_headers() {
        let mut reader = &b"\r\nHTTP/1.1 200 OK\r\nSet-Cookie: a=1\r\nset-cookie: b=2\r\nContent-Length: 0\r\n\r\n"[..];
        let preamble = read_preamble(&mut reader).await.unwrap();

        assert_eq!(preamble.start_line(), b"HTTP/1.1 200 OK");
        assert_eq!(preamble.status_line().unwrap().code, 200);
        let cookies: Vec<_> = preamble.headers().get_all("set-cookie").iter().collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
    }

    #[tokio::test]
    async fn empty_read_is_distinguishable() {
        let mut reader = &b""[..];
        let e = read_preamble(&mut reader).await.unwrap_err();
        assert!(e.is_empty_read());
        assert!(matches!(e.parse_error(), ParseError::UnexpectedEof));

        let mut reader = &b"GET / HTTP/1.1\r\nHost: a"[..];
        let e = read_preamble(&mut reader).await.unwrap_err();
        assert!(!e.is_empty_read());
        assert_eq!(e.read(), 23);
        assert!(matches!(e.parse_error(), ParseError::UnexpectedEof));
    }

    #[tokio::test]
    async fn line_limit() {
        let limits = PreambleLimits { max_line_bytes: 32, ..PreambleLimits::default() };
        let long = format!("GET / HTTP/1.1\r\nX-Long: {}\r\n\r\n", "a".repeat(64));

        let mut reader = long.as_bytes();
        let e = read_preamble_with_limits(&mut reader, &limits).await.unwrap_err();
        assert!(matches!(e.parse_error(), ParseError::TooLongLine { max_size: 32 }));
        assert!(e.read() > 0);
    }

    #[tokio::test]
    async fn preamble_limit() {
        let limits = PreambleLimits { max_line_bytes: 64, max_preamble_bytes: 100 };
        let mut request = String::from("GET / HTTP/1.1\r\n");
        for i in 0..10 {
            request.push_str(&format!("X-Header-{i}: value\r\n"));
        }
        request.push_str("\r\n");

        let mut reader = request.as_bytes();
        let e = read_preamble_with_limits(&mut reader, &limits).await.unwrap_err();
        assert!(matches!(e.parse_error(), ParseError::TooLargePreamble { max_size: 100, .. }));
    }

    #[tokio::test]
    async fn malformed_lines() {
        let mut reader = &b"GET / HTTP/1.1\r\nno separator here\r\n\r\n"[..];
        let e = read_preamble(&mut reader).await.unwrap_err();
        assert!(matches!(e.parse_error(), ParseError::InvalidHeader { .. }));

        let mut reader = &b"GARBAGE\r\nHost: a\r\n\r\n"[..];
        let e = read_preamble(&mut reader).await.unwrap_err();
        assert!(matches!(e.parse_error(), ParseError::InvalidStartLine { .. }));
    }
}
