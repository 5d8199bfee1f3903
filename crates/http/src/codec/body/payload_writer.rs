//! Streams a message body from a buffered reader to a writer.
//!
//! Bodies are relayed byte for byte: the framing announced by the preamble
//! decides where the body ends, and everything up to that point is copied as it
//! arrives, with the writer flushed after every read so the peer sees progress.

use http::HeaderMap;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use super::chunked_decoder::ChunkedDecoder;
use crate::protocol::{HttpError, ParseError, PayloadSize, SendError};

/// Copies the body framed by `headers` from `reader` to `writer`.
///
/// See [`PayloadSize::from_headers`] for how the framing is chosen and
/// [`write_payload`] for the copy itself.
pub async fn write_body<W, R>(writer: &mut W, reader: &mut R, headers: &HeaderMap, is_request: bool) -> Result<u64, HttpError>
where
    W: AsyncWrite + Unpin + ?Sized,
    R: AsyncBufRead + Unpin + ?Sized,
{
    let payload_size = PayloadSize::from_headers(headers, is_request)?;
    write_payload(writer, reader, payload_size).await
}

/// Copies a body with the given framing from `reader` to `writer` and returns the
/// number of bytes written.
///
/// - `Length(n)`: exactly `n` bytes
/// - `Chunked`: the chunk framing verbatim, through the last chunk and trailers
/// - `Empty`: nothing
/// - `Close`: everything until `reader` reaches end of stream
///
/// # Errors
///
/// - [`ParseError::UnexpectedEof`] if a `Length` or `Chunked` body is cut short
/// - [`ParseError::InvalidBody`] if the chunk framing is malformed
/// - [`HttpError::EofBody`] once a `Close` body was fully copied: the body is
///   complete but the connection it came from is finished
pub async fn write_payload<W, R>(writer: &mut W, reader: &mut R, payload_size: PayloadSize) -> Result<u64, HttpError>
where
    W: AsyncWrite + Unpin + ?Sized,
    R: AsyncBufRead + Unpin + ?Sized,
{
    let written = match payload_size {
        PayloadSize::Empty => 0,
        PayloadSize::Length(length) => copy_length(writer, reader, length).await?,
        PayloadSize::Chunked => copy_chunked(writer, reader).await?,
        PayloadSize::Close => {
            let written = copy_until_eof(writer, reader).await?;
            return Err(HttpError::EofBody { written });
        }
    };

    writer.flush().await.map_err(SendError::io)?;
    trace!(written, ?payload_size, "relayed payload");
    Ok(written)
}

async fn copy_length<W, R>(writer: &mut W, reader: &mut R, length: u64) -> Result<u64, HttpError>
where
    W: AsyncWrite + Unpin + ?Sized,
    R: AsyncBufRead + Unpin + ?Sized,
{
    let mut remaining = length;
    while remaining > 0 {
        let buf = reader.fill_buf().await.map_err(ParseError::io)?;
        if buf.is_empty() {
            return Err(ParseError::UnexpectedEof.into());
        }

        let n = usize::try_from(remaining).map_or(buf.len(), |remaining| remaining.min(buf.len()));
        writer.write_all(&buf[..n]).await.map_err(SendError::io)?;
        reader.consume(n);
        remaining -= n as u64;
        writer.flush().await.map_err(SendError::io)?;
    }
    Ok(length)
}

async fn copy_chunked<W, R>(writer: &mut W, reader: &mut R) -> Result<u64, HttpError>
where
    W: AsyncWrite + Unpin + ?Sized,
    R: AsyncBufRead + Unpin + ?Sized,
{
    let mut decoder = ChunkedDecoder::new();
    let mut written = 0;
    while !decoder.is_finished() {
        let buf = reader.fill_buf().await.map_err(ParseError::io)?;
        if buf.is_empty() {
            return Err(ParseError::UnexpectedEof.into());
        }

        let mut consumed = 0;
        while consumed < buf.len() && !decoder.is_finished() {
            consumed += decoder.decode(&buf[consumed..])?.consumed;
        }

        writer.write_all(&buf[..consumed]).await.map_err(SendError::io)?;
        reader.consume(consumed);
        written += consumed as u64;
        writer.flush().await.map_err(SendError::io)?;
    }
    Ok(written)
}

async fn copy_until_eof<W, R>(writer: &mut W, reader: &mut R) -> Result<u64, HttpError>
where
    W: AsyncWrite + Unpin + ?Sized,
    R: AsyncBufRead + Unpin + ?Sized,
{
    let mut written = 0;
    loop {
        let buf = reader.fill_buf().await.map_err(ParseError::io)?;
        if buf.is_empty() {
            break;
        }

        let n = buf.len();
        writer.write_all(buf).await.map_err(SendError::io)?;
        reader.consume(n);
        written += n as u64;
        writer.flush().await.map_err(SendError::io)?;
    }
    writer.flush().await.map_err(SendError::io)?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use tokio::io::{AsyncReadExt, BufReader};

    #[tokio::test]
    async fn length_copies_exactly() {
        // a tiny read buffer forces the body to arrive in many pieces
        let mut reader = BufReader::with_capacity(3, &b"hello worldGET / HTTP/1.1\r\n"[..]);
        let mut out = Vec::<u8>::new();

        let written = write_payload(&mut out, &mut reader, PayloadSize::Length(11)).await.unwrap();
        assert_eq!(written, 11);
        assert_eq!(out, b"hello world");

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b"GET / HTTP/1.1\r\n");
    }

    #[tokio::test]
    async fn length_cut_short() {
        let mut reader = &b"hel"[..];
        let mut out = Vec::<u8>::new();
        let e = write_payload(&mut out, &mut reader, PayloadSize::Length(5)).await.unwrap_err();
        assert!(matches!(e, HttpError::ReadError { source: ParseError::UnexpectedEof }));
        assert_eq!(out, b"hel");
    }

    #[tokio::test]
    async fn chunked_is_relayed_verbatim() {
        let body = b"5;ext=1\r\nhello\r\n7\r\n, world\r\n0\r\nExpires: never\r\n\r\n";
        let mut input = body.to_vec();
        input.extend_from_slice(b"NEXT");

        let mut reader = BufReader::with_capacity(4, &input[..]);
        let mut out = Vec::<u8>::new();
        let written = write_payload(&mut out, &mut reader, PayloadSize::Chunked).await.unwrap();

        assert_eq!(written, body.len() as u64);
        assert_eq!(out, body);

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b"NEXT");
    }

    #[tokio::test]
    async fn chunked_errors() {
        let mut reader = &b"5\r\nhel"[..];
        let e = write_payload(&mut Vec::<u8>::new(), &mut reader, PayloadSize::Chunked).await.unwrap_err();
        assert!(matches!(e, HttpError::ReadError { source: ParseError::UnexpectedEof }));

        let mut reader = &b"zz\r\n"[..];
        let e = write_payload(&mut Vec::<u8>::new(), &mut reader, PayloadSize::Chunked).await.unwrap_err();
        assert!(matches!(e, HttpError::ReadError { source: ParseError::InvalidBody { .. } }));
    }

    #[tokio::test]
    async fn close_delimited_reports_eof_body() {
        let mut reader = BufReader::with_capacity(2, &b"until the end"[..]);
        let mut out = Vec::<u8>::new();
        let e = write_payload(&mut out, &mut reader, PayloadSize::Close).await.unwrap_err();
        assert!(matches!(e, HttpError::EofBody { written: 13 }));
        assert_eq!(out, b"until the end");
    }

    #[tokio::test]
    async fn empty_copies_nothing() {
        let mut reader = &b"GET / HTTP/1.1\r\n"[..];
        let mut out = Vec::<u8>::new();
        assert_eq!(write_payload(&mut out, &mut reader, PayloadSize::Empty).await.unwrap(), 0);
        assert!(out.is_empty());
        assert_eq!(reader, b"GET / HTTP/1.1\r\n");
    }

    #[tokio::test]
    async fn body_framing_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("content-length", HeaderValue::from_static("4"));
        let mut reader = &b"abcdef"[..];
        let mut out = Vec::<u8>::new();
        assert_eq!(write_body(&mut out, &mut reader, &headers, true).await.unwrap(), 4);
        assert_eq!(out, b"abcd");

        // a request without framing headers has no body
        let mut reader = &b"abcdef"[..];
        let mut out = Vec::<u8>::new();
        assert_eq!(write_body(&mut out, &mut reader, &HeaderMap::new(), true).await.unwrap(), 0);

        // a response without framing headers runs until close
        let mut reader = &b"abcdef"[..];
        let mut out = Vec::<u8>::new();
        assert!(write_body(&mut out, &mut reader, &HeaderMap::new(), false).await.unwrap_err().is_eof_body());
        assert_eq!(out, b"abcdef");
    }
}
