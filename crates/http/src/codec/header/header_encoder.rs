//! Preamble serialization.
//!
//! Preambles are written exactly as they are held: the start line untouched,
//! then one `name: value` line per header value. Header names come out in the
//! lower case `http::HeaderName` stores them in.

use std::io;
use std::io::Write;

use bytes::{BufMut, BytesMut};
use http::StatusCode;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::protocol::{Preamble, SendError};

/// Initial buffer size allocated for a synthesized status line
const INIT_STATUS_SIZE: usize = 64;

/// Serializes `preamble` into `dst`.
#[inline]
pub fn encode_preamble(preamble: &Preamble, dst: &mut BytesMut) {
    preamble.encode(dst);
}

/// Writes `preamble` to `writer` and returns the number of bytes written.
///
/// The writer is not flushed.
pub async fn write_preamble<W>(writer: &mut W, preamble: &Preamble) -> Result<usize, SendError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut dst = BytesMut::new();
    encode_preamble(preamble, &mut dst);
    writer.write_all(&dst).await?;
    Ok(dst.len())
}

/// Writes a bodiless `HTTP/1.1` response carrying only a status line.
///
/// The writer is not flushed.
pub async fn write_status<W>(writer: &mut W, status: StatusCode) -> Result<usize, SendError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut dst = BytesMut::with_capacity(INIT_STATUS_SIZE);
    write!(FastWrite(&mut dst), "HTTP/1.1 {} {}\r\n\r\n", status.as_str(), status.canonical_reason().unwrap_or_default())?;
    writer.write_all(&dst).await?;
    Ok(dst.len())
}

/// Adapts a `BytesMut` to `std::io::Write` so `write!` can format into it.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
