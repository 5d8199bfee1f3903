//! One request/response exchange between a client and a backend server.
//!
//! The request is forwarded while the response is relayed back, so a server
//! that answers before it has read the whole request body still gets its
//! response delivered.

use std::io;

use http::Method;
use simult_http::codec::{PreambleLimits, read_preamble_with_limits, write_payload, write_preamble};
use simult_http::connection::{BufConn, ConnReader, ConnWriter};
use simult_http::protocol::{HttpError, PayloadSize, Preamble, PreambleError};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::select;
use tracing::trace;

/// Whether the connections of an exchange may carry another one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reuse {
    KeepAlive,
    Close,
}

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("forward request: {0}")]
    Request(HttpError),

    #[error("read response header: {0}")]
    ResponseHeader(PreambleError),

    #[error("relay response: {0}")]
    Response(HttpError),

    #[error("{0} unexpected bytes buffered after the response")]
    Leftover(usize),

    #[error("deadline exceeded")]
    Timeout,

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl RelayError {
    /// True when a body ended with its connection; such exchanges are complete
    /// but the connection cannot be reused.
    pub fn is_eof_body(&self) -> bool {
        matches!(self, RelayError::Request(e) | RelayError::Response(e) if e.is_eof_body())
    }
}

/// Everything needed to forward one request.
#[derive(Debug)]
pub(crate) struct Exchange<'a> {
    pub(crate) request: &'a Preamble,
    pub(crate) method: &'a Method,
    pub(crate) request_payload: PayloadSize,
    pub(crate) limits: &'a PreambleLimits,
}

/// Relays one exchange between `fe_conn` and `be_conn`.
///
/// On success both connections are positioned at a message boundary. The caller
/// closes `be_conn` on error.
pub(crate) async fn be_serve(fe_conn: &mut BufConn, be_conn: &mut BufConn, exchange: Exchange<'_>) -> Result<Reuse, RelayError> {
    let (fe_reader, fe_writer) = fe_conn.split()?;
    let (be_reader, be_writer) = be_conn.split()?;

    let reuse = {
        let forward = forward_request(be_writer, fe_reader, exchange.request, exchange.request_payload);
        let relay = relay_response(fe_writer, be_reader, exchange.method, exchange.limits);
        tokio::pin!(forward);
        tokio::pin!(relay);

        let mut forwarded = None;
        let response = loop {
            select! {
                biased;
                response = &mut relay => break response,
                result = &mut forward, if forwarded.is_none() => forwarded = Some(result),
            }
        };
        let reuse = response?;

        let forwarded = match forwarded {
            Some(result) => result,
            None => forward.await,
        };
        let written = forwarded.map_err(RelayError::Request)?;
        trace!(request_body = written, "forwarded request");
        reuse
    };

    if reuse == Reuse::KeepAlive {
        let leftover = be_reader.buffer().len();
        if leftover != 0 {
            return Err(RelayError::Leftover(leftover));
        }
    }
    Ok(reuse)
}

async fn forward_request(be_writer: &mut ConnWriter, fe_reader: &mut ConnReader, request: &Preamble, payload_size: PayloadSize) -> Result<u64, HttpError> {
    write_preamble(be_writer, request).await?;
    write_payload(be_writer, fe_reader, payload_size).await
}

async fn relay_response(
    fe_writer: &mut ConnWriter,
    be_reader: &mut ConnReader,
    method: &Method,
    limits: &PreambleLimits,
) -> Result<Reuse, RelayError> {
    loop {
        let response = read_preamble_with_limits(be_reader, limits).await.map_err(RelayError::ResponseHeader)?;
        let status = response
            .status_line()
            .map_err(|e| RelayError::ResponseHeader(PreambleError::new(response.len(), e)))?;

        write_preamble(fe_writer, &response).await.map_err(|e| RelayError::Response(e.into()))?;

        if status.is_interim() {
            trace!(status = status.code, "relayed interim response");
            fe_writer.flush().await?;
            continue;
        }

        let payload_size = PayloadSize::for_response(method, status.code, response.headers()).map_err(|e| RelayError::Response(e.into()))?;
        let written = write_payload(fe_writer, be_reader, payload_size).await.map_err(RelayError::Response)?;
        trace!(status = status.code, response_body = written, "relayed response");

        return Ok(if response.is_keep_alive() { Reuse::KeepAlive } else { Reuse::Close });
    }
}
