//! The client facing side of the proxy.
//!
//! A [`Frontend`] serves accepted client connections. Each connection runs a
//! loop of request cycles: read a request preamble, pick a backend and one of
//! its servers, relay the exchange, and decide whether the connection may carry
//! the next request. Failures end the loop after a best effort `400` or `503`
//! to the client.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use simult_http::codec::{PreambleLimits, read_preamble_with_limits, write_status};
use simult_http::connection::{BufConn, Socket};
use simult_http::protocol::{PayloadSize, Preamble, PreambleError, RequestLine};
use thiserror::Error;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::Context;
use crate::backend::Backend;
use crate::host::split_host_port;

mod relay;
mod route;

pub use relay::RelayError;
use relay::{Exchange, Reuse, be_serve};
pub use route::{Route, RouteError};

/// Keep-alive probing period for client and backend sockets.
const KEEPALIVE_PERIOD: Duration = Duration::from_secs(1);

/// An immutable frontend configuration.
#[derive(Debug, Clone, Default)]
pub struct FrontendOptions {
    /// Time limit for one request cycle, idle wait included; zero means none.
    pub timeout: Duration,
    /// Backend for requests no route matches.
    pub default_backend: Option<Arc<dyn Backend>>,
    /// Checked in order; the first match wins.
    pub routes: Vec<Route>,
    pub limits: PreambleLimits,
}

impl FrontendOptions {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn default_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.default_backend = Some(backend);
        self
    }

    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    pub fn limits(mut self, limits: PreambleLimits) -> Self {
        self.limits = limits;
        self
    }
}

#[derive(Debug)]
pub struct Frontend {
    options: FrontendOptions,
}

#[derive(Error, Debug)]
enum ServeError {
    #[error("read request: {0}")]
    Request(#[from] PreambleError),

    #[error("no backend for request")]
    NoBackend,

    #[error("no server available")]
    NoServer,

    #[error("acquire backend connection: {0}")]
    Acquire(io::Error),

    #[error("{0}")]
    Relay(#[from] RelayError),

    #[error("{0} unexpected bytes buffered after the request")]
    Leftover(usize),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl ServeError {
    /// The response owed to the client, if any.
    fn status(&self) -> Option<StatusCode> {
        match self {
            ServeError::Request(_) => Some(StatusCode::BAD_REQUEST),
            ServeError::NoBackend | ServeError::NoServer | ServeError::Acquire(_) => Some(StatusCode::SERVICE_UNAVAILABLE),
            ServeError::Relay(_) | ServeError::Leftover(_) | ServeError::Io(_) => None,
        }
    }
}

impl Frontend {
    pub fn new(options: FrontendOptions) -> Self {
        Self { options }
    }

    /// A new frontend with `options`; `self` keeps serving its connections unchanged.
    pub fn fork(&self, options: FrontendOptions) -> Self {
        Self::new(options)
    }

    /// A copy of the options snapshot.
    pub fn options(&self) -> FrontendOptions {
        self.options.clone()
    }

    /// Releases frontend resources. Connections being served are not affected.
    pub fn close(&self) {}

    /// Serves one client connection until it fails, is not reusable, idles out or
    /// `ctx` is cancelled.
    pub async fn serve(&self, ctx: &Context, stream: TcpStream) {
        if let Err(e) = stream.set_keepalive(KEEPALIVE_PERIOD) {
            debug!(cause = %e, "enable keep-alive on frontend connection failed");
        }
        let mut fe_conn = match BufConn::new(stream) {
            Ok(conn) => conn,
            Err(e) => {
                debug!(cause = %e, "frontend connection lost before serving");
                return;
            }
        };

        let (peer, local) = (fe_conn.peer_addr(), fe_conn.local_addr());
        debug!(%peer, %local, "connected to frontend");
        loop {
            let fe_ctx = ctx.derive(self.options.timeout);
            let _release = fe_ctx.release_on_drop();

            let served = tokio::select! {
                ok = self.fe_serve(&fe_ctx, &mut fe_conn) => Some(ok),
                () = fe_ctx.done() => None,
            };
            let ok = served.unwrap_or_else(|| {
                fe_conn.close();
                false
            });
            if !ok {
                break;
            }
        }
        debug!(%peer, %local, "disconnected from frontend");
    }

    /// Runs one request cycle and returns whether the connection may serve another.
    ///
    /// Every `false` leaves `fe_conn` flushed and closed.
    async fn fe_serve(&self, ctx: &Context, fe_conn: &mut BufConn) -> bool {
        let result = self.serve_request(ctx, fe_conn).await;
        let peer = fe_conn.peer_addr();

        let failure = match result {
            Ok(Reuse::KeepAlive) => return true,
            Ok(Reuse::Close) => None,
            Err(e) => Some(e),
        };

        if let Some(e) = failure {
            match &e {
                ServeError::Request(e) if e.is_empty_read() => {}
                ServeError::Request(e) => debug!(%peer, cause = %e, "read request header from frontend failed"),
                ServeError::NoBackend | ServeError::NoServer | ServeError::Acquire(_) => warn!(%peer, cause = %e, "backend unavailable"),
                ServeError::Leftover(_) => warn!(%peer, cause = %e, "buffer order error on frontend"),
                ServeError::Relay(relay) if relay.is_eof_body() => {}
                ServeError::Relay(_) | ServeError::Io(_) => debug!(%peer, cause = %e, "relay failed"),
            }

            if let Some(status) = e.status()
                && let Ok(writer) = fe_conn.writer()
                && let Err(write_error) = write_status(writer, status).await
            {
                debug!(%peer, cause = %write_error, "write status to frontend failed");
            }
        }

        if let Err(e) = fe_conn.flush().await {
            debug!(%peer, cause = %e, "flush frontend failed");
        }
        fe_conn.close();
        false
    }

    async fn serve_request(&self, ctx: &Context, fe_conn: &mut BufConn) -> Result<Reuse, ServeError> {
        let mut request = read_preamble_with_limits(fe_conn.reader()?, &self.options.limits).await?;
        let request_line = request.request_line().map_err(|e| PreambleError::new(request.len(), e))?;
        let request_payload = PayloadSize::from_headers(request.headers(), true).map_err(|e| PreambleError::new(request.len(), e))?;

        let backend = self.select_backend(&request_line, &request).ok_or(ServeError::NoBackend)?;
        let server = backend.find_server(ctx).ok_or(ServeError::NoServer)?;
        let mut be_conn = server.conn_acquire(ctx).await.map_err(ServeError::Acquire)?;
        if let Err(e) = be_conn.set_keepalive(KEEPALIVE_PERIOD) {
            debug!(server = %be_conn.peer_addr(), cause = %e, "enable keep-alive on backend connection failed");
        }

        let backend_options = backend.options();
        request.append_forwarded_for(fe_conn.peer_addr().ip());
        request.apply_overrides(&backend_options.request_headers);

        let be_ctx = ctx.derive(backend_options.timeout);
        let _release = be_ctx.release_on_drop();
        let exchange = Exchange {
            request: &request,
            method: &request_line.method,
            request_payload,
            limits: &self.options.limits,
        };
        let relayed = tokio::select! {
            result = be_serve(fe_conn, &mut be_conn, exchange) => result,
            () = be_ctx.done() => Err(RelayError::Timeout),
        };

        match relayed {
            Ok(Reuse::KeepAlive) => server.conn_release(be_conn),
            Ok(Reuse::Close) => {
                be_conn.close();
                return Ok(Reuse::Close);
            }
            Err(RelayError::Timeout) => {
                be_conn.close();
                return Err(RelayError::Timeout.into());
            }
            Err(e) => {
                if let Err(flush_error) = be_conn.flush().await {
                    debug!(server = %be_conn.peer_addr(), cause = %flush_error, "flush backend failed");
                }
                be_conn.close();
                return Err(e.into());
            }
        }

        match fe_conn.buffered() {
            0 => Ok(Reuse::KeepAlive),
            leftover => Err(ServeError::Leftover(leftover)),
        }
    }

    /// The backend of the first route matching the request, else the default backend.
    fn select_backend(&self, request_line: &RequestLine, request: &Preamble) -> Option<Arc<dyn Backend>> {
        let authority = request_line.uri().and_then(|uri| uri.authority().map(|authority| authority.as_str().to_owned()));
        let host = request
            .host()
            .or(authority.as_deref())
            .map(|host| split_host_port(host).0.to_ascii_lowercase());
        let path = request_line.path();

        self.options
            .routes
            .iter()
            .find(|route| route.matches(host.as_deref(), path))
            .map(Route::backend)
            .or(self.options.default_backend.as_ref())
            .map(Arc::clone)
    }
}
