use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use simult_http::connection::BufConn;
use tokio::net::TcpStream;
use tracing::trace;

use super::{Backend, BackendOptions, Server};
use crate::Context;

const DEFAULT_MAX_IDLE: usize = 16;
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct StaticBackendOptions {
    /// `host:port` of the only server.
    pub address: String,
    /// Upper bound of idle connections kept for reuse.
    pub max_idle: usize,
    pub connect_timeout: Duration,
    pub backend: BackendOptions,
}

impl StaticBackendOptions {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            max_idle: DEFAULT_MAX_IDLE,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            backend: BackendOptions::default(),
        }
    }

    pub fn max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = max_idle;
        self
    }

    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn backend(mut self, backend: BackendOptions) -> Self {
        self.backend = backend;
        self
    }
}

/// A backend made of one server.
#[derive(Debug)]
pub struct StaticBackend {
    options: ArcSwap<BackendOptions>,
    server: Arc<StaticServer>,
}

impl StaticBackend {
    pub fn new(options: StaticBackendOptions) -> Self {
        let server = StaticServer {
            address: options.address,
            max_idle: options.max_idle,
            connect_timeout: options.connect_timeout,
            idle: Mutex::new(Vec::new()),
        };
        Self { options: ArcSwap::from_pointee(options.backend), server: Arc::new(server) }
    }

    pub fn server(&self) -> Arc<StaticServer> {
        Arc::clone(&self.server)
    }

    /// Replaces the options; requests already relaying keep the previous snapshot.
    pub fn set_options(&self, options: BackendOptions) {
        self.options.store(Arc::new(options));
    }
}

impl Backend for StaticBackend {
    fn find_server(&self, _ctx: &Context) -> Option<Arc<dyn Server>> {
        Some(Arc::clone(&self.server) as Arc<dyn Server>)
    }

    fn options(&self) -> Arc<BackendOptions> {
        self.options.load_full()
    }
}

/// One server address with a LIFO pool of idle connections.
#[derive(Debug)]
pub struct StaticServer {
    address: String,
    max_idle: usize,
    connect_timeout: Duration,
    idle: Mutex<Vec<BufConn>>,
}

impl StaticServer {
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn idle_count(&self) -> usize {
        self.idle().len()
    }

    fn idle(&self) -> MutexGuard<'_, Vec<BufConn>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn connect(&self, ctx: &Context) -> io::Result<BufConn> {
        let connect = tokio::time::timeout(self.connect_timeout, TcpStream::connect(self.address.as_str()));
        let stream = tokio::select! {
            result = connect => result??,
            () = ctx.done() => return Err(io::Error::new(io::ErrorKind::TimedOut, "context done before connected")),
        };
        stream.set_nodelay(true)?;
        trace!(server = %self.address, "connected to backend server");
        BufConn::new(stream)
    }
}

#[async_trait]
impl Server for StaticServer {
    async fn conn_acquire(&self, ctx: &Context) -> io::Result<BufConn> {
        loop {
            let idle = self.idle().pop();
            match idle {
                Some(conn) if conn.is_idle() => return Ok(conn),
                Some(mut stale) => {
                    trace!(server = %self.address, local = %stale.local_addr(), "discard stale idle connection");
                    stale.close();
                }
                None => return self.connect(ctx).await,
            }
        }
    }

    fn conn_release(&self, mut conn: BufConn) {
        if conn.is_closed() {
            return;
        }

        let mut idle = self.idle();
        if idle.len() < self.max_idle {
            idle.push(conn);
        } else {
            drop(idle);
            conn.close();
        }
    }
}
