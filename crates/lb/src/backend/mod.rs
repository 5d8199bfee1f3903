//! Backend collaborators of the frontend.
//!
//! A [`Backend`] picks a [`Server`] for each request; a [`Server`] hands out
//! connections and takes reusable ones back. How servers are chosen, checked
//! or pooled is up to the implementation. [`StaticBackend`] is the simplest
//! one: a single address with an idle pool.

use std::fmt::Debug;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::{HeaderMap, HeaderName, HeaderValue};
use simult_http::connection::BufConn;

use crate::Context;

mod static_backend;

pub use static_backend::{StaticBackend, StaticBackendOptions, StaticServer};

/// Per-backend settings read by the frontend on every request.
#[derive(Debug, Clone, Default)]
pub struct BackendOptions {
    /// Time limit for relaying one exchange with a server; zero means none.
    pub timeout: Duration,
    /// Headers set on every forwarded request. The first value of a name
    /// replaces the client's, further values are appended.
    pub request_headers: HeaderMap,
}

impl BackendOptions {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn request_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.request_headers.append(name, value);
        self
    }
}

pub trait Backend: Send + Sync + Debug {
    /// Picks a server for the next request, or `None` when no server is usable.
    fn find_server(&self, ctx: &Context) -> Option<Arc<dyn Server>>;

    /// The current options snapshot.
    fn options(&self) -> Arc<BackendOptions>;
}

#[async_trait]
pub trait Server: Send + Sync + Debug {
    /// Returns a connection to this server, idle or freshly opened.
    async fn conn_acquire(&self, ctx: &Context) -> io::Result<BufConn>;

    /// Takes back a connection whose last exchange ended cleanly.
    fn conn_release(&self, conn: BufConn);
}
