//! The connection core of an HTTP/1.1 reverse proxy
//!
//! This crate terminates client connections, forwards each request to a
//! backend server and streams the response back, keeping client connections
//! open across requests when both sides allow it.
//!
//! # Architecture
//!
//! - [`frontend`]: the per-connection serve loop and request relay
//! - [`backend`]: the [`backend::Backend`] and [`backend::Server`] traits a
//!   load-balancing policy implements, and a single-server [`backend::StaticBackend`]
//! - [`listener`]: accept loop with an atomically replaceable [`frontend::Frontend`]
//! - [`Context`]: cancellation and deadlines
//! - [`logging`]: process-wide log output
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use simult_lb::backend::{StaticBackend, StaticBackendOptions};
//! use simult_lb::frontend::{Frontend, FrontendOptions};
//! use simult_lb::listener::Listener;
//! use simult_lb::Context;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     simult_lb::logging::init(tracing::Level::INFO);
//!
//!     let backend = Arc::new(StaticBackend::new(StaticBackendOptions::new("127.0.0.1:9000")));
//!     let options = FrontendOptions::default().timeout(Duration::from_secs(60)).default_backend(backend);
//!     let listener = Listener::new(Frontend::new(options));
//!
//!     listener.serve(&Context::background(), TcpListener::bind("127.0.0.1:8080").await?).await;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod frontend;
pub mod host;
pub mod listener;
pub mod logging;

mod context;
pub use context::Context;
