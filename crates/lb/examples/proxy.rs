//! Proxies `127.0.0.1:8080` to the server given as first argument.
//!
//! ```text
//! cargo run -p simult-lb --example proxy -- 127.0.0.1:9000
//! ```

use std::sync::Arc;
use std::time::Duration;

use http::{HeaderName, HeaderValue};
use simult_lb::Context;
use simult_lb::backend::{BackendOptions, StaticBackend, StaticBackendOptions};
use simult_lb::frontend::{Frontend, FrontendOptions};
use simult_lb::listener::Listener;
use tokio::net::TcpListener;
use tracing::{Level, info};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    simult_lb::logging::init(Level::DEBUG);

    let address = std::env::args().nth(1).unwrap_or_else(|| "127.0.0.1:9000".to_owned());
    let backend_options = BackendOptions::default()
        .timeout(Duration::from_secs(30))
        .request_header(HeaderName::from_static("x-proxied-by"), HeaderValue::from_static("simult"));
    let backend = StaticBackend::new(StaticBackendOptions::new(address).backend(backend_options));

    let options = FrontendOptions::default().timeout(Duration::from_secs(60)).default_backend(Arc::new(backend));
    let listener = Listener::new(Frontend::new(options));

    let ctx = Context::background();
    let shutdown = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutting down");
            shutdown.cancel();
        }
    });

    listener.serve(&ctx, TcpListener::bind("127.0.0.1:8080").await?).await;
    Ok(())
}
