//! Accept loop with hot-swappable frontend configuration.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::Context;
use crate::frontend::Frontend;

/// Hands accepted connections to the active [`Frontend`].
///
/// Each connection keeps the frontend that was active when it was accepted, so
/// [`Listener::replace`] only affects connections accepted afterwards.
#[derive(Debug)]
pub struct Listener {
    frontend: ArcSwap<Frontend>,
}

impl Listener {
    pub fn new(frontend: Frontend) -> Self {
        Self { frontend: ArcSwap::from_pointee(frontend) }
    }

    /// The frontend new connections are handed to.
    pub fn frontend(&self) -> Arc<Frontend> {
        self.frontend.load_full()
    }

    /// Installs `frontend` for new connections and returns the previous one.
    pub fn replace(&self, frontend: Frontend) -> Arc<Frontend> {
        let previous = self.frontend.swap(Arc::new(frontend));
        previous.close();
        previous
    }

    /// Accepts connections until `ctx` is done, serving each one on its own task.
    pub async fn serve(&self, ctx: &Context, tcp_listener: TcpListener) {
        match tcp_listener.local_addr() {
            Ok(addr) => info!(%addr, "start listening"),
            Err(e) => error!(cause = %e, "listener has no local address"),
        }

        loop {
            let accepted = tokio::select! {
                accepted = tcp_listener.accept() => accepted,
                () = ctx.done() => break,
            };
            let (tcp_stream, _remote_addr) = match accepted {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    error!(cause = %e, "failed to accept");
                    continue;
                }
            };

            let frontend = self.frontend();
            let conn_ctx = ctx.child();
            tokio::spawn(async move {
                frontend.serve(&conn_ctx, tcp_stream).await;
            });
        }
        info!("stop listening");
    }
}
