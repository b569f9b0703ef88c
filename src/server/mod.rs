//! Server half of the SSE transport.
//!
//! A client opens `GET /sse` and receives an `endpoint` event naming the URL
//! it must POST JSON-RPC messages to. Every response is pushed back on the
//! same event stream as a `message` event.

mod dispatch;
mod routes;
mod session;

pub use dispatch::{ToolServer, SERVER_NAME};
pub use routes::{router, AppState, MESSAGES_PATH, SSE_PATH};
pub use session::SessionTable;

use anyhow::Context;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Serves until `shutdown` resolves, then ends every open event stream so
/// the graceful shutdown can complete.
pub async fn serve<F>(
    listener: TcpListener,
    server: Arc<ToolServer>,
    keep_alive: Duration,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = AppState::new(server, keep_alive);
    let sessions = state.sessions.clone();
    let app = router(state);

    if let Ok(addr) = listener.local_addr() {
        info!("Listening on http://{}{}", addr, SSE_PATH);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            sessions.close_all().await;
        })
        .await
}

pub async fn bind(host: &str, port: u16) -> anyhow::Result<TcpListener> {
    TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, port))
}

/// Resolves on Ctrl-C. If the handler cannot be installed the server keeps
/// running instead of shutting down at once.
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => {
            error!("Failed to listen for Ctrl-C, shutdown signal disabled: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
