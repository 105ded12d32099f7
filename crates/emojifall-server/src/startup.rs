//! Server startup helper for embedding in the application binary.
//!
//! Provides [`spawn_server`] which launches the drop server on a
//! background Tokio task so the binary can keep its main task free for
//! signal handling.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::server::{ServerConfig, ServerError, start_server};
use crate::state::AppState;

/// Errors that can occur when spawning the drop server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Spawn the drop server on a background Tokio task.
///
/// Binds to `0.0.0.0:{port}` and serves the status pages, the ingest
/// endpoint, and the viewer event stream. Returns a [`JoinHandle`] so the
/// caller can manage the server's lifecycle alongside its own shutdown
/// logic.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the bind address cannot be
/// constructed. Bind failures at serve time are logged from the
/// background task.
pub async fn spawn_server(
    port: u16,
    state: Arc<AppState>,
) -> Result<JoinHandle<()>, StartupError> {
    let config = ServerConfig {
        host: String::from("0.0.0.0"),
        port,
    };

    // Catch obviously malformed addresses before the background task
    // starts; the actual bind happens inside start_server.
    let addr_str = format!("{}:{}", config.host, config.port);
    let _: std::net::SocketAddr = addr_str.parse().map_err(|e| {
        StartupError::Server(ServerError::Bind(format!("invalid address {addr_str}: {e}")))
    })?;

    let handle = tokio::spawn(async move {
        if let Err(e) = start_server(&config, state).await {
            tracing::error!(error = %e, "drop server exited with error");
        }
    });

    tracing::info!(port, "drop server spawned on background task");

    Ok(handle)
}
