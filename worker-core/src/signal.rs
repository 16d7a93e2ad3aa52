//! Process-termination signal handling shared by every worker fleet's
//! `main`, matching the orchestrator's own SIGTERM+SIGINT pair.

use tokio::signal::unix::{SignalKind, signal};

/// Resolves when either SIGINT or SIGTERM arrives.
pub async fn wait_for_shutdown_signal() {
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received SIGINT, shutting down");
        }
        _ = sigterm.recv() => {
            tracing::info!("received SIGTERM, shutting down");
        }
    }
}
