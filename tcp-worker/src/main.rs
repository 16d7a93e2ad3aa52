mod methods;

use std::collections::HashMap;
use std::sync::Arc;

use common::config::{Config, TCP_WORKER_PORT};
use tracing_subscriber::EnvFilter;
use worker_core::dispatch::MethodTable;
use worker_core::{WorkerApp, WorkerService, router, wait_for_shutdown_signal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let _config = Config::from_env();

    let mut table: MethodTable = HashMap::new();
    table.insert("TCP_FLOOD", Arc::new(methods::TcpFlood));
    table.insert("TCP_CONNECTION", Arc::new(methods::TcpConnection));
    table.insert("UDP_FLOOD", Arc::new(methods::UdpFlood));
    table.insert("SYN_FLOOD", Arc::new(methods::SynFlood));

    let service = WorkerService::new();
    let app = WorkerApp {
        service: service.clone(),
        methods: Arc::new(table),
    };

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", TCP_WORKER_PORT)).await?;
    tracing::info!(port = TCP_WORKER_PORT, "tcp worker listening");

    axum::serve(listener, router(app))
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            service.begin_shutdown().await;
        })
        .await?;

    Ok(())
}
