mod methods;

use std::collections::HashMap;
use std::sync::Arc;

use common::config::{Config, DNS_WORKER_PORT};
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
    table.insert("DNS_FLOOD", Arc::new(methods::DnsFlood));

    let service = WorkerService::new();
    let app = WorkerApp {
        service: service.clone(),
        methods: Arc::new(table),
    };

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", DNS_WORKER_PORT)).await?;
    tracing::info!(port = DNS_WORKER_PORT, "dns worker listening");

    axum::serve(listener, router(app))
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            service.begin_shutdown().await;
        })
        .await?;

    Ok(())
}
