mod headers;
mod methods;

use std::collections::HashMap;
use std::sync::Arc;

use common::config::{Config, HTTP_WORKER_PORT};
use tracing_subscriber::EnvFilter;
use worker_core::dispatch::MethodTable;
use worker_core::{WorkerApp, WorkerService, router, wait_for_shutdown_signal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("install rustls crypto provider");

    let _config = Config::from_env();

    let mut table: MethodTable = HashMap::new();
    table.insert("HTTP_FLOOD", Arc::new(methods::HttpFlood));
    table.insert("HTTP_BYPASS", Arc::new(methods::HttpBypass));
    table.insert("SSL_FLOOD", Arc::new(methods::SslFlood));
    table.insert("SLOW_LORIS", Arc::new(methods::SlowLoris));

    let service = WorkerService::new();
    let app = WorkerApp {
        service: service.clone(),
        methods: Arc::new(table),
    };

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", HTTP_WORKER_PORT)).await?;
    tracing::info!(port = HTTP_WORKER_PORT, "http worker listening");

    axum::serve(listener, router(app))
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            service.begin_shutdown().await;
        })
        .await?;

    Ok(())
}
