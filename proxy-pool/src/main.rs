mod error;
mod router;
mod service;
mod sources;
mod store;
mod validate;

use std::sync::Arc;

use common::config::{Config, PROXY_POOL_PORT};
use router::{PoolApp, router};
use store::ProxyStore;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let _config = Config::from_env();

    let client = reqwest::Client::builder().build()?;
    let app = PoolApp {
        store: Arc::new(ProxyStore::new()),
        client,
    };

    // Startup warm-up: refresh then validate once, in the background, so it
    // never blocks the first request (spec requires reads never block on it).
    tokio::spawn({
        let store = app.store.clone();
        let client = app.client.clone();
        async move {
            service::refresh_all(store.clone(), client).await;
            service::validate_all(store, None, 100).await;
        }
    });

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", PROXY_POOL_PORT)).await?;
    tracing::info!(port = PROXY_POOL_PORT, "proxy pool listening");

    axum::serve(listener, router(app).layer(TraceLayer::new_for_http())).await?;

    Ok(())
}
