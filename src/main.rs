mod executor;
mod router;
mod state;
mod validation;

use std::sync::Arc;

use common::config::{Config, ORCHESTRATOR_PORT};
use router::{OrchestratorApp, router};
use state::OrchestratorState;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = Arc::new(Config::from_env());
    let client = reqwest::Client::builder().build()?;

    let app = OrchestratorApp {
        state: OrchestratorState::new(),
        client,
        config,
    };

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", ORCHESTRATOR_PORT)).await?;
    tracing::info!(port = ORCHESTRATOR_PORT, "orchestrator listening");

    axum::serve(
        listener,
        router(app)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
    })
    .await?;

    Ok(())
}
