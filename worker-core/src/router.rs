use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use common::types::{ExecuteResponse, HealthResponse, StopResponse, TestParameters, WorkerStatusResponse};

use crate::WorkerError;
use crate::dispatch::MethodTable;
use crate::service::WorkerService;

/// Bundles the lifecycle engine with the protocol's method table so the
/// shared handlers below can dispatch without knowing the concrete fleet.
#[derive(Clone)]
pub struct WorkerApp {
    pub service: Arc<WorkerService>,
    pub methods: Arc<MethodTable>,
}

/// The REST contract every worker fleet exposes: `POST /execute`, `DELETE
/// /execute/{id}`, `GET /status/{id}`, `GET /health`, `GET /metrics`.
pub fn router(app: WorkerApp) -> Router {
    Router::new()
        .route("/execute", post(execute_handler))
        .route("/execute/{id}", delete(stop_handler))
        .route("/status/{id}", get(status_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(app)
}

async fn execute_handler(
    State(app): State<WorkerApp>,
    Json(params): Json<TestParameters>,
) -> Result<Json<ExecuteResponse>, WorkerError> {
    let resp = app.service.execute(params, &app.methods)?;
    Ok(Json(resp))
}

async fn stop_handler(
    State(app): State<WorkerApp>,
    Path(id): Path<String>,
) -> Result<Json<StopResponse>, WorkerError> {
    let resp = app.service.stop(&id)?;
    Ok(Json(resp))
}

async fn status_handler(
    State(app): State<WorkerApp>,
    Path(id): Path<String>,
) -> Result<Json<WorkerStatusResponse>, WorkerError> {
    let resp = app.service.status(&id)?;
    Ok(Json(resp))
}

async fn health_handler(State(app): State<WorkerApp>) -> Json<HealthResponse> {
    Json(app.service.health())
}

async fn metrics_handler(State(app): State<WorkerApp>) -> String {
    app.service.metrics_text()
}
