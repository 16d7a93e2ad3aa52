use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("unknown method: {0}")]
    UnknownMethod(String),
    #[error("shutting down")]
    ShuttingDown,
    #[error("test not found: {0}")]
    NotFound(String),
    #[error("test not running: {0}")]
    NotRunning(String),
    #[error("runtime failure: {0}")]
    Runtime(String),
}

impl WorkerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WorkerError::UnknownMethod(_) => StatusCode::BAD_REQUEST,
            WorkerError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            WorkerError::NotFound(_) => StatusCode::NOT_FOUND,
            WorkerError::NotRunning(_) => StatusCode::BAD_REQUEST,
            WorkerError::Runtime(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for WorkerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::debug!(%status, error = %self, "worker request failed");
        (
            status,
            axum::Json(ErrorBody {
                detail: self.to_string(),
            }),
        )
            .into_response()
    }
}
