use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("invalid proxy type. Must be 1 (HTTP), 4 (SOCKS4), or 5 (SOCKS5)")]
    InvalidProxyType,
}

impl PoolError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PoolError::InvalidProxyType => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for PoolError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::debug!(%status, error = %self, "proxy pool request failed");
        (
            status,
            axum::Json(ErrorBody {
                detail: self.to_string(),
            }),
        )
            .into_response()
    }
}
