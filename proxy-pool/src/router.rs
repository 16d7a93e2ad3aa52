use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use common::types::{Proxy, ProxyType};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::PoolError;
use crate::service::{refresh_all, validate_all};
use crate::store::ProxyStore;

#[derive(Clone)]
pub struct PoolApp {
    pub store: Arc<ProxyStore>,
    pub client: reqwest::Client,
}

pub fn router(app: PoolApp) -> Router {
    Router::new()
        .route("/proxies", get(get_proxies))
        .route("/refresh", post(post_refresh))
        .route("/validate", post(post_validate))
        .route("/stats", get(get_stats))
        .route("/health", get(get_health))
        .with_state(app)
}

fn parse_type(raw: Option<u8>) -> Result<Option<ProxyType>, PoolError> {
    match raw {
        None => Ok(None),
        Some(0) => Ok(None),
        Some(v) => ProxyType::from_u8(v).map_err(|_| PoolError::InvalidProxyType),
    }
}

#[derive(Deserialize)]
struct ProxiesQuery {
    #[serde(rename = "type")]
    proxy_type: Option<u8>,
    count: Option<usize>,
    valid_only: Option<bool>,
}

async fn get_proxies(
    State(app): State<PoolApp>,
    Query(q): Query<ProxiesQuery>,
) -> Result<Json<Vec<Proxy>>, PoolError> {
    let proxy_type = parse_type(q.proxy_type)?;
    let count = q.count.unwrap_or(100);
    let valid_only = q.valid_only.unwrap_or(true);

    if app.store.needs_refresh() {
        tokio::spawn(refresh_all(app.store.clone(), app.client.clone()));
    }

    let result = app.store.select(proxy_type, valid_only, count);

    if result.len() < count / 2 {
        tokio::spawn(validate_all(app.store.clone(), proxy_type, count));
    }

    Ok(Json(result))
}

#[derive(Serialize)]
struct StatusBody {
    status: &'static str,
}

async fn post_refresh(State(app): State<PoolApp>) -> Json<StatusBody> {
    tokio::spawn(refresh_all(app.store.clone(), app.client.clone()));
    Json(StatusBody {
        status: "Refreshing proxies in background",
    })
}

#[derive(Deserialize)]
struct ValidateQuery {
    #[serde(rename = "type")]
    proxy_type: Option<u8>,
    count: Option<usize>,
}

async fn post_validate(
    State(app): State<PoolApp>,
    Query(q): Query<ValidateQuery>,
) -> Result<Json<StatusBody>, PoolError> {
    let proxy_type = parse_type(q.proxy_type)?;
    let count = q.count.unwrap_or(100);
    tokio::spawn(validate_all(app.store.clone(), proxy_type, count));
    Ok(Json(StatusBody {
        status: "Validating proxies in background",
    }))
}

async fn get_stats(State(app): State<PoolApp>) -> Json<serde_json::Value> {
    let (http, socks4, socks5) = app.store.counts();
    Json(json!({
        "proxies": {
            "http": http,
            "socks4": socks4,
            "socks5": socks5,
        },
        "stats": {
            "proxies_fetched": app.store.stats.proxies_fetched.get(),
            "proxies_validated": app.store.stats.proxies_validated.get(),
            "valid_proxies": app.store.stats.valid_proxies.get(),
            "invalid_proxies": app.store.stats.invalid_proxies.get(),
        },
        "last_refresh": app.store.last_refresh_epoch(),
    }))
}

async fn get_health() -> Json<StatusBody> {
    Json(StatusBody { status: "healthy" })
}
