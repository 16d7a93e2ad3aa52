use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use common::config::Config;
use common::error::ApiError;
use common::ids::new_id;
use common::methods::METHOD_CATALOG;
use common::time::now_secs;
use common::types::{TestRequest, TestResponse, TestStatus};

use crate::executor::{self, stop_remote};
use crate::state::{OrchestratorState, TestRecord};
use crate::validation::validate_create;

#[derive(Clone)]
pub struct OrchestratorApp {
    pub state: OrchestratorState,
    pub client: reqwest::Client,
    pub config: Arc<Config>,
}

pub fn router(app: OrchestratorApp) -> Router {
    Router::new()
        .route("/test", post(create_test))
        .route("/tests", get(list_tests))
        .route("/test/{id}", get(get_test))
        .route("/test/{id}", delete(stop_test))
        .route("/test/{id}/results", get(get_results))
        .route("/methods", get(get_methods))
        .route("/health", get(health))
        .with_state(app)
}

fn extract_user(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get("x-user")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .ok_or_else(|| ApiError::Auth("X-User header is required".to_string()))
}

fn authorize<'a>(record: &'a TestRecord, user: &str) -> Result<&'a TestRecord, ApiError> {
    if record.user != user {
        return Err(ApiError::Forbidden(
            "you don't have access to this test".to_string(),
        ));
    }
    Ok(record)
}

fn lookup(app: &OrchestratorApp, id: &str, user: &str) -> Result<Arc<TestRecord>, ApiError> {
    let record = app
        .state
        .tests
        .get(id)
        .ok_or_else(|| ApiError::NotFound(format!("test not found: {id}")))?;
    authorize(&record, user)?;
    Ok(record)
}

async fn create_test(
    State(app): State<OrchestratorApp>,
    headers: HeaderMap,
    Json(req): Json<TestRequest>,
) -> Result<Json<TestResponse>, ApiError> {
    let user = extract_user(&headers)?;
    let validated = validate_create(&req)?;

    let record = Arc::new(TestRecord {
        id: new_id(),
        user,
        target: req.target.clone(),
        method: req.method.clone(),
        duration: req.duration,
        threads: req.threads,
        proxy_type: req.proxy_type,
        parameters: req.parameters.clone().unwrap_or_default(),
        created_at: now_secs(),
        status: std::sync::Mutex::new(TestStatus::Queued),
        start_time: std::sync::Mutex::new(None),
        end_time: std::sync::Mutex::new(None),
        module_test_id: std::sync::Mutex::new(None),
        results: std::sync::Mutex::new(None),
    });

    app.state.tests.insert(record.id.clone(), record.clone());

    tokio::spawn(executor::run(
        app.clone(),
        record.clone(),
        validated.target,
        validated.protocol,
        validated.proxy_request,
    ));

    Ok(Json(record.to_response()))
}

async fn get_test(
    State(app): State<OrchestratorApp>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<TestResponse>, ApiError> {
    let user = extract_user(&headers)?;
    let record = lookup(&app, &id, &user)?;
    Ok(Json(record.to_response()))
}

async fn list_tests(
    State(app): State<OrchestratorApp>,
    headers: HeaderMap,
) -> Result<Json<Vec<TestResponse>>, ApiError> {
    let user = extract_user(&headers)?;
    let tests = app
        .state
        .tests
        .values()
        .into_iter()
        .filter(|t| t.user == user)
        .map(|t| t.to_response())
        .collect();
    Ok(Json(tests))
}

/// Recovery fallback for a `module_test_id` that was never recorded: scans
/// every other test's stored results for one whose own `test_id` field
/// matches, and if so uses that test's id as the module id to stop. Kept for
/// parity with the prototype's `test_results` scan; in this executor
/// `module_test_id` is always recorded before RUNNING, so this step is
/// expected to find nothing in practice.
fn find_module_test_id_in_results(app: &OrchestratorApp, test_id: &str) -> Option<String> {
    app.state.tests.values().into_iter().find_map(|other| {
        let results = other.results.lock().unwrap();
        let matches = results
            .as_ref()
            .and_then(|r| r.get("test_id"))
            .and_then(|v| v.as_str())
            == Some(test_id);
        matches.then(|| other.id.clone())
    })
}

async fn stop_test(
    State(app): State<OrchestratorApp>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<TestResponse>, ApiError> {
    let user = extract_user(&headers)?;
    let record = lookup(&app, &id, &user)?;

    if record.status() != TestStatus::Running {
        return Ok(Json(record.to_response()));
    }

    let method_info = METHOD_CATALOG.get(record.method.as_str());
    if let Some(info) = method_info {
        if let Some(fleet) = executor::resolve_fleet(&app, info.protocol) {
            let module_test_id = record
                .module_test_id
                .lock()
                .unwrap()
                .clone()
                .or_else(|| find_module_test_id_in_results(&app, &record.id))
                .unwrap_or_else(|| record.id.clone());
            stop_remote(&app, &fleet, &module_test_id).await;
        }
    }

    record.force_status(TestStatus::Stopped);
    *record.end_time.lock().unwrap() = Some(now_secs());

    Ok(Json(record.to_response()))
}

async fn get_results(
    State(app): State<OrchestratorApp>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = extract_user(&headers)?;
    let record = lookup(&app, &id, &user)?;

    if !record.status().is_terminal() {
        return Err(ApiError::Validation(format!(
            "test results not available for test with status {:?}",
            record.status()
        )));
    }

    let results = record
        .results
        .lock()
        .unwrap()
        .clone()
        .unwrap_or_else(|| serde_json::json!({ "message": "no results available" }));
    Ok(Json(results))
}

async fn get_methods() -> Json<serde_json::Value> {
    Json(serde_json::to_value(&*METHOD_CATALOG).unwrap())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}
