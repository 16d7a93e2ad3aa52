//! The per-test executor coroutine: starts the remote job on the right
//! fleet, polls it to completion, and enforces the hard deadline.

use std::sync::Arc;
use std::time::Duration;

use common::time::now_secs;
use common::types::{ExecuteResponse, Proxy, TestParameters, TestStatus, WorkerStatusResponse};
use serde_json::json;

use crate::router::OrchestratorApp;
use crate::state::TestRecord;
use crate::validation::ProxyRequest;

const START_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_TIMEOUT: Duration = Duration::from_secs(10);
const STOP_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_secs(5);
const DEADLINE_BUFFER_SECS: f64 = 60.0;

fn fleet_url(app: &OrchestratorApp, protocol: common::types::ProtocolType) -> Option<String> {
    let fleet = common::methods::fleet_for(protocol)?;
    Some(
        match fleet {
            "http" => &app.config.http_module_url,
            "tcp" => &app.config.tcp_module_url,
            "dns" => &app.config.dns_module_url,
            _ => unreachable!("fleet_for only returns http/tcp/dns"),
        }
        .clone(),
    )
}

async fn fetch_proxies(app: &OrchestratorApp, proxy_request: ProxyRequest, count: u32) -> Option<Vec<Proxy>> {
    let proxy_type = match proxy_request {
        ProxyRequest::None => return None,
        ProxyRequest::All => None,
        ProxyRequest::Specific(t) => Some(t),
    };

    let mut req = app
        .client
        .get(format!("{}/proxies", app.config.proxy_service_url))
        .query(&[("count", count.to_string())]);
    if let Some(t) = proxy_type {
        req = req.query(&[("type", u8::from(t).to_string())]);
    }

    match req.send().await {
        Ok(resp) if resp.status().is_success() => {
            let proxies: Vec<Proxy> = resp.json().await.ok()?;
            Some(proxies.iter().map(Proxy::for_forwarding).collect())
        }
        _ => None,
    }
}

/// Runs the full lifecycle for one test; any error along the way is caught
/// and converted to a FAILED status with the error recorded in results,
/// matching the platform's "uncaught exception -> FAILED" rule.
pub async fn run(
    app: OrchestratorApp,
    record: Arc<TestRecord>,
    target: String,
    protocol: common::types::ProtocolType,
    proxy_request: ProxyRequest,
) {
    if let Err(e) = run_inner(&app, &record, target, protocol, proxy_request).await {
        tracing::error!(test_id = %record.id, error = %e, "test execution failed");
        record.set_status_unless_stopped(TestStatus::Failed);
        *record.end_time.lock().unwrap() = Some(now_secs());
        *record.results.lock().unwrap() = Some(json!({ "error": e }));
    }
}

async fn run_inner(
    app: &OrchestratorApp,
    record: &Arc<TestRecord>,
    target: String,
    protocol: common::types::ProtocolType,
    proxy_request: ProxyRequest,
) -> Result<(), String> {
    let start_time = now_secs();
    record.force_status(TestStatus::Running);
    *record.start_time.lock().unwrap() = Some(start_time);

    let fleet = fleet_url(app, protocol).ok_or_else(|| "no fleet for method's protocol".to_string())?;
    let proxies = fetch_proxies(app, proxy_request, record.threads).await;
    if proxy_request != ProxyRequest::None && proxies.is_none() {
        tracing::warn!(test_id = %record.id, "proceeding without proxies after pool fetch failure");
    }

    let params = TestParameters {
        target,
        method: record.method.clone(),
        duration: record.duration,
        threads: record.threads,
        parameters: Some(record.parameters.clone()),
        proxies,
    };

    let start_resp = app
        .client
        .post(format!("{fleet}/execute"))
        .timeout(START_TIMEOUT)
        .json(&params)
        .send()
        .await
        .map_err(|e| format!("failed to start test: {e}"))?;

    if !start_resp.status().is_success() {
        let body = start_resp.text().await.unwrap_or_default();
        return Err(format!("fleet rejected execute: {body}"));
    }
    let started: ExecuteResponse = start_resp
        .json()
        .await
        .map_err(|e| format!("fleet returned an unparseable execute response: {e}"))?;
    *record.module_test_id.lock().unwrap() = Some(started.test_id.clone());

    let deadline = start_time + record.duration as f64 + DEADLINE_BUFFER_SECS;
    while now_secs() < deadline {
        if record.status() == TestStatus::Stopped {
            break;
        }

        match app
            .client
            .get(format!("{fleet}/status/{}", started.test_id))
            .timeout(POLL_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                if let Ok(status) = resp.json::<WorkerStatusResponse>().await {
                    if status.status.is_terminal() {
                        record.set_status_unless_stopped(status.status);
                        *record.end_time.lock().unwrap() = Some(now_secs());
                        if let Some(results) = status.results {
                            *record.results.lock().unwrap() = Some(results);
                        }
                        return Ok(());
                    }
                }
            }
            Ok(resp) => {
                tracing::debug!(status = %resp.status(), "poll returned a non-success status");
            }
            Err(e) => {
                tracing::debug!(error = %e, "poll request errored, will retry");
            }
        }

        tokio::time::sleep(POLL_INTERVAL).await;
    }

    if record.status() == TestStatus::Running {
        tracing::warn!(test_id = %record.id, "test timed out at the hard deadline");
        let _ = app
            .client
            .delete(format!("{fleet}/execute/{}", started.test_id))
            .timeout(STOP_TIMEOUT)
            .send()
            .await;
        record.set_status_unless_stopped(TestStatus::Completed);
        *record.end_time.lock().unwrap() = Some(now_secs());
        *record.results.lock().unwrap() =
            Some(json!({ "timed_out": true, "message": "test completed after maximum duration" }));
    }

    Ok(())
}

/// Best-effort remote stop, used by `StopTest`: local STOPPED is recorded
/// unconditionally regardless of how this call turns out.
pub async fn stop_remote(app: &OrchestratorApp, fleet: &str, module_test_id: &str) {
    if let Err(e) = app
        .client
        .delete(format!("{fleet}/execute/{module_test_id}"))
        .timeout(STOP_TIMEOUT)
        .send()
        .await
    {
        tracing::warn!(%module_test_id, error = %e, "remote stop failed, marking stopped locally anyway");
    }
}

pub fn resolve_fleet(app: &OrchestratorApp, protocol: common::types::ProtocolType) -> Option<String> {
    fleet_url(app, protocol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use common::config::Config;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app_against(mock: &MockServer) -> OrchestratorApp {
        let mut config = Config::from_env();
        config.http_module_url = mock.uri();
        OrchestratorApp {
            state: crate::state::OrchestratorState::new(),
            client: reqwest::Client::new(),
            config: Arc::new(config),
        }
    }

    fn record(method: &str, duration: u32) -> Arc<TestRecord> {
        Arc::new(TestRecord {
            id: common::ids::new_id(),
            user: "alice".into(),
            target: "example.test".into(),
            method: method.into(),
            duration,
            threads: 1,
            proxy_type: None,
            parameters: Default::default(),
            created_at: now_secs(),
            status: Mutex::new(TestStatus::Queued),
            start_time: Mutex::new(None),
            end_time: Mutex::new(None),
            module_test_id: Mutex::new(None),
            results: Mutex::new(None),
        })
    }

    #[tokio::test]
    async fn run_follows_fleet_through_to_completed() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex("^/execute$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ExecuteResponse {
                test_id: "mod-1".into(),
                status: "started".into(),
            }))
            .mount(&mock)
            .await;
        Mock::given(method("GET"))
            .and(path_regex("^/status/mod-1$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(WorkerStatusResponse {
                test_id: "mod-1".into(),
                status: TestStatus::Completed,
                start_time: now_secs(),
                end_time: Some(now_secs()),
                duration: Some(1.0),
                current_metrics: None,
                results: Some(json!({"sent": 10})),
            }))
            .mount(&mock)
            .await;

        let app = app_against(&mock);
        let rec = record("HTTP_FLOOD", 1);
        run(
            app,
            rec.clone(),
            "example.test".into(),
            common::types::ProtocolType::Http,
            ProxyRequest::None,
        )
        .await;

        assert_eq!(rec.status(), TestStatus::Completed);
        assert_eq!(rec.module_test_id.lock().unwrap().as_deref(), Some("mod-1"));
        assert_eq!(
            rec.results.lock().unwrap().as_ref().unwrap()["sent"],
            json!(10)
        );
    }

    #[tokio::test]
    async fn remote_stopped_maps_to_local_stopped_not_failed() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex("^/execute$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ExecuteResponse {
                test_id: "mod-2".into(),
                status: "started".into(),
            }))
            .mount(&mock)
            .await;
        Mock::given(method("GET"))
            .and(path_regex("^/status/mod-2$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(WorkerStatusResponse {
                test_id: "mod-2".into(),
                status: TestStatus::Stopped,
                start_time: now_secs(),
                end_time: Some(now_secs()),
                duration: Some(1.0),
                current_metrics: None,
                results: None,
            }))
            .mount(&mock)
            .await;

        let app = app_against(&mock);
        let rec = record("HTTP_FLOOD", 1);
        run(
            app,
            rec.clone(),
            "example.test".into(),
            common::types::ProtocolType::Http,
            ProxyRequest::None,
        )
        .await;

        assert_eq!(rec.status(), TestStatus::Stopped);
    }

    #[tokio::test]
    async fn execute_failure_marks_test_failed_with_error() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex("^/execute$"))
            .respond_with(ResponseTemplate::new(503).set_body_string("module overloaded"))
            .mount(&mock)
            .await;

        let app = app_against(&mock);
        let rec = record("HTTP_FLOOD", 1);
        run(
            app,
            rec.clone(),
            "example.test".into(),
            common::types::ProtocolType::Http,
            ProxyRequest::None,
        )
        .await;

        assert_eq!(rec.status(), TestStatus::Failed);
        assert!(rec.results.lock().unwrap().as_ref().unwrap()["error"]
            .as_str()
            .unwrap()
            .contains("module overloaded"));
    }

    #[tokio::test]
    async fn local_stop_during_poll_is_observed_without_overwrite() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex("^/execute$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ExecuteResponse {
                test_id: "mod-3".into(),
                status: "started".into(),
            }))
            .mount(&mock)
            .await;
        // status endpoint never turns terminal; only the local stop should end the loop
        Mock::given(method("GET"))
            .and(path_regex("^/status/mod-3$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(WorkerStatusResponse {
                test_id: "mod-3".into(),
                status: TestStatus::Running,
                start_time: now_secs(),
                end_time: None,
                duration: None,
                current_metrics: None,
                results: None,
            }))
            .mount(&mock)
            .await;

        let app = app_against(&mock);
        let rec = record("HTTP_FLOOD", 120);

        let handle = tokio::spawn(run(
            app,
            rec.clone(),
            "example.test".into(),
            common::types::ProtocolType::Http,
            ProxyRequest::None,
        ));
        // give run_inner time to flip RUNNING and do its first poll, then
        // simulate a concurrent StopTest landing mid-poll-loop
        tokio::time::sleep(Duration::from_millis(200)).await;
        rec.force_status(TestStatus::Stopped);

        tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .expect("run should observe STOPPED on its next loop check")
            .unwrap();

        assert_eq!(rec.status(), TestStatus::Stopped);
    }
}
