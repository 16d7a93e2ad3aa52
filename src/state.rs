//! The orchestrator's central entity: a `TestRecord` plus the registry of
//! them. Status, timestamps, the remote `module_test_id` and the final
//! result are each independently mutable because the executor task and API
//! handlers observe/update them concurrently.

use std::collections::HashMap;
use std::sync::Mutex;

use common::types::{TestResponse, TestStatus};
use worker_core::registry::Registry;

pub struct TestRecord {
    pub id: String,
    pub user: String,
    pub target: String,
    pub method: String,
    pub duration: u32,
    pub threads: u32,
    pub proxy_type: Option<u8>,
    pub parameters: HashMap<String, String>,
    pub created_at: f64,
    pub status: Mutex<TestStatus>,
    pub start_time: Mutex<Option<f64>>,
    pub end_time: Mutex<Option<f64>>,
    pub module_test_id: Mutex<Option<String>>,
    pub results: Mutex<Option<serde_json::Value>>,
}

impl TestRecord {
    pub fn status(&self) -> TestStatus {
        *self.status.lock().unwrap()
    }

    /// STOPPED is absorbing: once set, nothing else may overwrite it. Every
    /// other terminal write goes through this so the executor can't race a
    /// concurrent `StopTest` into clobbering it (spec.md's
    /// terminal-wins-except-STOPPED-wins-over-COMPLETED rule).
    pub fn set_status_unless_stopped(&self, status: TestStatus) {
        let mut guard = self.status.lock().unwrap();
        if *guard != TestStatus::Stopped {
            *guard = status;
        }
    }

    pub fn force_status(&self, status: TestStatus) {
        *self.status.lock().unwrap() = status;
    }

    pub fn to_response(&self) -> TestResponse {
        TestResponse {
            id: self.id.clone(),
            user: self.user.clone(),
            target: self.target.clone(),
            method: self.method.clone(),
            duration: self.duration,
            threads: self.threads,
            proxy_type: self.proxy_type,
            status: self.status(),
            created_at: self.created_at,
            start_time: *self.start_time.lock().unwrap(),
            end_time: *self.end_time.lock().unwrap(),
            module_test_id: self.module_test_id.lock().unwrap().clone(),
        }
    }
}

#[derive(Clone)]
pub struct OrchestratorState {
    pub tests: std::sync::Arc<Registry<TestRecord>>,
}

impl OrchestratorState {
    pub fn new() -> Self {
        Self {
            tests: std::sync::Arc::new(Registry::new()),
        }
    }
}

impl Default for OrchestratorState {
    fn default() -> Self {
        Self::new()
    }
}
