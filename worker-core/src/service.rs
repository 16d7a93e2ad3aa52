use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::metrics::{Metrics, MetricsRegistry};
use common::types::{
    ExecuteResponse, HealthResponse, HealthStatus, StopResponse, TestParameters, TestStatus,
    WorkerStatusResponse,
};
use tokio_util::sync::CancellationToken;

use crate::WorkerError;
use crate::ctx::WorkerCtx;
use crate::dispatch::{LoadMethod, MethodTable};
use crate::registry::Registry;
use crate::resources::ResourceRegistry;

/// Worker-side `TestRun`: per-active-test bookkeeping plus the handle that
/// lets `stop`/`status` observe and cancel it.
pub struct TestEntry {
    pub test_id: String,
    pub target: String,
    pub start_time: f64,
    pub status: Mutex<TestStatus>,
    pub end_time: Mutex<Option<f64>>,
    pub results: Mutex<Option<serde_json::Value>>,
    pub metrics: Arc<Metrics>,
    pub stop: CancellationToken,
}

/// The lifecycle engine shared by every protocol fleet: process-wide
/// shutdown token (parent of every test's stop token), the registry of
/// active tests, the Open Metrics counters they report through, and the
/// weak-set-replacement registry of long-lived sockets/sessions a shutdown
/// sweep force-closes.
pub struct WorkerService {
    shutdown: CancellationToken,
    tests: Registry<TestEntry>,
    metrics: MetricsRegistry,
    resources: ResourceRegistry,
}

impl WorkerService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            shutdown: CancellationToken::new(),
            tests: Registry::new(),
            metrics: MetricsRegistry::new(),
            resources: ResourceRegistry::new(),
        })
    }

    pub fn metrics_text(&self) -> String {
        self.metrics.encode()
    }

    /// Sets the process-wide shutdown flag, which cancels every test's stop
    /// token (child tokens) in one call; force-closes every registered
    /// socket/session so long-lived connections (SLOW_LORIS, TCP_CONNECTION)
    /// don't wait on their own loop's wake cadence to notice, then gives
    /// workers a moment to unwind and finalize their result records.
    pub async fn begin_shutdown(&self) {
        self.shutdown.cancel();
        self.resources.close_all();
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub fn active_tests(&self) -> usize {
        self.tests.len()
    }

    pub fn health(&self) -> HealthResponse {
        let status = if self.is_shutting_down() {
            HealthStatus::ShuttingDown
        } else {
            HealthStatus::Healthy
        };
        HealthResponse {
            status,
            active_tests: self.active_tests(),
        }
    }

    #[tracing::instrument(skip(self, params, methods), fields(method = %params.method))]
    pub fn execute(
        self: &Arc<Self>,
        params: TestParameters,
        methods: &MethodTable,
    ) -> Result<ExecuteResponse, WorkerError> {
        if self.is_shutting_down() {
            return Err(WorkerError::ShuttingDown);
        }
        let method = methods
            .get(params.method.as_str())
            .ok_or_else(|| WorkerError::UnknownMethod(params.method.clone()))?
            .clone();

        let test_id = common::ids::new_id();
        let stop = self.shutdown.child_token();
        let metrics = Arc::new(self.metrics.for_test(&test_id));
        let start_time = common::time::now_secs();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(params.duration as u64);

        let entry = Arc::new(TestEntry {
            test_id: test_id.clone(),
            target: params.target.clone(),
            start_time,
            status: Mutex::new(TestStatus::Running),
            end_time: Mutex::new(None),
            results: Mutex::new(None),
            metrics: metrics.clone(),
            stop: stop.clone(),
        });
        self.tests.insert(test_id.clone(), entry.clone());

        let ctx = Arc::new(WorkerCtx {
            test_id: test_id.clone(),
            target: params.target.clone(),
            duration_secs: params.duration,
            threads: params.threads,
            parameters: params.parameters.clone().unwrap_or_default(),
            proxies: params.proxies.clone().unwrap_or_default(),
            deadline,
            stop,
            metrics,
            resources: self.resources.clone(),
        });

        let service = self.clone();
        let threads = params.threads;
        tokio::spawn(async move {
            service.run_test(entry, ctx, method, threads).await;
        });

        Ok(ExecuteResponse {
            test_id,
            status: "started".to_string(),
        })
    }

    /// Spawns `threads` worker units into a bounded pool scoped to this
    /// test's stop token, waits for them with an overall `duration + 10s`
    /// timeout (units must be idempotent on cancel), and finalizes the
    /// result record. STOPPED wins over a later natural COMPLETED.
    async fn run_test(
        self: Arc<Self>,
        entry: Arc<TestEntry>,
        ctx: Arc<WorkerCtx>,
        method: Arc<dyn LoadMethod>,
        threads: u32,
    ) {
        let mut set = tokio::task::JoinSet::new();
        for _ in 0..threads {
            let ctx = ctx.clone();
            let method = method.clone();
            set.spawn(async move { method.run_unit(ctx).await });
        }

        let wait = Duration::from_secs(ctx.duration_secs as u64) + Duration::from_secs(10);
        let mut outcomes = Vec::with_capacity(threads as usize);
        let joined = tokio::time::timeout(wait, async {
            while let Some(res) = set.join_next().await {
                if let Ok(outcome) = res {
                    outcomes.push(outcome);
                }
            }
        })
        .await;
        if joined.is_err() {
            tracing::warn!(test_id = %entry.test_id, "worker pool exceeded grace period, proceeding");
            set.abort_all();
        }

        // If every unit refused to run at all (e.g. SYN_FLOOD without
        // raw-socket privilege), the test never did any work: FAILED, not
        // COMPLETED. A mix of Ok/Err is a normal per-unit failure already
        // reflected in the `failures` counter.
        let all_failed = !outcomes.is_empty() && outcomes.iter().all(|o| o.is_err());
        let failure_message = outcomes.iter().find_map(|o| o.as_ref().err().cloned());

        {
            let mut status = entry.status.lock().expect("test status lock poisoned");
            if *status != TestStatus::Stopped {
                *status = if all_failed {
                    TestStatus::Failed
                } else {
                    TestStatus::Completed
                };
            }
        }

        let elapsed = common::time::now_secs() - entry.start_time;
        let snapshot = ctx.metrics.snapshot(elapsed);
        {
            let mut end_time = entry.end_time.lock().expect("end_time lock poisoned");
            if end_time.is_none() {
                *end_time = Some(common::time::now_secs());
            }
        }
        let result = serde_json::json!({
            "test_id": entry.test_id,
            "target": entry.target,
            "duration": elapsed,
            "metrics": snapshot,
            "error": failure_message,
        });
        *entry.results.lock().expect("results lock poisoned") = Some(result);
    }

    /// Sets the stop signal and marks STOPPED locally; a later natural
    /// completion observes this and does not overwrite the status.
    pub fn stop(&self, test_id: &str) -> Result<StopResponse, WorkerError> {
        let entry = self
            .tests
            .get(test_id)
            .ok_or_else(|| WorkerError::NotFound(test_id.to_string()))?;
        {
            let mut status = entry.status.lock().expect("test status lock poisoned");
            if *status != TestStatus::Running {
                return Err(WorkerError::NotRunning(test_id.to_string()));
            }
            *status = TestStatus::Stopped;
        }
        entry.stop.cancel();
        *entry.end_time.lock().expect("end_time lock poisoned") = Some(common::time::now_secs());
        Ok(StopResponse {
            test_id: test_id.to_string(),
            status: "stopped".to_string(),
        })
    }

    pub fn status(&self, test_id: &str) -> Result<WorkerStatusResponse, WorkerError> {
        let entry = self
            .tests
            .get(test_id)
            .ok_or_else(|| WorkerError::NotFound(test_id.to_string()))?;
        let status = *entry.status.lock().expect("test status lock poisoned");
        let end_time = *entry.end_time.lock().expect("end_time lock poisoned");
        let results = entry.results.lock().expect("results lock poisoned").clone();
        let current_metrics = if status == TestStatus::Running {
            let elapsed = common::time::now_secs() - entry.start_time;
            Some(
                serde_json::to_value(entry.metrics.snapshot(elapsed))
                    .unwrap_or(serde_json::Value::Null),
            )
        } else {
            None
        };
        Ok(WorkerStatusResponse {
            test_id: test_id.to_string(),
            status,
            start_time: entry.start_time,
            end_time,
            duration: end_time.map(|e| e - entry.start_time),
            current_metrics,
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct Noop;

    #[async_trait]
    impl LoadMethod for Noop {
        async fn run_unit(&self, ctx: Arc<WorkerCtx>) -> Result<(), String> {
            ctx.metrics.events_sent.inc();
            ctx.metrics.successes.inc();
            Ok(())
        }
    }

    fn methods() -> MethodTable {
        let mut m: MethodTable = HashMap::new();
        m.insert("NOOP", Arc::new(Noop));
        m
    }

    #[tokio::test]
    async fn execute_then_status_reaches_terminal() {
        let service = WorkerService::new();
        let params = TestParameters {
            target: "example.test".into(),
            method: "NOOP".into(),
            duration: 1,
            threads: 2,
            parameters: None,
            proxies: None,
        };
        let resp = service.execute(params, &methods()).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let status = service.status(&resp.test_id).unwrap();
        assert!(matches!(status.status, TestStatus::Completed | TestStatus::Running));
    }

    #[tokio::test]
    async fn stop_unknown_test_is_not_found() {
        let service = WorkerService::new();
        assert!(matches!(service.stop("missing"), Err(WorkerError::NotFound(_))));
    }

    #[tokio::test]
    async fn execute_rejected_while_shutting_down() {
        let service = WorkerService::new();
        service.begin_shutdown().await;
        let params = TestParameters {
            target: "example.test".into(),
            method: "NOOP".into(),
            duration: 1,
            threads: 1,
            parameters: None,
            proxies: None,
        };
        assert!(matches!(
            service.execute(params, &methods()),
            Err(WorkerError::ShuttingDown)
        ));
    }
}
