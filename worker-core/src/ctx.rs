use std::collections::HashMap;
use std::sync::Arc;

use common::Proxy;
use common::metrics::Metrics;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::resources::ResourceRegistry;

/// Everything a worker unit's inner loop needs: target parameters, where to
/// record what it does, and how to notice it should stop.
pub struct WorkerCtx {
    pub test_id: String,
    pub target: String,
    pub duration_secs: u32,
    pub threads: u32,
    pub parameters: HashMap<String, String>,
    pub proxies: Vec<Proxy>,
    pub deadline: Instant,
    pub stop: CancellationToken,
    pub metrics: Arc<Metrics>,
    pub resources: ResourceRegistry,
}

impl WorkerCtx {
    /// The termination predicate every worker unit loop checks: `now() <
    /// end_time AND NOT stop_signal AND NOT shutdown_in_progress` (the
    /// shutdown flag is folded in because `stop` is always a child of the
    /// process-wide shutdown token).
    pub fn should_continue(&self) -> bool {
        Instant::now() < self.deadline && !self.stop.is_cancelled()
    }

    pub fn pick_proxy(&self) -> Option<&Proxy> {
        if self.proxies.is_empty() {
            return None;
        }
        use rand::Rng;
        let idx = rand::rng().random_range(0..self.proxies.len());
        self.proxies.get(idx)
    }
}
