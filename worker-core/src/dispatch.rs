use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::ctx::WorkerCtx;

/// The method-dispatch capability: a tagged worker body differing only in
/// the inner loop. Every protocol's methods (`HTTP_FLOOD`, `TCP_FLOOD`, ...)
/// implement this the same way; `worker-core` never knows the concrete type.
#[async_trait]
pub trait LoadMethod: Send + Sync {
    /// Run one worker unit to completion. Implementations must respect
    /// `ctx.should_continue()` as their loop predicate and must leave no
    /// registered resource open when they return. `Err` signals the unit
    /// could not run at all (e.g. `SYN_FLOOD` without raw-socket
    /// privilege); if every unit in a test reports `Err`, the test is
    /// marked FAILED instead of COMPLETED.
    async fn run_unit(&self, ctx: Arc<WorkerCtx>) -> Result<(), String>;
}

pub type MethodTable = HashMap<&'static str, Arc<dyn LoadMethod>>;
