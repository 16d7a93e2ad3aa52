//! Shared lifecycle, cancellation and dispatch machinery used by every
//! protocol-specific worker fleet (HTTP, TCP/UDP, DNS).

pub mod ctx;
pub mod dispatch;
pub mod error;
pub mod registry;
pub mod resources;
pub mod router;
pub mod service;
pub mod signal;

pub use ctx::WorkerCtx;
pub use dispatch::{LoadMethod, MethodTable};
pub use error::WorkerError;
pub use resources::{ResourceHandle, ResourceRegistry};
pub use router::{WorkerApp, router};
pub use service::WorkerService;
pub use signal::wait_for_shutdown_signal;
