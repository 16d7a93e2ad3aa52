//! Types, errors and configuration shared between the orchestrator, the
//! protocol worker fleets and the proxy pool.

pub mod config;
pub mod error;
pub mod ids;
pub mod metrics;
pub mod methods;
pub mod target;
pub mod time;
pub mod types;

pub use error::ApiError;
pub use types::{
    Proxy, ProxyType, ProtocolType, TestParameters, TestRequest, TestResponse, TestStatus,
};
