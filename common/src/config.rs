//! Environment-based configuration, read the way the teacher's xDS client
//! reads its own environment (`std::env::var(NAME).unwrap_or(DEFAULT)`),
//! rather than a config-file/clap-args layer.

use std::time::Duration;

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_duration_secs(name: &str, default_secs: u64) -> Duration {
    let raw = std::env::var(name).ok();
    let secs = raw
        .as_deref()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default_secs);
    Duration::from_secs(secs)
}

/// Shared configuration, identical in shape across every binary; each binary
/// only reads the fields relevant to it.
#[derive(Debug, Clone)]
pub struct Config {
    pub secret_key: String,
    pub http_timeout: Duration,
    pub orchestrator_url: String,
    pub http_module_url: String,
    pub tcp_module_url: String,
    pub dns_module_url: String,
    pub proxy_service_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            secret_key: env_or("SECRET_KEY", "development-secret-change-me"),
            http_timeout: env_duration_secs("HTTP_TIMEOUT", 10),
            orchestrator_url: env_or("ORCHESTRATOR_URL", "http://localhost:8000"),
            http_module_url: env_or("HTTP_MODULE_URL", "http://localhost:8001"),
            tcp_module_url: env_or("TCP_MODULE_URL", "http://localhost:8002"),
            dns_module_url: env_or("DNS_MODULE_URL", "http://localhost:8003"),
            proxy_service_url: env_or("PROXY_SERVICE_URL", "http://localhost:8010"),
        }
    }
}

pub const ORCHESTRATOR_PORT: u16 = 8000;
pub const HTTP_WORKER_PORT: u16 = 8001;
pub const TCP_WORKER_PORT: u16 = 8002;
pub const DNS_WORKER_PORT: u16 = 8003;
pub const PROXY_POOL_PORT: u16 = 8010;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        let cfg = Config::from_env();
        assert_eq!(cfg.http_timeout, Duration::from_secs(10));
        assert_eq!(cfg.orchestrator_url, "http://localhost:8000");
    }
}
