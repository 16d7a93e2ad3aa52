use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Status state machine: `Queued -> Running -> {Completed, Failed, Stopped}`.
/// The terminal states are absorbing; `Running` is the only state from which
/// `Stopped` is reachable by user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Stopped,
}

impl TestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TestStatus::Completed | TestStatus::Failed | TestStatus::Stopped
        )
    }
}

/// The `/health` status space. Only `Healthy` and `ShuttingDown` are ever
/// produced; `Degraded` is kept for wire-compatibility with the gateway
/// contract but no worker currently emits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    ShuttingDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProtocolType {
    Http,
    Tcp,
    Udp,
    Dns,
    Icmp,
}

/// Proxy type, wire-encoded as the integers the original system used:
/// `1=HTTP, 4=SOCKS4, 5=SOCKS5`. `0` is not a member of this enum — it means
/// "all types" and is modeled as `Option<ProxyType>` being `None` at the API
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ProxyType {
    Http = 1,
    Socks4 = 4,
    Socks5 = 5,
}

impl TryFrom<u8> for ProxyType {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(ProxyType::Http),
            4 => Ok(ProxyType::Socks4),
            5 => Ok(ProxyType::Socks5),
            other => Err(format!("invalid proxy type {other}")),
        }
    }
}

impl From<ProxyType> for u8 {
    fn from(t: ProxyType) -> u8 {
        t as u8
    }
}

impl ProxyType {
    pub fn from_u8(v: u8) -> Result<Option<ProxyType>, String> {
        if v == 0 {
            return Ok(None);
        }
        ProxyType::try_from(v).map(Some)
    }

    pub fn scheme(self) -> &'static str {
        match self {
            ProxyType::Http => "http",
            ProxyType::Socks4 => "socks4",
            ProxyType::Socks5 => "socks5",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proxy {
    pub host: String,
    pub port: u16,
    #[serde(rename = "type")]
    pub proxy_type: ProxyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_valid: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<f64>,
}

impl Proxy {
    /// Identity is `(host, port, type)`; every other field is metadata.
    pub fn identity(&self) -> (String, u16, ProxyType) {
        (self.host.clone(), self.port, self.proxy_type)
    }

    /// Strips pool-bookkeeping fields (`last_checked`, `is_valid`,
    /// `response_time`) before a proxy is forwarded to a worker fleet, which
    /// only ever needs enough to dial and authenticate through it.
    pub fn for_forwarding(&self) -> Proxy {
        Proxy {
            host: self.host.clone(),
            port: self.port,
            proxy_type: self.proxy_type,
            username: self.username.clone(),
            password: self.password.clone(),
            last_checked: None,
            is_valid: None,
            response_time: None,
        }
    }

    pub fn as_url(&self) -> String {
        let auth = match (&self.username, &self.password) {
            (Some(u), Some(p)) => format!("{u}:{p}@"),
            (Some(u), None) => format!("{u}@"),
            _ => String::new(),
        };
        format!(
            "{}://{auth}{}:{}",
            self.proxy_type.scheme(),
            self.host,
            self.port
        )
    }
}

/// The request a caller sends to the orchestrator's `CreateTest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRequest {
    pub target: String,
    pub method: String,
    pub duration: u32,
    pub threads: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_type: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<HashMap<String, String>>,
}

/// What `GetTest`/`ListTests`/`CreateTest`/`StopTest` return to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResponse {
    pub id: String,
    pub user: String,
    pub target: String,
    pub method: String,
    pub duration: u32,
    pub threads: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_type: Option<u8>,
    pub status: TestStatus,
    pub created_at: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_test_id: Option<String>,
}

/// What the orchestrator POSTs to a worker fleet's `/execute`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestParameters {
    pub target: String,
    pub method: String,
    pub duration: u32,
    pub threads: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxies: Option<Vec<Proxy>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub test_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopResponse {
    pub test_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerStatusResponse {
    pub test_id: String,
    pub status: TestStatus,
    pub start_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_metrics: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub active_tests: usize,
}
