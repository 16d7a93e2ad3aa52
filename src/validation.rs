//! `CreateTest` input validation: method existence, duration/thread bounds,
//! per-protocol target normalization, and proxy-type range checking.

use common::error::ApiError;
use common::methods::METHOD_CATALOG;
use common::target::{normalize_dns_target, normalize_http_target, normalize_tcp_target};
use common::types::{ProtocolType, ProxyType, TestRequest};

pub const MAX_DURATION: u32 = 300;
pub const MAX_THREADS: u32 = 1000;

/// What the caller asked for in `proxy_type`: nothing, "all types", or one
/// specific type. Distinct from `Option<ProxyType>` because `0` ("all
/// types") is a real, distinguishable request, not the field's absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyRequest {
    None,
    All,
    Specific(ProxyType),
}

pub fn validate_proxy_type(raw: Option<u8>) -> Result<ProxyRequest, ApiError> {
    match raw {
        None => Ok(ProxyRequest::None),
        Some(0) => Ok(ProxyRequest::All),
        Some(v) => ProxyType::try_from(v)
            .map(ProxyRequest::Specific)
            .map_err(ApiError::Validation),
    }
}

pub struct ValidatedRequest {
    pub target: String,
    pub protocol: ProtocolType,
    pub proxy_request: ProxyRequest,
}

pub fn validate_create(req: &TestRequest) -> Result<ValidatedRequest, ApiError> {
    if req.duration < 1 || req.duration > MAX_DURATION {
        return Err(ApiError::Validation(format!(
            "duration must be between 1 and {MAX_DURATION}, got {}",
            req.duration
        )));
    }
    if req.threads < 1 || req.threads > MAX_THREADS {
        return Err(ApiError::Validation(format!(
            "threads must be between 1 and {MAX_THREADS}, got {}",
            req.threads
        )));
    }

    let method_info = METHOD_CATALOG
        .get(req.method.as_str())
        .ok_or_else(|| ApiError::Validation(format!("unknown method: {}", req.method)))?;

    let target = match method_info.protocol {
        ProtocolType::Http => normalize_http_target(&req.target),
        ProtocolType::Tcp | ProtocolType::Udp => normalize_tcp_target(&req.target),
        ProtocolType::Dns => normalize_dns_target(&req.target),
        ProtocolType::Icmp => {
            return Err(ApiError::Validation(
                "ICMP_FLOOD is declared but has no dispatchable fleet".to_string(),
            ));
        }
    }
    .map_err(ApiError::Validation)?;

    let proxy_request = validate_proxy_type(req.proxy_type)?;

    Ok(ValidatedRequest {
        target,
        protocol: method_info.protocol,
        proxy_request,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn req(method: &str, duration: u32, threads: u32, target: &str) -> TestRequest {
        TestRequest {
            target: target.to_string(),
            method: method.to_string(),
            duration,
            threads,
            proxy_type: None,
            parameters: Some(HashMap::new()),
        }
    }

    #[test]
    fn boundary_duration_and_threads_accepted() {
        assert!(validate_create(&req("HTTP_FLOOD", 300, 1000, "example.test")).is_ok());
    }

    #[test]
    fn over_boundary_rejected() {
        assert!(validate_create(&req("HTTP_FLOOD", 301, 1, "example.test")).is_err());
        assert!(validate_create(&req("HTTP_FLOOD", 1, 1001, "example.test")).is_err());
    }

    #[test]
    fn unknown_method_rejected() {
        assert!(validate_create(&req("BOGUS_FLOOD", 1, 1, "example.test")).is_err());
    }

    #[test]
    fn icmp_rejected_for_dispatch() {
        assert!(validate_create(&req("ICMP_FLOOD", 1, 1, "example.test")).is_err());
    }

    #[test]
    fn tcp_target_without_port_rejected() {
        assert!(validate_create(&req("TCP_FLOOD", 1, 1, "example.test")).is_err());
        assert!(validate_create(&req("TCP_FLOOD", 1, 1, "example.test:80")).is_ok());
    }

    #[test]
    fn dns_target_gets_default_port() {
        let v = validate_create(&req("DNS_FLOOD", 1, 1, "198.51.100.1")).unwrap();
        assert_eq!(v.target, "198.51.100.1:53");
    }

    #[test]
    fn proxy_type_2_or_3_rejected() {
        assert!(validate_proxy_type(Some(2)).is_err());
        assert!(validate_proxy_type(Some(3)).is_err());
        assert_eq!(validate_proxy_type(Some(0)).unwrap(), ProxyRequest::All);
        assert_eq!(validate_proxy_type(None).unwrap(), ProxyRequest::None);
    }
}
