//! Per-protocol target normalization and validation, applied by the
//! orchestrator at `CreateTest` time (spec boundary cases, §8).

fn has_valid_port_suffix(target: &str) -> bool {
    target
        .rsplit_once(':')
        .map(|(_, p)| p.parse::<u16>().is_ok())
        .unwrap_or(false)
}

/// HTTP targets without a scheme are auto-prefixed `http://`.
pub fn normalize_http_target(target: &str) -> Result<String, String> {
    if target.trim().is_empty() {
        return Err("target must not be empty".to_string());
    }
    if target.contains("://") {
        Ok(target.to_string())
    } else {
        Ok(format!("http://{target}"))
    }
}

/// TCP/UDP targets must include an explicit `:port`; there is no default.
pub fn normalize_tcp_target(target: &str) -> Result<String, String> {
    if target.trim().is_empty() {
        return Err("target must not be empty".to_string());
    }
    if has_valid_port_suffix(target) {
        Ok(target.to_string())
    } else {
        Err(format!("TCP/UDP target must include :port, got {target:?}"))
    }
}

/// DNS targets without a port default to `:53`.
pub fn normalize_dns_target(target: &str) -> Result<String, String> {
    if target.trim().is_empty() {
        return Err("target must not be empty".to_string());
    }
    if has_valid_port_suffix(target) {
        Ok(target.to_string())
    } else {
        Ok(format!("{target}:53"))
    }
}

/// Splits a `host:port` target. Used by raw-socket workers (TCP/UDP/DNS)
/// once the orchestrator has already validated the `:port` suffix exists.
pub fn split_host_port(target: &str) -> Option<(String, u16)> {
    let (host, port) = target.rsplit_once(':')?;
    let port: u16 = port.parse().ok()?;
    Some((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_target_gets_scheme_prefixed() {
        assert_eq!(
            normalize_http_target("example.test/").unwrap(),
            "http://example.test/"
        );
        assert_eq!(
            normalize_http_target("https://example.test/").unwrap(),
            "https://example.test/"
        );
    }

    #[test]
    fn tcp_target_requires_port() {
        assert!(normalize_tcp_target("example.test").is_err());
        assert_eq!(
            normalize_tcp_target("example.test:80").unwrap(),
            "example.test:80"
        );
    }

    #[test]
    fn dns_target_defaults_port_53() {
        assert_eq!(
            normalize_dns_target("198.51.100.1").unwrap(),
            "198.51.100.1:53"
        );
        assert_eq!(
            normalize_dns_target("198.51.100.1:5353").unwrap(),
            "198.51.100.1:5353"
        );
    }

    #[test]
    fn split_host_port_rejects_missing_port() {
        assert_eq!(
            split_host_port("198.51.100.1:53"),
            Some(("198.51.100.1".to_string(), 53))
        );
        assert_eq!(split_host_port("198.51.100.1"), None);
    }
}
