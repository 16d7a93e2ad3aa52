//! The static method catalog: `name -> {protocol, description, parameter hints}`.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::types::ProtocolType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodInfo {
    pub protocol: ProtocolType,
    pub description: &'static str,
    pub parameters: HashMap<&'static str, &'static str>,
}

fn params(pairs: &[(&'static str, &'static str)]) -> HashMap<&'static str, &'static str> {
    pairs.iter().copied().collect()
}

pub static METHOD_CATALOG: Lazy<HashMap<&'static str, MethodInfo>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert(
        "HTTP_FLOOD",
        MethodInfo {
            protocol: ProtocolType::Http,
            description: "Repeated HTTP GET requests with randomized headers",
            parameters: params(&[("rpc", "requests per outer iteration, default 1")]),
        },
    );
    m.insert(
        "HTTP_BYPASS",
        MethodInfo {
            protocol: ProtocolType::Http,
            description: "HTTP GET requests cycling header-sets to evade basic filtering",
            parameters: params(&[]),
        },
    );
    m.insert(
        "SSL_FLOOD",
        MethodInfo {
            protocol: ProtocolType::Http,
            description: "Repeated TLS handshakes against an HTTPS target",
            parameters: params(&[]),
        },
    );
    m.insert(
        "SLOW_LORIS",
        MethodInfo {
            protocol: ProtocolType::Http,
            description: "Hold many partial HTTP requests open, trickling headers",
            parameters: params(&[("sockets", "sockets per worker unit, default 150")]),
        },
    );
    m.insert(
        "TCP_FLOOD",
        MethodInfo {
            protocol: ProtocolType::Tcp,
            description: "Open TCP connections and send a fixed-size random payload",
            parameters: params(&[]),
        },
    );
    m.insert(
        "TCP_CONNECTION",
        MethodInfo {
            protocol: ProtocolType::Tcp,
            description: "Hold many simultaneous TCP connections with periodic keepalives",
            parameters: params(&[("connections", "connections per worker, default 100")]),
        },
    );
    m.insert(
        "UDP_FLOOD",
        MethodInfo {
            protocol: ProtocolType::Udp,
            description: "Send fixed-size random UDP datagrams",
            parameters: params(&[]),
        },
    );
    m.insert(
        "SYN_FLOOD",
        MethodInfo {
            protocol: ProtocolType::Tcp,
            description: "Raw SYN packets with spoofed source address/port (requires privilege)",
            parameters: params(&[]),
        },
    );
    m.insert(
        "DNS_FLOOD",
        MethodInfo {
            protocol: ProtocolType::Dns,
            description: "Randomized DNS queries against a resolver",
            parameters: params(&[("query_type", "DNS record type, default A")]),
        },
    );
    m.insert(
        "ICMP_FLOOD",
        MethodInfo {
            protocol: ProtocolType::Icmp,
            description: "Declared for completeness; no ICMP fleet currently dispatches it",
            parameters: params(&[]),
        },
    );
    m
});

/// HTTP fleet handles `Http`; `Tcp`/`Udp` share the TCP fleet; `Dns` has its
/// own fleet. `Icmp` resolves to no fleet (see `ApiError::Validation`).
pub fn fleet_for(protocol: ProtocolType) -> Option<&'static str> {
    match protocol {
        ProtocolType::Http => Some("http"),
        ProtocolType::Tcp | ProtocolType::Udp => Some("tcp"),
        ProtocolType::Dns => Some("dns"),
        ProtocolType::Icmp => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_covers_every_documented_method() {
        for name in [
            "HTTP_FLOOD",
            "HTTP_BYPASS",
            "SSL_FLOOD",
            "SLOW_LORIS",
            "TCP_FLOOD",
            "TCP_CONNECTION",
            "UDP_FLOOD",
            "SYN_FLOOD",
            "DNS_FLOOD",
            "ICMP_FLOOD",
        ] {
            assert!(METHOD_CATALOG.contains_key(name), "missing {name}");
        }
    }

    #[test]
    fn icmp_has_no_fleet() {
        assert_eq!(fleet_for(ProtocolType::Icmp), None);
        assert_eq!(fleet_for(ProtocolType::Http), Some("http"));
    }
}
