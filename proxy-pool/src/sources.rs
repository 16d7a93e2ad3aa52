use common::types::{Proxy, ProxyType};
use once_cell::sync::Lazy;
use regex::Regex;

pub struct Source {
    pub url: &'static str,
    pub proxy_type: ProxyType,
}

/// Public proxy-list URLs, three per protocol, carried verbatim from the
/// prototype's source list.
pub static SOURCES: &[Source] = &[
    Source {
        url: "https://raw.githubusercontent.com/TheSpeedX/PROXY-List/master/http.txt",
        proxy_type: ProxyType::Http,
    },
    Source {
        url: "https://api.proxyscrape.com/v2/?request=getproxies&protocol=http",
        proxy_type: ProxyType::Http,
    },
    Source {
        url: "https://www.proxy-list.download/api/v1/get?type=http",
        proxy_type: ProxyType::Http,
    },
    Source {
        url: "https://raw.githubusercontent.com/TheSpeedX/PROXY-List/master/socks4.txt",
        proxy_type: ProxyType::Socks4,
    },
    Source {
        url: "https://api.proxyscrape.com/v2/?request=getproxies&protocol=socks4",
        proxy_type: ProxyType::Socks4,
    },
    Source {
        url: "https://www.proxy-list.download/api/v1/get?type=socks4",
        proxy_type: ProxyType::Socks4,
    },
    Source {
        url: "https://raw.githubusercontent.com/TheSpeedX/PROXY-List/master/socks5.txt",
        proxy_type: ProxyType::Socks5,
    },
    Source {
        url: "https://api.proxyscrape.com/v2/?request=getproxies&protocol=socks5",
        proxy_type: ProxyType::Socks5,
    },
    Source {
        url: "https://www.proxy-list.download/api/v1/get?type=socks5",
        proxy_type: ProxyType::Socks5,
    },
];

static IP_PORT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}):(\d+)").unwrap());

/// Extracts every `a.b.c.d:port` pair with a port in `(0, 65535]` from raw
/// source text.
pub fn extract_proxies(body: &str, proxy_type: ProxyType) -> Vec<Proxy> {
    IP_PORT_REGEX
        .captures_iter(body)
        .filter_map(|c| {
            let host = c.get(1)?.as_str().to_string();
            let port: u32 = c.get(2)?.as_str().parse().ok()?;
            if port == 0 || port > 65535 {
                return None;
            }
            Some(Proxy {
                host,
                port: port as u16,
                proxy_type,
                username: None,
                password: None,
                last_checked: None,
                is_valid: None,
                response_time: None,
            })
        })
        .collect()
}

/// Downloads one source with a 10s timeout and extracts its proxy list;
/// any failure (network, non-200) yields an empty list rather than an error
/// so one bad source never aborts a refresh.
pub async fn fetch_source(client: &reqwest::Client, source: &Source) -> Vec<Proxy> {
    match client
        .get(source.url)
        .timeout(std::time::Duration::from_secs(10))
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => match resp.text().await {
            Ok(body) => extract_proxies(&body, source.proxy_type),
            Err(_) => Vec::new(),
        },
        Ok(resp) => {
            tracing::warn!(url = source.url, status = %resp.status(), "proxy source fetch failed");
            Vec::new()
        }
        Err(e) => {
            tracing::warn!(url = source.url, error = %e, "proxy source fetch errored");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_valid_ip_port_pairs_only() {
        let body = "1.2.3.4:8080 junk 10.0.0.1:0 256.1.1.1:80 9.9.9.9:65535";
        let found = extract_proxies(body, ProxyType::Http);
        let pairs: Vec<(String, u16)> = found.into_iter().map(|p| (p.host, p.port)).collect();
        assert!(pairs.contains(&("1.2.3.4".to_string(), 8080)));
        assert!(pairs.contains(&("9.9.9.9".to_string(), 65535)));
        assert!(!pairs.iter().any(|(_, port)| *port == 0));
    }
}
