use std::time::{Duration, Instant};

use common::time::now_secs;
use common::types::Proxy;

const VALIDATE_TARGET: &str = "http://httpbin.org/ip";

/// Validates one proxy by issuing a GET through it to a known echo endpoint.
/// HTTP and SOCKS4/SOCKS5 proxies are both driven through `reqwest`'s proxy
/// support (the `socks` feature), rather than hand-rolling a second,
/// raw-socket SOCKS client alongside the one already used for live traffic.
pub async fn validate_proxy(proxy: &Proxy) -> Proxy {
    let mut updated = proxy.clone();
    updated.last_checked = Some(now_secs());

    let client = match reqwest::Client::builder()
        .proxy(reqwest::Proxy::all(proxy.as_url()).unwrap_or_else(|_| {
            // unreachable in practice: as_url() always produces a valid scheme
            reqwest::Proxy::all("http://127.0.0.1:1").unwrap()
        }))
        .timeout(Duration::from_secs(10))
        .build()
    {
        Ok(c) => c,
        Err(_) => {
            updated.is_valid = Some(false);
            return updated;
        }
    };

    let start = Instant::now();
    match client.get(VALIDATE_TARGET).send().await {
        Ok(resp) if resp.status().is_success() => {
            updated.is_valid = Some(true);
            updated.response_time = Some(start.elapsed().as_secs_f64());
        }
        _ => {
            updated.is_valid = Some(false);
        }
    }
    updated
}
