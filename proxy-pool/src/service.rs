use std::sync::Arc;

use common::types::ProxyType;
use futures::future::join_all;

use crate::sources::{SOURCES, fetch_source};
use crate::store::ProxyStore;
use crate::validate::validate_proxy;

/// Downloads every configured source concurrently and merges the results
/// into the store; never blocks a caller's read path (callers `spawn` this).
pub async fn refresh_all(store: Arc<ProxyStore>, client: reqwest::Client) {
    tracing::info!("refreshing proxies from all sources");
    let fetches = SOURCES.iter().map(|s| fetch_source(&client, s));
    let results = join_all(fetches).await;
    for (source, fetched) in SOURCES.iter().zip(results) {
        let n = fetched.len();
        store.insert_fetched(source.proxy_type, fetched);
        tracing::debug!(url = source.url, count = n, "source fetch complete");
    }
    store.mark_refreshed();
    let (http, socks4, socks5) = store.counts();
    tracing::info!(http, socks4, socks5, "proxy refresh complete");
}

/// Validates up to `count` proxies per requested type concurrently.
pub async fn validate_all(store: Arc<ProxyStore>, proxy_type: Option<ProxyType>, count: usize) {
    let candidates = store.candidates_for_validation(proxy_type, count);
    tracing::info!(count = candidates.len(), "validating proxies");
    let validated = join_all(candidates.iter().map(validate_proxy)).await;
    store.apply_validation(validated);
}
