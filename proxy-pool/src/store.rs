use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use common::types::{Proxy, ProxyType};
use prometheus_client::metrics::counter::Counter;

pub const REFRESH_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Default)]
pub struct Stats {
    pub proxies_fetched: Counter,
    pub proxies_validated: Counter,
    pub valid_proxies: Counter,
    pub invalid_proxies: Counter,
}

type Key = (String, u16);

/// The service's full proxy state: one identity-keyed map per type, plus
/// the acquisition/validation counters and the refresh clock consumers read
/// to decide whether a background refresh is due.
pub struct ProxyStore {
    sets: RwLock<HashMap<ProxyType, HashMap<Key, Proxy>>>,
    pub stats: Stats,
    last_refresh: RwLock<Option<Instant>>,
}

impl ProxyStore {
    pub fn new() -> Self {
        let mut sets = HashMap::new();
        sets.insert(ProxyType::Http, HashMap::new());
        sets.insert(ProxyType::Socks4, HashMap::new());
        sets.insert(ProxyType::Socks5, HashMap::new());
        Self {
            sets: RwLock::new(sets),
            stats: Stats::default(),
            last_refresh: RwLock::new(None),
        }
    }

    /// Mirrors `set.update()` semantics: a proxy already known by identity
    /// keeps its existing record (and validation status) rather than being
    /// overwritten by a freshly-fetched, unvalidated duplicate.
    pub fn insert_fetched(&self, proxy_type: ProxyType, fetched: Vec<Proxy>) {
        let mut sets = self.sets.write().unwrap();
        let set = sets.entry(proxy_type).or_default();
        let mut added = 0u64;
        for proxy in fetched {
            let key = (proxy.host.clone(), proxy.port);
            if let std::collections::hash_map::Entry::Vacant(e) = set.entry(key) {
                e.insert(proxy);
                added += 1;
            }
        }
        if added > 0 {
            self.stats.proxies_fetched.inc_by(added);
        }
    }

    pub fn mark_refreshed(&self) {
        *self.last_refresh.write().unwrap() = Some(Instant::now());
    }

    pub fn needs_refresh(&self) -> bool {
        match *self.last_refresh.read().unwrap() {
            None => true,
            Some(t) => t.elapsed() > REFRESH_INTERVAL,
        }
    }

    pub fn last_refresh_epoch(&self) -> Option<f64> {
        self.last_refresh.read().unwrap().map(|t| {
            let age = t.elapsed().as_secs_f64();
            common::time::now_secs() - age
        })
    }

    /// Snapshot for `GET /proxies`: every proxy of the requested type(s),
    /// filtered by `is_valid` when `valid_only`, truncated to `count`.
    pub fn select(&self, proxy_type: Option<ProxyType>, valid_only: bool, count: usize) -> Vec<Proxy> {
        let sets = self.sets.read().unwrap();
        let mut result = Vec::new();
        let types: Vec<ProxyType> = match proxy_type {
            Some(t) => vec![t],
            None => vec![ProxyType::Http, ProxyType::Socks4, ProxyType::Socks5],
        };
        for t in types {
            if let Some(set) = sets.get(&t) {
                result.extend(
                    set.values()
                        .filter(|p| !valid_only || p.is_valid == Some(true))
                        .cloned(),
                );
            }
        }
        result.truncate(count);
        result
    }

    /// Candidates for a validation pass: up to `count` proxies per
    /// requested type, any validity status.
    pub fn candidates_for_validation(&self, proxy_type: Option<ProxyType>, count: usize) -> Vec<Proxy> {
        let sets = self.sets.read().unwrap();
        let types: Vec<ProxyType> = match proxy_type {
            Some(t) => vec![t],
            None => vec![ProxyType::Http, ProxyType::Socks4, ProxyType::Socks5],
        };
        let mut result = Vec::new();
        for t in types {
            if let Some(set) = sets.get(&t) {
                result.extend(set.values().take(count).cloned());
            }
        }
        result
    }

    /// Replaces the validated proxies' records; invalid ones are dropped
    /// from the served set.
    pub fn apply_validation(&self, validated: Vec<Proxy>) {
        let mut sets = self.sets.write().unwrap();
        let mut valid = 0u64;
        let mut invalid = 0u64;
        for proxy in validated {
            let set = sets.entry(proxy.proxy_type).or_default();
            let key = (proxy.host.clone(), proxy.port);
            set.remove(&key);
            if proxy.is_valid == Some(true) {
                valid += 1;
                set.insert(key, proxy);
            } else {
                invalid += 1;
            }
        }
        self.stats.proxies_validated.inc_by(valid + invalid);
        self.stats.valid_proxies.inc_by(valid);
        self.stats.invalid_proxies.inc_by(invalid);
    }

    pub fn counts(&self) -> (usize, usize, usize) {
        let sets = self.sets.read().unwrap();
        (
            sets.get(&ProxyType::Http).map(|s| s.len()).unwrap_or(0),
            sets.get(&ProxyType::Socks4).map(|s| s.len()).unwrap_or(0),
            sets.get(&ProxyType::Socks5).map(|s| s.len()).unwrap_or(0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proxy(host: &str, port: u16, proxy_type: ProxyType) -> Proxy {
        Proxy {
            host: host.to_string(),
            port,
            proxy_type,
            username: None,
            password: None,
            last_checked: None,
            is_valid: None,
            response_time: None,
        }
    }

    #[test]
    fn insert_fetched_keeps_existing_validation_status() {
        let store = ProxyStore::new();
        let mut validated = proxy("1.1.1.1", 80, ProxyType::Http);
        validated.is_valid = Some(true);
        store.insert_fetched(ProxyType::Http, vec![validated]);

        // a re-fetch of the same identity must not clobber is_valid
        store.insert_fetched(ProxyType::Http, vec![proxy("1.1.1.1", 80, ProxyType::Http)]);

        let selected = store.select(Some(ProxyType::Http), true, 100);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].is_valid, Some(true));
    }

    #[test]
    fn valid_only_filters_unvalidated_and_invalid() {
        let store = ProxyStore::new();
        let mut valid = proxy("2.2.2.2", 80, ProxyType::Http);
        valid.is_valid = Some(true);
        store.insert_fetched(ProxyType::Http, vec![valid, proxy("3.3.3.3", 80, ProxyType::Http)]);

        assert_eq!(store.select(Some(ProxyType::Http), true, 100).len(), 1);
        assert_eq!(store.select(Some(ProxyType::Http), false, 100).len(), 2);
    }

    #[test]
    fn apply_validation_drops_invalid_proxies() {
        let store = ProxyStore::new();
        store.insert_fetched(ProxyType::Http, vec![proxy("4.4.4.4", 80, ProxyType::Http)]);

        let mut invalid = proxy("4.4.4.4", 80, ProxyType::Http);
        invalid.is_valid = Some(false);
        store.apply_validation(vec![invalid]);

        assert_eq!(store.select(Some(ProxyType::Http), false, 100).len(), 0);
    }
}
