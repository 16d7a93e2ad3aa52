use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A process-wide map from id to `Arc<T>`, single-writer-per-key but with
/// concurrent readers — the re-expression of the platform's scattered
/// `tests`/`test_results`/`test_stop_events` maps as one synchronized type.
pub struct Registry<T> {
    inner: RwLock<HashMap<String, Arc<T>>>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: String, value: Arc<T>) {
        self.inner
            .write()
            .expect("registry lock poisoned")
            .insert(id, value);
    }

    pub fn get(&self, id: &str) -> Option<Arc<T>> {
        self.inner.read().expect("registry lock poisoned").get(id).cloned()
    }

    pub fn remove(&self, id: &str) -> Option<Arc<T>> {
        self.inner.write().expect("registry lock poisoned").remove(id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn values(&self) -> Vec<Arc<T>> {
        self.inner
            .read()
            .expect("registry lock poisoned")
            .values()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_remove_round_trips() {
        let reg: Registry<u32> = Registry::new();
        reg.insert("a".into(), Arc::new(1));
        assert_eq!(*reg.get("a").unwrap(), 1);
        assert_eq!(reg.len(), 1);
        assert_eq!(*reg.remove("a").unwrap(), 1);
        assert!(reg.get("a").is_none());
    }
}
