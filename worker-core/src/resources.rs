//! The process-wide "every socket/session/pool a worker creates" set from
//! the platform's shutdown sweep requirement, expressed as handles whose
//! lifetime tracks the resource rather than a weak-referenced set: a worker
//! unit registers a close callback when it opens a long-lived socket and
//! gets back a `ResourceHandle` that deregisters on drop. `close_all` is
//! the force-close step `begin_shutdown` runs before giving units their
//! own grace period to unwind.

use std::collections::HashMap;
use std::os::unix::io::{FromRawFd, RawFd};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

struct Inner {
    next_id: AtomicU64,
    entries: Mutex<HashMap<u64, Box<dyn Fn() + Send + Sync>>>,
}

impl Inner {
    fn remove(&self, id: u64) {
        self.entries.lock().expect("resource registry lock poisoned").remove(&id);
    }
}

/// Returned by `ResourceRegistry::register`; holding it keeps the resource
/// reachable for a shutdown sweep, dropping it (normal socket teardown)
/// deregisters the close callback.
pub struct ResourceHandle {
    id: u64,
    inner: Arc<Inner>,
}

impl Drop for ResourceHandle {
    fn drop(&mut self) {
        self.inner.remove(self.id);
    }
}

#[derive(Clone)]
pub struct ResourceRegistry {
    inner: Arc<Inner>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                next_id: AtomicU64::new(0),
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Registers an arbitrary close callback (used directly by tests);
    /// production callers go through `register_socket`.
    pub fn register(&self, close: impl Fn() + Send + Sync + 'static) -> ResourceHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .entries
            .lock()
            .expect("resource registry lock poisoned")
            .insert(id, Box::new(close));
        ResourceHandle {
            id,
            inner: self.inner.clone(),
        }
    }

    /// Registers a socket by raw fd: shuts it down both ways without
    /// taking ownership, so the socket itself stays live in the caller's
    /// own collection. Safe because the fd is only ever read back, never
    /// closed, by the registry: `shutdown` on a duplicated wrapper (via
    /// `from_raw_fd` + `mem::forget`) leaves the original owner's `close()`
    /// on drop as the sole point that actually releases the fd.
    pub fn register_socket(&self, fd: RawFd) -> ResourceHandle {
        self.register(move || {
            let sock = unsafe { socket2::Socket::from_raw_fd(fd) };
            let _ = sock.shutdown(std::net::Shutdown::Both);
            std::mem::forget(sock);
        })
    }

    /// Force-closes every still-registered resource. Called by
    /// `begin_shutdown` so long-lived sockets don't wait on their owning
    /// loop's own wake cadence to notice the process is going down.
    pub fn close_all(&self) {
        let entries = self.inner.entries.lock().expect("resource registry lock poisoned");
        for close in entries.values() {
            close();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.entries.lock().expect("resource registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn close_all_invokes_every_registered_callback() {
        let registry = ResourceRegistry::new();
        let closed_a = Arc::new(AtomicBool::new(false));
        let closed_b = Arc::new(AtomicBool::new(false));
        let (a, b) = (closed_a.clone(), closed_b.clone());
        let _h1 = registry.register(move || a.store(true, Ordering::SeqCst));
        let _h2 = registry.register(move || b.store(true, Ordering::SeqCst));

        registry.close_all();

        assert!(closed_a.load(Ordering::SeqCst));
        assert!(closed_b.load(Ordering::SeqCst));
    }

    #[test]
    fn dropping_a_handle_deregisters_it() {
        let registry = ResourceRegistry::new();
        let handle = registry.register(|| {});
        assert_eq!(registry.len(), 1);
        drop(handle);
        assert_eq!(registry.len(), 0);
    }
}
