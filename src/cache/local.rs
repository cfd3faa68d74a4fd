//! In-process TTL store.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::observability::metrics;

#[derive(Debug, Clone)]
struct LocalEntry {
    value: String,
    expires_at: Instant,
}

impl LocalEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// A thread-safe key/value store with per-entry expiry.
///
/// Sharded map: operations on distinct keys do not contend, and a reader
/// sees either the old or the new value of a key, never a torn one.
#[derive(Debug, Clone, Default)]
pub struct LocalStore {
    inner: Arc<DashMap<String, LocalEntry>>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live value for `key`. Expired entries are dropped on the way out.
    pub fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        match self.inner.get(key) {
            Some(entry) if entry.is_live(now) => return Some(entry.value.clone()),
            Some(_) => {}
            None => return None,
        }
        // The read guard is released above; removing under it would deadlock.
        self.inner.remove_if(key, |_, entry| !entry.is_live(now));
        None
    }

    pub fn set(&self, key: &str, value: String, ttl: Duration) {
        self.inner.insert(
            key.to_string(),
            LocalEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    pub fn delete(&self, key: &str) {
        self.inner.remove(key);
    }

    pub fn clear(&self) {
        self.inner.clear();
        metrics::record_local_cache_size(0);
    }

    /// Entries currently held, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, entry| entry.is_live(now));
        let after = self.inner.len();
        metrics::record_local_cache_size(after);
        before.saturating_sub(after)
    }
}
