//! Read-through / write-through cache over a local and an external store.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;

use crate::cache::external::{ExternalStore, RedisStore};
use crate::cache::local::LocalStore;
use crate::config::schema::CacheConfig;
use crate::observability::metrics;

#[derive(Debug, Default)]
struct Counters {
    external_hits: AtomicU64,
    local_hits: AtomicU64,
    misses: AtomicU64,
    external_errors: AtomicU64,
}

/// Point-in-time cache statistics for the admin API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub external_connected: bool,
    pub local_entries: usize,
    pub external_hits: u64,
    pub local_hits: u64,
    pub misses: u64,
    pub external_errors: u64,
}

/// Cache shared by every request handler.
///
/// No method returns an error: external-store failures are logged and the
/// call continues against the local store alone.
#[derive(Debug)]
pub struct DualCache<E: ExternalStore = RedisStore> {
    local: LocalStore,
    external: Option<E>,
    counters: Counters,
}

impl<E: ExternalStore> DualCache<E> {
    /// Cache with no external store.
    pub fn local_only() -> Self {
        Self {
            local: LocalStore::new(),
            external: None,
            counters: Counters::default(),
        }
    }

    pub fn with_external(external: E) -> Self {
        Self {
            local: LocalStore::new(),
            external: Some(external),
            counters: Counters::default(),
        }
    }

    pub fn is_external_connected(&self) -> bool {
        self.external.is_some()
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    fn external_failed(&self, op: &'static str, key: &str, error: &crate::cache::CacheError) {
        self.counters.external_errors.fetch_add(1, Ordering::Relaxed);
        metrics::record_cache_external_error(op);
        tracing::warn!(op, key, error = %error, "External cache unavailable for this call");
    }

    /// Raw cached string for `key`, external store first.
    pub async fn get_raw(&self, key: &str) -> Option<String> {
        if let Some(external) = &self.external {
            match external.get(key).await {
                Ok(Some(value)) => {
                    self.counters.external_hits.fetch_add(1, Ordering::Relaxed);
                    metrics::record_cache_lookup("external", true);
                    tracing::debug!(key, "Cache hit (external)");
                    return Some(value);
                }
                Ok(None) => metrics::record_cache_lookup("external", false),
                Err(e) => self.external_failed("get", key, &e),
            }
        }

        match self.local.get(key) {
            Some(value) => {
                self.counters.local_hits.fetch_add(1, Ordering::Relaxed);
                metrics::record_cache_lookup("local", true);
                tracing::debug!(key, "Cache hit (local)");
                Some(value)
            }
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                metrics::record_cache_lookup("local", false);
                tracing::debug!(key, "Cache miss");
                None
            }
        }
    }

    /// Cached value for `key`; an undecodable entry counts as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get_raw(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    pub async fn set_raw(&self, key: &str, value: String, ttl_secs: u64) {
        if let Some(external) = &self.external {
            if let Err(e) = external.set(key, &value, ttl_secs).await {
                self.external_failed("set", key, &e);
            }
        }
        self.local.set(key, value, Duration::from_secs(ttl_secs));
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        match serde_json::to_string(value) {
            Ok(raw) => self.set_raw(key, raw, ttl_secs).await,
            Err(e) => tracing::warn!(key, error = %e, "Value not cacheable, skipping"),
        }
    }

    pub async fn delete(&self, key: &str) {
        self.local.delete(key);
        if let Some(external) = &self.external {
            if let Err(e) = external.delete(key).await {
                self.external_failed("delete", key, &e);
            }
        }
    }

    /// Purge both stores.
    pub async fn flush_all(&self) {
        self.local.clear();
        if let Some(external) = &self.external {
            if let Err(e) = external.flush_all().await {
                self.external_failed("flush", "*", &e);
            }
        }
        tracing::info!("Cache flushed");
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            external_connected: self.is_external_connected(),
            local_entries: self.local.len(),
            external_hits: self.counters.external_hits.load(Ordering::Relaxed),
            local_hits: self.counters.local_hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            external_errors: self.counters.external_errors.load(Ordering::Relaxed),
        }
    }

    /// Periodically drop expired local entries until shutdown.
    pub fn start_sweeper(&self, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        let local = self.local.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = local.purge_expired();
                        if removed > 0 {
                            tracing::debug!(removed, "Swept expired cache entries");
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("Cache sweeper stopping");
                        break;
                    }
                }
            }
        });
    }
}

impl DualCache<RedisStore> {
    /// Build from config, trying the external store once.
    pub async fn connect(config: &CacheConfig) -> Self {
        let Some(url) = config.redis_url.as_deref() else {
            tracing::info!("No external cache configured, using in-process cache only");
            return Self::local_only();
        };

        let timeout = Duration::from_millis(config.external_timeout_ms);
        match RedisStore::connect(url, &config.key_prefix, timeout).await {
            Ok(store) => {
                tracing::info!("External cache connected");
                Self::with_external(store)
            }
            Err(e) => {
                tracing::warn!(error = %e, "External cache unreachable, using in-process cache only");
                Self::local_only()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheError;
    use serde::Deserialize;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// External store that can be healthy or fail every call.
    #[derive(Debug, Default)]
    struct MockStore {
        data: Mutex<HashMap<String, String>>,
        should_fail: bool,
    }

    impl MockStore {
        fn failing() -> Self {
            Self {
                data: Mutex::new(HashMap::new()),
                should_fail: true,
            }
        }

        fn check(&self) -> Result<(), CacheError> {
            if self.should_fail {
                Err(CacheError::Backend("mock store down".into()))
            } else {
                Ok(())
            }
        }
    }

    impl ExternalStore for MockStore {
        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            self.check()?;
            Ok(self.data.lock().unwrap().get(key).cloned())
        }

        async fn set(&self, key: &str, value: &str, _ttl_secs: u64) -> Result<(), CacheError> {
            self.check()?;
            self.data.lock().unwrap().insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<(), CacheError> {
            self.check()?;
            self.data.lock().unwrap().remove(key);
            Ok(())
        }

        async fn flush_all(&self) -> Result<(), CacheError> {
            self.check()?;
            self.data.lock().unwrap().clear();
            Ok(())
        }
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Dto {
        id: u32,
        name: String,
    }

    fn dto() -> Dto {
        Dto {
            id: 7,
            name: "seven".into(),
        }
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = DualCache::with_external(MockStore::default());
        cache.set("k", &dto(), 60).await;
        assert_eq!(cache.get::<Dto>("k").await, Some(dto()));
        assert!(cache.external.as_ref().unwrap().data.lock().unwrap().contains_key("k"));
        assert_eq!(cache.stats().external_hits, 1);
    }

    #[tokio::test]
    async fn test_overwrite_and_delete() {
        let cache = DualCache::with_external(MockStore::default());
        cache.set("k", &1u32, 60).await;
        cache.set("k", &2u32, 60).await;
        assert_eq!(cache.get::<u32>("k").await, Some(2));
        cache.delete("k").await;
        assert_eq!(cache.get::<u32>("k").await, None);
    }

    #[tokio::test]
    async fn test_external_miss_falls_through_to_local() {
        let cache = DualCache::with_external(MockStore::default());
        cache.local().set("k", "\"local\"".into(), Duration::from_secs(60));
        assert_eq!(cache.get::<String>("k").await.as_deref(), Some("local"));
        assert_eq!(cache.stats().local_hits, 1);
    }

    #[tokio::test]
    async fn test_degrades_when_external_fails() {
        let cache = DualCache::with_external(MockStore::failing());

        cache.set("k", &dto(), 60).await;
        assert_eq!(cache.get::<Dto>("k").await, Some(dto()));

        cache.delete("k").await;
        assert_eq!(cache.get::<Dto>("k").await, None);

        cache.set("a", &1u8, 60).await;
        cache.flush_all().await;
        assert_eq!(cache.get::<u8>("a").await, None);

        let stats = cache.stats();
        assert!(stats.external_errors >= 6);
        assert_eq!(stats.external_hits, 0);
    }

    #[tokio::test]
    async fn test_local_only() {
        let cache: DualCache<MockStore> = DualCache::local_only();
        assert!(!cache.is_external_connected());
        cache.set("k", &dto(), 60).await;
        assert_eq!(cache.get::<Dto>("k").await, Some(dto()));
        assert_eq!(cache.get::<Dto>("missing").await, None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss() {
        let cache: DualCache<MockStore> = DualCache::local_only();
        cache.set("k", &"not a dto", 60).await;
        assert_eq!(cache.get::<Dto>("k").await, None);
    }

    #[tokio::test]
    async fn test_flush_clears_both() {
        let cache = DualCache::with_external(MockStore::default());
        cache.set("a", &1u8, 60).await;
        cache.set("b", &2u8, 60).await;
        cache.flush_all().await;
        assert!(cache.local().is_empty());
        assert!(cache.external.as_ref().unwrap().data.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_connect_without_url_is_local_only() {
        let config = CacheConfig {
            redis_url: None,
            ..CacheConfig::default()
        };
        assert!(!DualCache::connect(&config).await.is_external_connected());

        let config = CacheConfig {
            redis_url: Some("redis://127.0.0.1:1".into()),
            external_timeout_ms: 200,
            ..CacheConfig::default()
        };
        assert!(!DualCache::connect(&config).await.is_external_connected());
    }
}
