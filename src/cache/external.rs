//! Shared external store (redis).

use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use crate::cache::CacheError;

/// A shared key/value store reachable over the network.
///
/// Every call must be bounded in time by the implementation.
pub trait ExternalStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, CacheError>> + Send;

    fn set(
        &self,
        key: &str,
        value: &str,
        ttl_secs: u64,
    ) -> impl Future<Output = Result<(), CacheError>> + Send;

    fn delete(&self, key: &str) -> impl Future<Output = Result<(), CacheError>> + Send;

    /// Remove every entry this deployment owns.
    fn flush_all(&self) -> impl Future<Output = Result<(), CacheError>> + Send;
}

/// Redis-backed store. Keys are namespaced with `key_prefix` so a flush
/// only touches this deployment's entries.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
    timeout_duration: Duration,
    key_prefix: String,
}

impl RedisStore {
    /// Single connect attempt, bounded by `timeout_duration`.
    pub async fn connect(
        url: &str,
        key_prefix: &str,
        timeout_duration: Duration,
    ) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let conn = timeout(timeout_duration, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| CacheError::Timeout {
                op: "connect",
                timeout_ms: timeout_duration.as_millis() as u64,
            })??;

        Ok(Self {
            conn,
            timeout_duration,
            key_prefix: key_prefix.to_string(),
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    async fn bounded<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = redis::RedisResult<T>>,
    ) -> Result<T, CacheError> {
        match timeout(self.timeout_duration, fut).await {
            Ok(result) => result.map_err(CacheError::from),
            Err(_) => Err(CacheError::Timeout {
                op,
                timeout_ms: self.timeout_duration.as_millis() as u64,
            }),
        }
    }

    async fn flush_prefixed(&self) -> redis::RedisResult<()> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", self.key_prefix);
        let mut cursor: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(500)
                .query_async(&mut conn)
                .await?;
            if !keys.is_empty() {
                let _: () = conn.del(keys).await?;
            }
            if next == 0 {
                return Ok(());
            }
            cursor = next;
        }
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("key_prefix", &self.key_prefix)
            .field("timeout", &self.timeout_duration)
            .finish()
    }
}

impl ExternalStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let key = self.key(key);
        self.bounded("get", conn.get::<_, Option<String>>(key)).await
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let key = self.key(key);
        self.bounded("set", conn.set_ex::<_, _, ()>(key, value, ttl_secs.max(1)))
            .await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let key = self.key(key);
        self.bounded("delete", conn.del::<_, ()>(key)).await
    }

    async fn flush_all(&self) -> Result<(), CacheError> {
        self.bounded("flush", self.flush_prefixed()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_failure_is_an_error_not_a_panic() {
        // Nothing listens on port 1.
        let result = RedisStore::connect("redis://127.0.0.1:1", "t:", Duration::from_millis(300)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let result = RedisStore::connect("not-a-redis-url", "t:", Duration::from_millis(100)).await;
        assert!(matches!(result, Err(CacheError::Backend(_))));
    }
}
