//! Response cache subsystem.
//!
//! # Data Flow
//! ```text
//! get(key):
//!     external connected? → external.rs (bounded read)
//!         hit → return
//!         miss / error → local.rs
//!     local.rs hit → return, else miss
//!
//! set(key, value, ttl):
//!     local.rs (always)
//!     external.rs (if connected; failure logged and swallowed)
//! ```
//!
//! # Design Decisions
//! - Cache faults never reach the request path
//! - One connect attempt at startup; no reconnect loop
//! - The two stores keep independent TTL clocks

pub mod dual;
pub mod external;
pub mod local;

use thiserror::Error;

pub use dual::{CacheStats, DualCache};
pub use external::{ExternalStore, RedisStore};
pub use local::LocalStore;

/// Errors from a cache backend. Logged, never propagated to callers.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("external store error: {0}")]
    Backend(String),

    #[error("external store call '{op}' timed out after {timeout_ms}ms")]
    Timeout { op: &'static str, timeout_ms: u64 },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        CacheError::Backend(e.to_string())
    }
}
