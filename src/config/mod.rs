//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, deserialize, UPSTREAM_API_KEY override)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of the upstream settings snapshot
//!     → other sections: logged, applied on restart
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Only the chain list and credential are hot; everything else is wired at startup

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, CacheConfig, ListenerConfig, LogFormat, ObservabilityConfig, ProxyConfig,
    RateLimitConfig, UpstreamConfig,
};
