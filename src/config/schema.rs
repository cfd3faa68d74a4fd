//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the data proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, request timeout).
    pub listener: ListenerConfig,

    /// Upstream explorer API settings.
    pub upstream: UpstreamConfig,

    /// Cache backends and per-operation TTLs.
    pub cache: CacheConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Total time a request may take, upstream calls included.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Upstream explorer API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the multi-chain explorer API.
    pub base_url: String,

    /// API credential. `UPSTREAM_API_KEY` overrides this at load time.
    pub api_key: String,

    /// Chain ids this deployment serves.
    pub chains: Vec<u64>,

    /// Per-call timeout in seconds.
    pub timeout_secs: u64,

    /// Action tried first for token holders.
    pub holders_primary_action: String,

    /// Action tried when the primary one is not offered.
    pub holders_fallback_action: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.etherscan.io/v2/api".to_string(),
            api_key: String::new(),
            chains: vec![1],
            timeout_secs: 10,
            holders_primary_action: "topholders".to_string(),
            holders_fallback_action: "tokenholderlist".to_string(),
        }
    }
}

/// Cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Shared store URL. Absent means in-process cache only.
    pub redis_url: Option<String>,

    /// Prefix for every key written to the shared store.
    pub key_prefix: String,

    /// Bound on each shared-store call, connect included.
    pub external_timeout_ms: u64,

    /// How often expired in-process entries are swept.
    pub local_sweep_interval_secs: u64,

    pub transfers_ttl_secs: u64,
    pub holders_ttl_secs: u64,
    pub transaction_ttl_secs: u64,

    /// TTL for transactions not yet mined.
    pub pending_transaction_ttl_secs: u64,

    pub token_info_ttl_secs: u64,

    /// Remember "feature unavailable" answers instead of asking again.
    pub cache_feature_unavailable: bool,

    pub feature_unavailable_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            key_prefix: "cdp:".to_string(),
            external_timeout_ms: 250,
            local_sweep_interval_secs: 60,
            transfers_ttl_secs: 30,
            holders_ttl_secs: 300,
            transaction_ttl_secs: 60,
            pending_transaction_ttl_secs: 5,
            token_info_ttl_secs: 3600,
            cache_feature_unavailable: false,
            feature_unavailable_ttl_secs: 600,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Bucket capacity; also the number of tokens refilled per window.
    pub max_tokens: u32,

    /// Refill window in seconds.
    pub window_secs: u64,

    /// Buckets untouched for this long are dropped by the sweep.
    pub idle_threshold_secs: u64,

    pub sweep_interval_secs: u64,

    /// Upper bound on tracked client identities.
    pub max_buckets: usize,

    /// Admit new identities once `max_buckets` is reached.
    pub fail_open: bool,

    /// Use the first `X-Forwarded-For` hop as the client identity.
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_tokens: 60,
            window_secs: 60,
            idle_threshold_secs: 3600,
            sweep_interval_secs: 300,
            max_buckets: 100_000,
            fail_open: true,
            trust_forwarded_for: false,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount the admin API under `/admin`.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: ProxyConfig = toml::from_str("").unwrap();
        assert_eq!(config, ProxyConfig::default());
        assert_eq!(config.upstream.holders_primary_action, "topholders");
        assert_eq!(config.rate_limit.max_tokens, 60);
        assert!(!config.cache.cache_feature_unavailable);
    }

    #[test]
    fn test_partial_sections() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [upstream]
            chains = [1, 8453, 42161]

            [cache]
            redis_url = "redis://127.0.0.1:6379"
            holders_ttl_secs = 120

            [observability]
            log_format = "pretty"
            "#,
        )
        .unwrap();

        assert_eq!(config.upstream.chains, vec![1, 8453, 42161]);
        assert_eq!(config.upstream.timeout_secs, 10);
        assert_eq!(config.cache.redis_url.as_deref(), Some("redis://127.0.0.1:6379"));
        assert_eq!(config.cache.holders_ttl_secs, 120);
        assert_eq!(config.cache.transfers_ttl_secs, 30);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        let result: Result<ProxyConfig, _> = toml::from_str("[observability]\nlog_format = \"xml\"");
        assert!(result.is_err());
    }
}
