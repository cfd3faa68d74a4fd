//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that configured chains exist in the registry and are supported
//! - Validate value ranges (timeouts > 0, addresses parse, TTLs sensible)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::chains::ChainRegistry;
use crate::config::schema::ProxyConfig;

/// One semantic problem in a config document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Check every semantic rule and report all violations.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::new("listener.request_timeout_secs", "must be > 0"));
    }

    validate_upstream(config, &mut errors);
    validate_cache(config, &mut errors);

    let rl = &config.rate_limit;
    if rl.enabled {
        if rl.max_tokens == 0 {
            errors.push(ValidationError::new("rate_limit.max_tokens", "must be > 0"));
        }
        if rl.window_secs == 0 {
            errors.push(ValidationError::new("rate_limit.window_secs", "must be > 0"));
        }
        if rl.sweep_interval_secs == 0 {
            errors.push(ValidationError::new("rate_limit.sweep_interval_secs", "must be > 0"));
        }
        if rl.max_buckets == 0 {
            errors.push(ValidationError::new("rate_limit.max_buckets", "must be > 0"));
        }
    }

    let obs = &config.observability;
    if !matches!(
        obs.log_level.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", obs.log_level),
        ));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", obs.metrics_address),
        ));
    }

    if config.admin.enabled && config.admin.api_key.trim().is_empty() {
        errors.push(ValidationError::new("admin.api_key", "required when admin is enabled"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_upstream(config: &ProxyConfig, errors: &mut Vec<ValidationError>) {
    let upstream = &config.upstream;

    match url::Url::parse(&upstream.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => errors.push(ValidationError::new(
            "upstream.base_url",
            format!("'{}' is not an http(s) URL", upstream.base_url),
        )),
    }
    if upstream.timeout_secs == 0 {
        errors.push(ValidationError::new("upstream.timeout_secs", "must be > 0"));
    }
    if upstream.chains.is_empty() {
        errors.push(ValidationError::new("upstream.chains", "at least one chain is required"));
    }

    let registry = ChainRegistry::new();
    for chain_id in &upstream.chains {
        match registry.get(*chain_id) {
            None => errors.push(ValidationError::new(
                "upstream.chains",
                format!("unknown chain id {chain_id}"),
            )),
            Some(meta) if !meta.supported => errors.push(ValidationError::new(
                "upstream.chains",
                format!("chain {chain_id} ({}) is not supported", meta.key),
            )),
            Some(_) => {}
        }
    }

    for (field, action) in [
        ("upstream.holders_primary_action", &upstream.holders_primary_action),
        ("upstream.holders_fallback_action", &upstream.holders_fallback_action),
    ] {
        if action.trim().is_empty() {
            errors.push(ValidationError::new(field, "must not be empty"));
        }
    }
}

fn validate_cache(config: &ProxyConfig, errors: &mut Vec<ValidationError>) {
    let cache = &config.cache;

    if let Some(url) = &cache.redis_url {
        if redis::Client::open(url.as_str()).is_err() {
            errors.push(ValidationError::new(
                "cache.redis_url",
                format!("'{url}' is not a redis URL"),
            ));
        }
    }
    if cache.external_timeout_ms == 0 {
        errors.push(ValidationError::new("cache.external_timeout_ms", "must be > 0"));
    }
    if cache.local_sweep_interval_secs == 0 {
        errors.push(ValidationError::new("cache.local_sweep_interval_secs", "must be > 0"));
    }
    for (field, ttl) in [
        ("cache.transfers_ttl_secs", cache.transfers_ttl_secs),
        ("cache.holders_ttl_secs", cache.holders_ttl_secs),
        ("cache.transaction_ttl_secs", cache.transaction_ttl_secs),
        ("cache.pending_transaction_ttl_secs", cache.pending_transaction_ttl_secs),
        ("cache.token_info_ttl_secs", cache.token_info_ttl_secs),
        ("cache.feature_unavailable_ttl_secs", cache.feature_unavailable_ttl_secs),
    ] {
        if ttl == 0 {
            errors.push(ValidationError::new(field, "must be > 0"));
        }
    }
    if cache.pending_transaction_ttl_secs > cache.transaction_ttl_secs {
        errors.push(ValidationError::new(
            "cache.pending_transaction_ttl_secs",
            "must not exceed cache.transaction_ttl_secs",
        ));
    }
}
