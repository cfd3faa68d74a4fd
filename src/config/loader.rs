//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable that overrides `upstream.api_key`.
pub const API_KEY_ENV: &str = "UPSTREAM_API_KEY";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content, std::env::var(API_KEY_ENV).ok())
}

/// Parse, apply the credential override, then validate.
pub fn parse_config(content: &str, api_key_override: Option<String>) -> Result<ProxyConfig, ConfigError> {
    let mut config: ProxyConfig = toml::from_str(content)?;

    if let Some(key) = api_key_override.filter(|k| !k.trim().is_empty()) {
        config.upstream.api_key = key;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
