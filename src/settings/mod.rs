//! Settings the upstream client reads at call time.
//!
//! # Design Decisions
//! - The client only needs two facts: which chains are enabled and the
//!   credential to present upstream
//! - Reads are lock-free snapshots; a config reload swaps the snapshot

use arc_swap::ArcSwap;
use std::sync::Arc;

use crate::config::schema::UpstreamConfig;

/// Read-only settings contract consumed by the upstream client.
pub trait SettingsProvider: Send + Sync {
    /// Chain ids this deployment is configured to serve.
    fn configured_chains(&self) -> Vec<u64>;

    /// Credential sent upstream as `apikey`.
    fn api_credential(&self) -> String;

    fn is_chain_configured(&self, chain_id: u64) -> bool {
        self.configured_chains().contains(&chain_id)
    }
}

/// One consistent view of the settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsSnapshot {
    pub chains: Vec<u64>,
    pub api_key: String,
}

impl From<&UpstreamConfig> for SettingsSnapshot {
    fn from(config: &UpstreamConfig) -> Self {
        Self {
            chains: config.chains.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

/// Fixed settings.
#[derive(Debug, Clone, Default)]
pub struct StaticSettings(SettingsSnapshot);

impl StaticSettings {
    pub fn new(chains: Vec<u64>, api_key: impl Into<String>) -> Self {
        Self(SettingsSnapshot {
            chains,
            api_key: api_key.into(),
        })
    }
}

impl SettingsProvider for StaticSettings {
    fn configured_chains(&self) -> Vec<u64> {
        self.0.chains.clone()
    }

    fn api_credential(&self) -> String {
        self.0.api_key.clone()
    }

    fn is_chain_configured(&self, chain_id: u64) -> bool {
        self.0.chains.contains(&chain_id)
    }
}

/// Settings replaced wholesale on config reload.
#[derive(Debug)]
pub struct ReloadableSettings {
    current: ArcSwap<SettingsSnapshot>,
}

impl ReloadableSettings {
    pub fn new(initial: SettingsSnapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    /// Swap in a new snapshot. Returns true when anything changed.
    pub fn update(&self, next: SettingsSnapshot) -> bool {
        let previous = self.current.swap(Arc::new(next));
        let current = self.current.load();
        let changed = *previous != **current;
        if changed {
            tracing::info!(
                chains = ?current.chains,
                credential_changed = previous.api_key != current.api_key,
                "Upstream settings reloaded"
            );
        }
        changed
    }

    pub fn snapshot(&self) -> Arc<SettingsSnapshot> {
        self.current.load_full()
    }
}

impl SettingsProvider for ReloadableSettings {
    fn configured_chains(&self) -> Vec<u64> {
        self.current.load().chains.clone()
    }

    fn api_credential(&self) -> String {
        self.current.load().api_key.clone()
    }

    fn is_chain_configured(&self, chain_id: u64) -> bool {
        self.current.load().chains.contains(&chain_id)
    }
}
