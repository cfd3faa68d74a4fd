//! Configuration file watcher for hot reload.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

use crate::config::loader::load_config;
use crate::config::schema::ProxyConfig;
use crate::settings::{ReloadableSettings, SettingsSnapshot};

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<ProxyConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ProxyConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file. Dropping the returned watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Config file change detected, reloading");
                        match load_config(&path) {
                            Ok(new_config) => {
                                let _ = tx.send(new_config);
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
                            }
                        }
                    }
                }
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Sections whose changes only take effect after a restart.
pub fn restart_required_sections(old: &ProxyConfig, new: &ProxyConfig) -> Vec<&'static str> {
    let mut changed = Vec::new();
    if old.listener != new.listener {
        changed.push("listener");
    }
    let (mut old_up, mut new_up) = (old.upstream.clone(), new.upstream.clone());
    old_up.chains.clear();
    old_up.api_key.clear();
    new_up.chains.clear();
    new_up.api_key.clear();
    if old_up != new_up {
        changed.push("upstream");
    }
    if old.cache != new.cache {
        changed.push("cache");
    }
    if old.rate_limit != new.rate_limit {
        changed.push("rate_limit");
    }
    if old.observability != new.observability {
        changed.push("observability");
    }
    if old.admin != new.admin {
        changed.push("admin");
    }
    changed
}

/// Apply reloaded configs to the live settings until shutdown.
pub fn spawn_reload_consumer(
    mut updates: mpsc::UnboundedReceiver<ProxyConfig>,
    settings: Arc<ReloadableSettings>,
    initial: ProxyConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut current = initial;
        loop {
            tokio::select! {
                update = updates.recv() => {
                    let Some(new_config) = update else { break };
                    settings.update(SettingsSnapshot::from(&new_config.upstream));
                    for section in restart_required_sections(&current, &new_config) {
                        tracing::warn!(section, "Config section changed; restart to apply");
                    }
                    current = new_config;
                }
                _ = shutdown.recv() => break,
            }
        }
        tracing::debug!("Config reload consumer stopped");
    })
}
