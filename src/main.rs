//! Multi-chain blockchain data proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌────────────────────────────────────────────────────┐
//!                     │                  CHAIN DATA PROXY                  │
//!                     │                                                    │
//!   Client Request    │  ┌─────────┐   ┌────────────┐   ┌──────────────┐  │
//!   ──────────────────┼─▶│  http   │──▶│ rate limit │──▶│   service    │  │
//!                     │  │ server  │   │  (bucket)  │   │ (read-thru)  │  │
//!                     │  └─────────┘   └────────────┘   └──┬────────┬──┘  │
//!                     │                                    │        │     │
//!                     │                          ┌─────────▼─┐  ┌───▼───────────┐
//!                     │                          │   cache   │  │   upstream    │──▶ Explorer API
//!                     │                          │local+redis│  │ client/resolver│
//!                     │                          └───────────┘  └───────────────┘
//!                     │                                                    │
//!                     │  config · settings · observability · lifecycle     │
//!                     └────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use chain_data_proxy::cache::DualCache;
use chain_data_proxy::config::loader::{self, API_KEY_ENV};
use chain_data_proxy::config::watcher::{spawn_reload_consumer, ConfigWatcher};
use chain_data_proxy::http::{AppState, HttpServer};
use chain_data_proxy::lifecycle::{signals, Shutdown};
use chain_data_proxy::observability::{self, metrics::MetricsObserver};
use chain_data_proxy::security::RateLimiter;
use chain_data_proxy::service::DataService;
use chain_data_proxy::settings::{ReloadableSettings, SettingsProvider, SettingsSnapshot};
use chain_data_proxy::upstream::{EndpointResolver, HttpTransport, UpstreamClient};

#[derive(Parser)]
#[command(name = "chain-data-proxy", version, about = "Multi-chain blockchain data proxy")]
struct Args {
    /// Path to the TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => loader::load_config(path)?,
        None => loader::parse_config("", std::env::var(API_KEY_ENV).ok())?,
    };

    observability::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "chain-data-proxy starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        chains = ?config.upstream.chains,
        external_cache = config.cache.redis_url.is_some(),
        rate_limit = config.rate_limit.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => observability::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();

    let settings = Arc::new(ReloadableSettings::new(SettingsSnapshot::from(&config.upstream)));
    let settings_dyn: Arc<dyn SettingsProvider> = settings.clone();

    let cache = Arc::new(DualCache::connect(&config.cache).await);
    cache.start_sweeper(
        Duration::from_secs(config.cache.local_sweep_interval_secs),
        shutdown.subscribe(),
    );

    let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
    if limiter.is_enabled() {
        limiter.start_sweeper(shutdown.subscribe());
    }

    let transport = HttpTransport::new(
        &config.upstream.base_url,
        Duration::from_secs(config.upstream.timeout_secs),
    )?;
    let mut client = UpstreamClient::new(
        transport,
        settings_dyn.clone(),
        EndpointResolver::new(
            config.upstream.holders_primary_action.clone(),
            config.upstream.holders_fallback_action.clone(),
        ),
    );
    if config.observability.metrics_enabled {
        client = client.with_observer(Arc::new(MetricsObserver));
    }

    let service = Arc::new(DataService::new(Arc::new(client), cache, config.cache.clone()));

    // Dropping the watcher stops it, so it lives until main returns.
    let _watcher = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            spawn_reload_consumer(updates, settings.clone(), config.clone(), shutdown.subscribe());
            match watcher.run() {
                Ok(w) => Some(w),
                Err(e) => {
                    tracing::warn!(error = %e, "Config hot reload disabled");
                    None
                }
            }
        }
        None => None,
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let state = AppState::new(service, limiter, settings_dyn, Arc::new(config));

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        signals::shutdown_on_signal(&signal_shutdown).await;
    });

    HttpServer::new(state).run(listener, shutdown.wait()).await?;

    shutdown.trigger();
    tracing::info!("Shutdown complete");
    Ok(())
}
