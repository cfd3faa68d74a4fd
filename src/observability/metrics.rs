//! Metrics collection and exposition.
//!
//! # Metrics
//! - `upstream_requests_total` (counter): upstream calls by operation, chain, status
//! - `cache_lookups_total` (counter): cache lookups by backend and result
//! - `cache_external_errors_total` (counter): swallowed external-store failures
//! - `rate_limited_total` (counter): rejected requests
//! - `rate_limit_buckets` (gauge): tracked client identities
//! - `local_cache_entries` (gauge): entries in the in-process store

use std::net::SocketAddr;

use crate::upstream::error::Endpoint;

/// Outcome label of a single upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    /// The upstream answered with this HTTP status.
    Http(u16),
    /// No response (timeout, refused, DNS).
    Network,
}

impl CallStatus {
    pub fn label(&self) -> String {
        match self {
            CallStatus::Http(code) => code.to_string(),
            CallStatus::Network => "network_error".to_string(),
        }
    }
}

/// Hook invoked after every upstream call, successful or not.
pub trait UpstreamObserver: Send + Sync {
    fn on_upstream_call(&self, endpoint: &Endpoint, chain_id: u64, status: CallStatus);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl UpstreamObserver for NoopObserver {
    fn on_upstream_call(&self, _endpoint: &Endpoint, _chain_id: u64, _status: CallStatus) {}
}

/// Observer that feeds the `metrics` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObserver;

impl UpstreamObserver for MetricsObserver {
    fn on_upstream_call(&self, endpoint: &Endpoint, chain_id: u64, status: CallStatus) {
        metrics::counter!(
            "upstream_requests_total",
            "operation" => endpoint.action.clone(),
            "chain" => chain_id.to_string(),
            "status" => status.label(),
        )
        .increment(1);
    }
}

/// Start the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
    {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_cache_lookup(backend: &'static str, hit: bool) {
    metrics::counter!(
        "cache_lookups_total",
        "backend" => backend,
        "result" => if hit { "hit" } else { "miss" },
    )
    .increment(1);
}

pub fn record_cache_external_error(op: &'static str) {
    metrics::counter!("cache_external_errors_total", "op" => op).increment(1);
}

pub fn record_local_cache_size(size: usize) {
    metrics::gauge!("local_cache_entries").set(size as f64);
}

pub fn record_rate_limited(reason: &'static str) {
    metrics::counter!("rate_limited_total", "reason" => reason).increment(1);
}

pub fn record_bucket_count(count: usize) {
    metrics::gauge!("rate_limit_buckets").set(count as f64);
}
