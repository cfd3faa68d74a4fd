use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::cache::CacheStats;
use crate::config::schema::RateLimitConfig;
use crate::http::server::AppState;
use crate::security::rate_limit::BucketSnapshot;
use crate::settings::SettingsProvider;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub configured_chains: Vec<u64>,
    pub external_cache_connected: bool,
    pub rate_limit_enabled: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitSummary {
    pub buckets: usize,
    pub refill_per_sec: f64,
    pub config: RateLimitConfig,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: state.started_at.elapsed().as_secs(),
        configured_chains: state.settings.configured_chains(),
        external_cache_connected: state.service.cache().is_external_connected(),
        rate_limit_enabled: state.limiter.is_enabled(),
    })
}

pub async fn get_cache(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.service.cache().stats())
}

pub async fn flush_cache(State(state): State<AppState>) -> StatusCode {
    tracing::info!("Admin cache flush requested");
    state.service.cache().flush_all().await;
    StatusCode::NO_CONTENT
}

pub async fn delete_cache_key(State(state): State<AppState>, Path(key): Path<String>) -> StatusCode {
    tracing::info!(key = %key, "Admin cache delete requested");
    state.service.cache().delete(&key).await;
    StatusCode::NO_CONTENT
}

pub async fn get_rate_limit(State(state): State<AppState>) -> Json<RateLimitSummary> {
    Json(RateLimitSummary {
        buckets: state.limiter.bucket_count(),
        refill_per_sec: state.limiter.refill_rate(),
        config: state.limiter.config().clone(),
    })
}

pub async fn get_rate_limit_bucket(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Result<Json<BucketSnapshot>, StatusCode> {
    state
        .limiter
        .bucket(&identity)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}
