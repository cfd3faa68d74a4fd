//! Admin API, mounted under `/admin` when `admin.enabled` is set.
//!
//! Every route requires `Authorization: Bearer <admin.api_key>`.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{delete, get},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/cache", get(get_cache).delete(flush_cache))
        .route("/cache/{key}", delete(delete_cache_key))
        .route("/rate-limit", get(get_rate_limit))
        .route("/rate-limit/{identity}", get(get_rate_limit_bucket))
        .layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
