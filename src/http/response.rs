//! Error to HTTP response mapping.
//!
//! # Responsibilities
//! - Map each error kind to a status code and JSON body
//! - Keep feature-unavailable observably different from upstream failure
//!
//! # Design Decisions
//! - Validation → 400, upstream → 502 (not found → 404)
//! - Feature unavailable is a soft 200 with `available: false`

use axum::{
    extract::rejection::{PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::upstream::error::{ProxyError, UpstreamFailure};

/// Route-layer wrapper so handlers can `?` on service results.
#[derive(Debug)]
pub struct ApiError(pub ProxyError);

impl From<ProxyError> for ApiError {
    fn from(err: ProxyError) -> Self {
        Self(err)
    }
}

// Malformed path segments and query strings get the same JSON body as
// every other validation failure.
impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(ProxyError::validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(ProxyError::validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self.0 {
            ProxyError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "validation", "message": message})),
            )
                .into_response(),
            ProxyError::Upstream {
                endpoint,
                chain_id,
                failure,
            } => {
                let status = match failure {
                    UpstreamFailure::NotFound => StatusCode::NOT_FOUND,
                    _ => StatusCode::BAD_GATEWAY,
                };
                tracing::warn!(
                    endpoint = %endpoint,
                    chain_id,
                    error = %failure,
                    "Upstream request failed"
                );
                (
                    status,
                    Json(json!({
                        "error": "upstream",
                        "message": failure.to_string(),
                        "endpoint": endpoint.to_string(),
                        "chainId": chain_id,
                    })),
                )
                    .into_response()
            }
            ProxyError::FeatureUnavailable {
                endpoint,
                chain_id,
                reason,
            } => {
                tracing::info!(endpoint = %endpoint, chain_id, reason = %reason, "Feature unavailable");
                (
                    StatusCode::OK,
                    Json(json!({
                        "available": false,
                        "reason": reason,
                        "endpoint": endpoint.to_string(),
                        "chainId": chain_id,
                    })),
                )
                    .into_response()
            }
        }
    }
}
