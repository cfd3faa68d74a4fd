//! Data route handlers.

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::Serialize;

use crate::chains::ChainMeta;
use crate::http::request::{HoldersParams, TransfersParams};
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::settings::SettingsProvider;
use crate::upstream::types::{
    NormalizedHolder, NormalizedTokenInfo, NormalizedTransaction, NormalizedTransfer,
};

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub external_cache: bool,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        external_cache: state.service.cache().is_external_connected(),
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainEntry {
    #[serde(flatten)]
    pub meta: &'static ChainMeta,
    pub configured: bool,
}

pub async fn chains(State(state): State<AppState>) -> Json<Vec<ChainEntry>> {
    let configured = state.settings.configured_chains();
    Json(
        state
            .service
            .client()
            .registry()
            .all()
            .iter()
            .map(|meta| ChainEntry {
                meta,
                configured: meta.supported && configured.contains(&meta.id),
            })
            .collect(),
    )
}

pub async fn transfers(
    State(state): State<AppState>,
    path: Result<Path<u64>, PathRejection>,
    params: Result<Query<TransfersParams>, QueryRejection>,
) -> ApiResult<Vec<NormalizedTransfer>> {
    let Path(chain_id) = path?;
    let Query(params) = params?;
    let query = params.into_query()?;
    Ok(Json(state.service.token_transfers(chain_id, &query).await?))
}

pub async fn holders(
    State(state): State<AppState>,
    path: Result<Path<(u64, String)>, PathRejection>,
    params: Result<Query<HoldersParams>, QueryRejection>,
) -> ApiResult<Vec<NormalizedHolder>> {
    let Path((chain_id, contract)) = path?;
    let Query(params) = params?;
    Ok(Json(
        state
            .service
            .top_holders(chain_id, &contract, params.limit)
            .await?,
    ))
}

pub async fn token_info(
    State(state): State<AppState>,
    path: Result<Path<(u64, String)>, PathRejection>,
) -> ApiResult<NormalizedTokenInfo> {
    let Path((chain_id, contract)) = path?;
    Ok(Json(state.service.token_info(chain_id, &contract).await?))
}

pub async fn transaction(
    State(state): State<AppState>,
    path: Result<Path<(u64, String)>, PathRejection>,
) -> ApiResult<NormalizedTransaction> {
    let Path((chain_id, hash)) = path?;
    Ok(Json(state.service.transaction_details(chain_id, &hash).await?))
}
