use axum::Json;
use axum::extract::State;
use serde::Deserialize;

use crate::db::Collection;
use crate::error::AppError;
use crate::models::Principal;
use crate::services::DeletionSummary;
use crate::services::maintenance::CollectionCounts;
use crate::state::AppState;

use super::{Gated, confirmed};

#[derive(Deserialize)]
pub(super) struct ResetRequest {
    /// Absent resets every data collection.
    #[serde(default)]
    collection: Option<Collection>,
    #[serde(default)]
    confirm: String,
}

pub(super) async fn counts(
    State(state): State<AppState>,
    _principal: Principal,
) -> Result<Json<CollectionCounts>, AppError> {
    let counts = state.maintenance().counts().await?;
    Ok(Json(counts))
}

pub(super) async fn reset(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<ResetRequest>,
) -> Result<Json<Gated<DeletionSummary>>, AppError> {
    if !confirmed(&req.confirm) {
        return Ok(Json(Gated::declined()));
    }
    let summary = state.maintenance().reset(req.collection, &principal).await?;
    Ok(Json(Gated::done(summary)))
}
