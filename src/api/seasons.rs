use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use crate::error::AppError;
use crate::models::{NewSeasonRequest, Principal, Season, SeasonStats, SetActiveRequest};
use crate::services::season::{PurgePreview, PurgeReport};
use crate::state::AppState;

use super::{Gated, confirmed};

#[derive(Deserialize)]
pub(super) struct SeasonQueryParams {
    #[serde(default)]
    include_archived: bool,
}

#[derive(Deserialize)]
pub(super) struct PurgeRequest {
    #[serde(default)]
    confirm: String,
}

pub(super) async fn list(
    State(state): State<AppState>,
    _principal: Principal,
    Query(params): Query<SeasonQueryParams>,
) -> Result<Json<Vec<Season>>, AppError> {
    let seasons = state.seasons().list(params.include_archived).await?;
    Ok(Json(seasons))
}

pub(super) async fn create(
    State(state): State<AppState>,
    _principal: Principal,
    Json(req): Json<NewSeasonRequest>,
) -> Result<(StatusCode, Json<Season>), AppError> {
    let season = state.seasons().create(req).await?;
    Ok((StatusCode::CREATED, Json(season)))
}

pub(super) async fn set_active(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<String>,
    Json(req): Json<SetActiveRequest>,
) -> Result<Json<Season>, AppError> {
    let season = state.seasons().set_active(&id, req.active).await?;
    Ok(Json(season))
}

pub(super) async fn archive(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<Season>, AppError> {
    let season = state.seasons().archive(&id, &principal).await?;
    Ok(Json(season))
}

pub(super) async fn stats(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<SeasonStats>, AppError> {
    let stats = state.seasons().stats(&id).await?;
    Ok(Json(stats))
}

pub(super) async fn purge_preview(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<PurgePreview>, AppError> {
    let preview = state.seasons().purge_preview(&id).await?;
    Ok(Json(preview))
}

pub(super) async fn purge(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    Json(req): Json<PurgeRequest>,
) -> Result<Json<Gated<PurgeReport>>, AppError> {
    if !confirmed(&req.confirm) {
        return Ok(Json(Gated::declined()));
    }
    let report = state.seasons().purge_data(&id, &principal).await?;
    Ok(Json(Gated::done(report)))
}
