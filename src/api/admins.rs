use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;

use crate::error::AppError;
use crate::models::{Admin, InviteAdminRequest, InviteAdminResponse, Principal};
use crate::state::AppState;

use super::{Gated, confirmed};

#[derive(Deserialize)]
pub(super) struct RemoveAdminRequest {
    #[serde(default)]
    confirm: String,
}

pub(super) async fn list(
    State(state): State<AppState>,
    _principal: Principal,
) -> Result<Json<Vec<Admin>>, AppError> {
    let admins = state.admins().list().await?;
    Ok(Json(admins))
}

pub(super) async fn invite(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<InviteAdminRequest>,
) -> Result<(StatusCode, Json<InviteAdminResponse>), AppError> {
    let response = state.admins().invite(req, &principal).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub(super) async fn remove(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    Json(req): Json<RemoveAdminRequest>,
) -> Result<Json<Gated<Admin>>, AppError> {
    if !confirmed(&req.confirm) {
        return Ok(Json(Gated::declined()));
    }
    let removed = state.admins().remove(&id, &principal).await?;
    Ok(Json(Gated::done(removed)))
}
