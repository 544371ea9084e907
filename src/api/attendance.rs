use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{AttendanceRecord, AttendanceStats, BulkSetAttendanceRequest, Principal};
use crate::state::AppState;

#[derive(Deserialize)]
pub(super) struct DateQuery {
    date: NaiveDate,
}

#[derive(Serialize)]
pub(super) struct BulkSetResponse {
    saved: usize,
}

pub(super) async fn for_date(
    State(state): State<AppState>,
    _principal: Principal,
    Path(course_id): Path<String>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Vec<AttendanceRecord>>, AppError> {
    let records = state.attendance().get_for_date(&course_id, query.date).await?;
    Ok(Json(records))
}

pub(super) async fn bulk_set(
    State(state): State<AppState>,
    principal: Principal,
    Path(course_id): Path<String>,
    Json(req): Json<BulkSetAttendanceRequest>,
) -> Result<Json<BulkSetResponse>, AppError> {
    let saved = state
        .attendance()
        .bulk_set(&course_id, req.date, req.entries, &principal)
        .await?;
    Ok(Json(BulkSetResponse { saved }))
}

pub(super) async fn stats(
    State(state): State<AppState>,
    _principal: Principal,
    Path(course_id): Path<String>,
) -> Result<Json<AttendanceStats>, AppError> {
    let stats = state.attendance().stats(&course_id).await?;
    Ok(Json(stats))
}
