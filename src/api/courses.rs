use axum::Json;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::error::AppError;
use crate::models::{Course, NewCourseRequest, Principal, UpdateCourseRequest};
use crate::services::import::{ImportPreview, ImportResult, Row, normalize_rows};
use crate::spreadsheet;
use crate::state::AppState;

#[derive(Deserialize)]
pub(super) struct ImportRowsRequest {
    rows: Vec<Row>,
}

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

pub(super) async fn list(
    State(state): State<AppState>,
    _principal: Principal,
    Path(season_id): Path<String>,
) -> Result<Json<Vec<Course>>, AppError> {
    let courses = state.courses().list_courses(&season_id).await?;
    Ok(Json(courses))
}

pub(super) async fn create(
    State(state): State<AppState>,
    principal: Principal,
    Path(season_id): Path<String>,
    Json(req): Json<NewCourseRequest>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    let course = state.courses().create_course(&season_id, req, &principal).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

pub(super) async fn get(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<Course>, AppError> {
    let course = state.courses().get_course(&id).await?;
    Ok(Json(course))
}

pub(super) async fn update(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    Json(req): Json<UpdateCourseRequest>,
) -> Result<Json<Course>, AppError> {
    let course = state.courses().update_course(&id, req, &principal).await?;
    Ok(Json(course))
}

pub(super) async fn preview_rows(
    _principal: Principal,
    Json(req): Json<ImportRowsRequest>,
) -> Json<ImportPreview> {
    Json(normalize_rows(&req.rows))
}

pub(super) async fn import_rows(
    State(state): State<AppState>,
    principal: Principal,
    Path(season_id): Path<String>,
    Json(req): Json<ImportRowsRequest>,
) -> Json<ImportResult> {
    let result = state
        .imports()
        .import_rows(&season_id, &req.rows, &principal)
        .await;
    Json(result)
}

pub(super) async fn import_csv(
    State(state): State<AppState>,
    principal: Principal,
    Path(season_id): Path<String>,
    body: String,
) -> Result<Json<ImportResult>, AppError> {
    let rows = spreadsheet::parse_csv(&body)?;
    let result = state
        .imports()
        .import_rows(&season_id, &rows, &principal)
        .await;
    Ok(Json(result))
}

pub(super) async fn export_csv(
    State(state): State<AppState>,
    _principal: Principal,
    Path(season_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let courses = state.courses().list_courses(&season_id).await?;
    let body = spreadsheet::export_rows(
        &spreadsheet::COURSE_COLUMNS,
        &spreadsheet::course_rows(&courses),
    )?;

    Ok((
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"courses.csv\""),
        ],
        body,
    ))
}

pub(super) async fn template(_principal: Principal) -> Result<impl IntoResponse, AppError> {
    let body = spreadsheet::template()?;
    Ok((
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"course_template.csv\""),
        ],
        body,
    ))
}
