use std::convert::Infallible;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::{Stream, StreamExt};
use tracing::warn;

use crate::error::AppError;
use crate::models::{
    BatchApproveRequest, BatchReport, Enrollment, Principal, RejectEnrollmentRequest,
    SubmitEnrollmentRequest,
};
use crate::state::AppState;

pub(super) async fn submit(
    State(state): State<AppState>,
    _principal: Principal,
    Json(req): Json<SubmitEnrollmentRequest>,
) -> Result<(StatusCode, Json<Enrollment>), AppError> {
    let enrollment = state
        .enrollments()
        .submit(&req.student_id, &req.course_id)
        .await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

pub(super) async fn approve(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<Enrollment>, AppError> {
    let enrollment = state.enrollments().approve(&id, &principal).await?;
    Ok(Json(enrollment))
}

pub(super) async fn reject(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    Json(req): Json<RejectEnrollmentRequest>,
) -> Result<Json<Enrollment>, AppError> {
    let enrollment = state
        .enrollments()
        .reject(&id, &principal, &req.reason)
        .await?;
    Ok(Json(enrollment))
}

pub(super) async fn cancel(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<Enrollment>, AppError> {
    let enrollment = state.enrollments().cancel(&id).await?;
    Ok(Json(enrollment))
}

pub(super) async fn batch_approve(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<BatchApproveRequest>,
) -> Json<BatchReport> {
    Json(
        state
            .enrollments()
            .batch_approve(&req.enrollment_ids, &principal)
            .await,
    )
}

pub(super) async fn pending(
    State(state): State<AppState>,
    _principal: Principal,
) -> Result<Json<Vec<Enrollment>>, AppError> {
    let pending = state.enrollments().list_pending().await?;
    Ok(Json(pending))
}

/// Every event carries the whole pending set.
pub(super) async fn pending_stream(
    State(state): State<AppState>,
    _principal: Principal,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let subscription = state.enrollments().subscribe_pending().await?;

    let events = subscription.into_stream().filter_map(|snapshot| {
        match Event::default().event("pending").json_data(snapshot.as_ref()) {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                warn!("failed to encode pending snapshot: {}", e);
                None
            }
        }
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

pub(super) async fn roster(
    State(state): State<AppState>,
    _principal: Principal,
    Path(course_id): Path<String>,
) -> Result<Json<Vec<Enrollment>>, AppError> {
    let roster = state.enrollments().roster(&course_id).await?;
    Ok(Json(roster))
}
