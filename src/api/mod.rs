mod admins;
mod attendance;
mod courses;
mod enrollments;
mod maintenance;
mod seasons;

use axum::extract::{FromRequestParts, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::routing::{delete, get, patch, post};
use axum::Router;
use serde::Serialize;
use tracing::error;

use crate::error::AppError;
use crate::models::Principal;
use crate::state::AppState;

pub const ADMIN_HEADER: &str = "x-admin-id";

/// Phrase the caller must echo back before a destructive operation runs.
pub const CONFIRM_PHRASE: &str = "permanently delete";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/seasons", get(seasons::list).post(seasons::create))
        .route("/seasons/{id}/active", patch(seasons::set_active))
        .route("/seasons/{id}/stats", get(seasons::stats))
        .route("/seasons/{id}/archive", post(seasons::archive))
        .route("/seasons/{id}/purge-preview", get(seasons::purge_preview))
        .route("/seasons/{id}/purge", post(seasons::purge))
        .route("/seasons/{id}/courses", get(courses::list).post(courses::create))
        .route("/seasons/{id}/courses/import", post(courses::import_rows))
        .route("/seasons/{id}/courses/import/preview", post(courses::preview_rows))
        .route("/seasons/{id}/courses/import/csv", post(courses::import_csv))
        .route("/seasons/{id}/courses/export", get(courses::export_csv))
        .route("/courses/template", get(courses::template))
        .route("/courses/{id}", get(courses::get).patch(courses::update))
        .route("/courses/{id}/roster", get(enrollments::roster))
        .route(
            "/courses/{id}/attendance",
            get(attendance::for_date).put(attendance::bulk_set),
        )
        .route("/courses/{id}/attendance/stats", get(attendance::stats))
        .route("/enrollments", post(enrollments::submit))
        .route("/enrollments/pending", get(enrollments::pending))
        .route("/enrollments/pending/stream", get(enrollments::pending_stream))
        .route("/enrollments/batch-approve", post(enrollments::batch_approve))
        .route("/enrollments/{id}/approve", post(enrollments::approve))
        .route("/enrollments/{id}/reject", post(enrollments::reject))
        .route("/enrollments/{id}/cancel", post(enrollments::cancel))
        .route("/admins", get(admins::list).post(admins::invite))
        .route("/admins/{id}", delete(admins::remove))
        .route("/maintenance/counts", get(maintenance::counts))
        .route("/maintenance/reset", post(maintenance::reset))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("select 1").execute(&state.db).await {
        Ok(_) => StatusCode::OK,
        Err(err) => {
            error!("health check failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let admin_id = parts
            .headers
            .get(ADMIN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Forbidden(format!("missing {ADMIN_HEADER} header")))?;

        state.admins().principal(admin_id).await
    }
}

/// Outcome of a confirmation-gated operation. A wrong phrase is not an
/// error; nothing runs and `performed` is false.
#[derive(Debug, Serialize)]
pub struct Gated<T> {
    pub performed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Gated<T> {
    fn done(result: T) -> Self {
        Self {
            performed: true,
            result: Some(result),
            message: None,
        }
    }

    fn declined() -> Self {
        Self {
            performed: false,
            result: None,
            message: Some(format!("type \"{CONFIRM_PHRASE}\" to confirm")),
        }
    }
}

fn confirmed(confirm: &str) -> bool {
    confirm.trim() == CONFIRM_PHRASE
}
