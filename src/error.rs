use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// State conflicts surfaced immediately and never retried automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Conflict {
    #[error("enrollment is not pending")]
    NotPending,

    #[error("season is archived")]
    SeasonArchived,

    #[error("season is not archived")]
    SeasonNotArchived,

    #[error("student already has an active enrollment for this course")]
    DuplicateActiveEnrollment,

    #[error("course is full")]
    CourseFull,
}

impl Conflict {
    pub fn code(self) -> &'static str {
        match self {
            Conflict::NotPending => "not_pending",
            Conflict::SeasonArchived => "season_archived",
            Conflict::SeasonNotArchived => "season_not_archived",
            Conflict::DuplicateActiveEnrollment => "duplicate_active_enrollment",
            Conflict::CourseFull => "course_full",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Account service error: {0}")]
    Transport(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(Conflict),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Deletion stopped after {deleted} records: {message}")]
    PartialDeletion { deleted: u64, message: String },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<Conflict> for AppError {
    fn from(conflict: Conflict) -> Self {
        AppError::Conflict(conflict)
    }
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    /// Stable machine-readable code, also used in per-item batch reports.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database",
            AppError::Transport(_) => "transport",
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "validation",
            AppError::Conflict(c) => c.code(),
            AppError::Forbidden(_) => "forbidden",
            AppError::PartialDeletion { .. } => "partial_deletion",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn conflict(&self) -> Option<Conflict> {
        match self {
            AppError::Conflict(c) => Some(*c),
            _ => None,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Transport(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_)
            | AppError::PartialDeletion { .. }
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Database(e) => {
                error!("database error: {}", e);
                "Database error occurred".to_string()
            }
            AppError::Internal(msg) => {
                error!("internal error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::PartialDeletion { deleted, message } => {
                error!(deleted, "partial deletion: {}", message);
                self.to_string()
            }
            AppError::Transport(msg) => {
                error!("account service error: {}", msg);
                self.to_string()
            }
            AppError::NotFound(_)
            | AppError::Validation(_)
            | AppError::Conflict(_)
            | AppError::Forbidden(_) => self.to_string(),
        };

        let body = Json(ErrorResponse {
            error: status.to_string(),
            code: self.code(),
            message,
        });

        (status, body).into_response()
    }
}

/// True when the database rejected a write because of a unique index.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}
