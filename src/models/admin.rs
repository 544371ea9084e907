use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Superadmin,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Admin {
    pub id: String,
    pub login_id: String,
    pub display_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// The administrator on whose behalf a request runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub admin_id: String,
    pub role: Role,
}

impl Principal {
    pub fn new(admin_id: impl Into<String>, role: Role) -> Self {
        Self {
            admin_id: admin_id.into(),
            role,
        }
    }

    pub fn require_superadmin(&self) -> Result<(), AppError> {
        match self.role {
            Role::Superadmin => Ok(()),
            Role::Admin => Err(AppError::Forbidden(
                "this operation requires a superadmin".to_string(),
            )),
        }
    }
}

impl From<&Admin> for Principal {
    fn from(admin: &Admin) -> Self {
        Principal::new(admin.id.clone(), admin.role)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteAdminRequest {
    pub login_id: String,
    pub password: String,
    pub display_name: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Admin
}

#[derive(Debug, Clone, Serialize)]
pub struct InviteAdminResponse {
    pub admin: Admin,
    /// Creating an account signs the inviting admin out.
    pub session_invalidated: bool,
}
