use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{error, info, instrument};

use crate::config::BootstrapAdmin;
use crate::db::admins;
use crate::error::{AppError, is_unique_violation};
use crate::identity::AccountClient;
use crate::models::{Admin, InviteAdminRequest, InviteAdminResponse, Principal, Role};

const MIN_PASSWORD_LEN: usize = 6;

pub struct AdminService {
    db: SqlitePool,
    accounts: Arc<dyn AccountClient>,
}

impl AdminService {
    pub fn new(db: SqlitePool, accounts: Arc<dyn AccountClient>) -> Self {
        Self { db, accounts }
    }

    pub async fn list(&self) -> Result<Vec<Admin>, AppError> {
        Ok(admins::fetch_admins(&self.db).await?)
    }

    /// Resolves the acting admin. Unknown ids are refused outright.
    pub async fn principal(&self, admin_id: &str) -> Result<Principal, AppError> {
        admins::find_admin(&self.db, admin_id)
            .await?
            .map(|admin| Principal::from(&admin))
            .ok_or_else(|| AppError::Forbidden(format!("{admin_id} is not an administrator")))
    }

    /// Creates `seed` as a superadmin when the directory is empty. Returns
    /// `None` once any admin exists; the seed is never re-applied.
    #[instrument(skip(self, seed), fields(admin = %seed.admin_id))]
    pub async fn bootstrap(&self, seed: &BootstrapAdmin) -> Result<Option<Admin>, AppError> {
        let created = admins::insert_first_admin(
            &self.db,
            &seed.admin_id,
            &seed.login_id,
            &seed.display_name,
            Role::Superadmin,
        )
        .await?;
        if !created {
            return Ok(None);
        }

        info!("bootstrap superadmin created");
        Ok(admins::find_admin(&self.db, &seed.admin_id).await?)
    }

    #[instrument(skip(self, req, principal), fields(admin = %principal.admin_id, login_id = %req.login_id))]
    pub async fn invite(
        &self,
        req: InviteAdminRequest,
        principal: &Principal,
    ) -> Result<InviteAdminResponse, AppError> {
        principal.require_superadmin()?;

        let login_id = req.login_id.trim();
        let display_name = req.display_name.trim();
        if login_id.is_empty() {
            return Err(AppError::validation("login id is required"));
        }
        if display_name.is_empty() {
            return Err(AppError::validation("display name is required"));
        }
        if req.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let uid = self
            .accounts
            .create_account(login_id, &req.password, display_name)
            .await?;

        let admin = match admins::insert_admin(&self.db, &uid, login_id, display_name, req.role).await {
            Ok(admin) => admin,
            Err(e) => {
                // no admin record, so the account must not linger
                if let Err(cleanup) = self.accounts.delete_account(&uid).await {
                    error!(%uid, "orphaned account after failed invite: {}", cleanup);
                }
                return Err(if is_unique_violation(&e) {
                    AppError::validation(format!("login id {login_id} is already taken"))
                } else {
                    AppError::Database(e)
                });
            }
        };

        info!(admin_id = %admin.id, "admin invited");
        Ok(InviteAdminResponse {
            admin,
            session_invalidated: true,
        })
    }

    #[instrument(skip(self, principal), fields(admin = %principal.admin_id))]
    pub async fn remove(&self, admin_id: &str, principal: &Principal) -> Result<Admin, AppError> {
        principal.require_superadmin()?;
        if admin_id == principal.admin_id {
            return Err(AppError::validation("an admin cannot delete their own account"));
        }

        let admin = admins::find_admin(&self.db, admin_id)
            .await?
            .ok_or(AppError::NotFound("admin"))?;

        self.accounts.delete_account(&admin.id).await?;
        admins::delete_admin(&self.db, &admin.id).await?;

        info!(removed = %admin.id, "admin removed");
        Ok(admin)
    }
}
