pub mod dto;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct IdentityConfig {
    pub base_url: String,
    pub api_token: String,
}

/// Login accounts backing admin records. Creating an account may sign the
/// calling admin out; callers surface that to the user.
#[async_trait]
pub trait AccountClient: Send + Sync {
    /// Returns the uid of the new account.
    async fn create_account(
        &self,
        login_id: &str,
        password: &str,
        display_name: &str,
    ) -> Result<String, AppError>;

    /// Deleting an account that no longer exists succeeds.
    async fn delete_account(&self, uid: &str) -> Result<(), AppError>;
}

pub struct AccountHttpClient {
    client: Client,
    config: IdentityConfig,
}

impl AccountHttpClient {
    pub fn new(config: IdentityConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Transport(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn error_from(response: reqwest::Response) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<dto::ErrorResponse>(&body)
            .ok()
            .and_then(|e| e.message.or(e.code))
            .unwrap_or(body);

        match status {
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                AppError::Validation(format!("account rejected: {}", detail))
            }
            _ => AppError::Transport(format!("identity API error {}: {}", status, detail)),
        }
    }
}

#[async_trait]
impl AccountClient for AccountHttpClient {
    async fn create_account(
        &self,
        login_id: &str,
        password: &str,
        display_name: &str,
    ) -> Result<String, AppError> {
        let response = self
            .client
            .post(self.url("accounts"))
            .bearer_auth(&self.config.api_token)
            .json(&dto::CreateAccountRequest {
                login_id,
                password,
                display_name,
            })
            .send()
            .await
            .map_err(|e| AppError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let created: dto::CreateAccountResponse = response
            .json()
            .await
            .map_err(|e| AppError::Transport(format!("Failed to parse identity response: {}", e)))?;

        info!(uid = %created.uid, "account created");
        Ok(created.uid)
    }

    async fn delete_account(&self, uid: &str) -> Result<(), AppError> {
        let response = self
            .client
            .delete(self.url(&format!("accounts/{uid}")))
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .map_err(|e| AppError::Transport(e.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => {
                warn!(%uid, "account already gone");
                Ok(())
            }
            _ => Err(Self::error_from(response).await),
        }
    }
}

/// Stand-in used when no identity service is configured. Mints ids locally.
#[derive(Debug, Default, Clone)]
pub struct LocalAccountClient;

#[async_trait]
impl AccountClient for LocalAccountClient {
    async fn create_account(
        &self,
        login_id: &str,
        _password: &str,
        _display_name: &str,
    ) -> Result<String, AppError> {
        let uid = Uuid::new_v4().to_string();
        info!(%login_id, %uid, "local account created");
        Ok(uid)
    }

    async fn delete_account(&self, uid: &str) -> Result<(), AppError> {
        info!(%uid, "local account deleted");
        Ok(())
    }
}
