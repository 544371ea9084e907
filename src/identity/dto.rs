use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct CreateAccountRequest<'a> {
    pub login_id: &'a str,
    pub password: &'a str,
    pub display_name: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct CreateAccountResponse {
    pub uid: String,
}

#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
