use serde::Serialize;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemError {
    pub code: &'static str,
    pub message: String,
}

impl From<&AppError> for ItemError {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemOutcome {
    pub key: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ItemError>,
}

impl ItemOutcome {
    pub fn from_result<T>(key: impl Into<String>, result: &Result<T, AppError>) -> Self {
        match result {
            Ok(_) => Self {
                key: key.into(),
                success: true,
                error: None,
            },
            Err(err) => Self {
                key: key.into(),
                success: false,
                error: Some(ItemError::from(err)),
            },
        }
    }
}

/// Per-item report of a batch that is never rolled back as a whole.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub items: Vec<ItemOutcome>,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn push(&mut self, outcome: ItemOutcome) {
        if outcome.success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.items.push(outcome);
    }
}
