//! Plan error types

use thiserror::Error;

/// Errors that can occur while producing or storing a plan
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Plan API key not configured. Set the {0} environment variable.")]
    MissingApiKey(String),

    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("No response from the plan service")]
    EmptyResponse,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No profile to regenerate from; run `fc plan` first")]
    NoProfile,

    #[error("Plan store error: {0}")]
    Store(String),

    #[error("Prompt error: {0}")]
    Prompt(String),
}

impl PlanError {
    /// Check if this error is worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            PlanError::Api { status, .. } => matches!(status, 408 | 429) || *status >= 500,
            PlanError::Network(_) => true,
            _ => false,
        }
    }
}
