//! Image job error types

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use super::types::JobStatus;

/// Errors from a single call to the generation service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ServiceError {
    /// Check if this error is worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Api { status, .. } => matches!(status, 408 | 429) || *status >= 500,
            ServiceError::Network(_) => true,
            ServiceError::InvalidResponse(_) => false,
            ServiceError::Json(_) => false,
        }
    }
}

/// Classification of a failed image job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    AuthMissing,
    EmptyPrompt,
    CreateFailed,
    PollFailed,
    JobFailed,
    NoOutput,
    Timeout,
    Canceled,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AuthMissing => "auth-missing",
            Self::EmptyPrompt => "empty-prompt",
            Self::CreateFailed => "create-failed",
            Self::PollFailed => "poll-failed",
            Self::JobFailed => "job-failed",
            Self::NoOutput => "no-output",
            Self::Timeout => "timeout",
            Self::Canceled => "canceled",
        };
        write!(f, "{}", s)
    }
}

/// Why `submit_and_await` did not produce an image
#[derive(Debug, Error)]
pub enum JobError {
    #[error("No image API token configured")]
    AuthMissing,

    #[error("Image prompt is empty")]
    EmptyPrompt,

    #[error("Failed to create image job: {0}")]
    CreateFailed(#[source] ServiceError),

    #[error("Image job creation returned no job id")]
    MissingJobId,

    #[error("Polling job {id} failed after {attempts} attempt(s): {source}")]
    PollFailed {
        id: String,
        attempts: u32,
        #[source]
        source: ServiceError,
    },

    #[error("Job {id} ended {status}{}", .error.as_ref().map(|e| format!(": {}", e)).unwrap_or_default())]
    JobFailed {
        id: String,
        status: JobStatus,
        error: Option<Value>,
    },

    #[error("Job {id} succeeded without a usable output")]
    NoOutput { id: String, output: Option<Value> },

    #[error("Job {id} still {status} after {polls} poll(s) and {elapsed:?}")]
    Timeout {
        id: String,
        status: JobStatus,
        polls: u32,
        elapsed: Duration,
    },

    #[error("Image job canceled by caller")]
    Canceled { id: Option<String> },
}

impl JobError {
    /// Failure classification for this error
    pub fn kind(&self) -> FailureKind {
        match self {
            JobError::AuthMissing => FailureKind::AuthMissing,
            JobError::EmptyPrompt => FailureKind::EmptyPrompt,
            JobError::CreateFailed(_) | JobError::MissingJobId => FailureKind::CreateFailed,
            JobError::PollFailed { .. } => FailureKind::PollFailed,
            JobError::JobFailed { .. } => FailureKind::JobFailed,
            JobError::NoOutput { .. } => FailureKind::NoOutput,
            JobError::Timeout { .. } => FailureKind::Timeout,
            JobError::Canceled { .. } => FailureKind::Canceled,
        }
    }

    /// The job id, if the job got far enough to have one
    pub fn job_id(&self) -> Option<&str> {
        match self {
            JobError::PollFailed { id, .. }
            | JobError::JobFailed { id, .. }
            | JobError::NoOutput { id, .. }
            | JobError::Timeout { id, .. } => Some(id),
            JobError::Canceled { id } => id.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_service_error_retryable() {
        let api = |status| ServiceError::Api {
            status,
            message: String::new(),
        };
        assert!(api(500).is_retryable());
        assert!(api(503).is_retryable());
        assert!(api(429).is_retryable());
        assert!(api(408).is_retryable());
        assert!(!api(401).is_retryable());
        assert!(!api(404).is_retryable());
        assert!(!ServiceError::InvalidResponse("bad".to_string()).is_retryable());
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(JobError::AuthMissing.kind(), FailureKind::AuthMissing);
        assert_eq!(JobError::MissingJobId.kind(), FailureKind::CreateFailed);
        assert_eq!(
            JobError::CreateFailed(ServiceError::InvalidResponse("x".to_string())).kind(),
            FailureKind::CreateFailed
        );
        assert_eq!(JobError::Canceled { id: None }.kind(), FailureKind::Canceled);
    }

    #[test]
    fn test_job_failed_message_includes_payload() {
        let err = JobError::JobFailed {
            id: "job1".to_string(),
            status: JobStatus::Failed,
            error: Some(json!("NSFW content detected")),
        };
        let msg = err.to_string();
        assert!(msg.contains("job1"));
        assert!(msg.contains("failed"));
        assert!(msg.contains("NSFW content detected"));
        assert_eq!(err.job_id(), Some("job1"));
    }

    #[test]
    fn test_job_failed_message_without_payload() {
        let err = JobError::JobFailed {
            id: "job1".to_string(),
            status: JobStatus::Canceled,
            error: None,
        };
        assert_eq!(err.to_string(), "Job job1 ended canceled");
    }
}
