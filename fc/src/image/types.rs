//! Image job types
//!
//! Wire and domain types shared by the generation service and the poller.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Remote job status
///
/// The vocabulary belongs to the service. Values we do not recognise are
/// kept as `Unknown` and treated as still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted, not yet running
    #[default]
    Starting,
    /// Running on the service
    Processing,
    /// Finished with output
    Succeeded,
    /// Finished with an error payload
    Failed,
    /// Stopped before finishing
    #[serde(alias = "cancelled")]
    Canceled,
    /// Status string this client does not know
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Whether no further status change can happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Starting => write!(f, "starting"),
            Self::Processing => write!(f, "processing"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Canceled => write!(f, "canceled"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// One remote generation job as last observed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Service-assigned identifier
    #[serde(default)]
    pub id: String,

    pub status: JobStatus,

    /// Result payload, present once succeeded
    #[serde(default)]
    pub output: Option<Value>,

    /// Diagnostic payload, present once failed
    #[serde(default)]
    pub error: Option<Value>,
}

impl Job {
    /// A job with only an id and a status
    pub fn new(id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            id: id.into(),
            status,
            output: None,
            error: None,
        }
    }

    /// Builder: attach an output payload
    pub fn with_output(mut self, output: Value) -> Self {
        self.output = Some(output);
        self
    }

    /// Builder: attach an error payload
    pub fn with_error(mut self, error: Value) -> Self {
        self.error = Some(error);
        self
    }

    /// Fold a fresh observation into this job
    ///
    /// Status, output and error are overwritten from `update`. Once this job
    /// is terminal nothing changes, and the id is never replaced. Returns
    /// whether anything was applied.
    pub fn observe(&mut self, update: Job) -> bool {
        if self.status.is_terminal() {
            debug!(id = %self.id, status = %self.status, "Job::observe: already terminal, ignoring update");
            return false;
        }
        self.status = update.status;
        self.output = update.output;
        self.error = update.error;
        true
    }

    /// The authoritative result URL of a succeeded job
    ///
    /// A sequence yields its first element; a scalar string yields itself.
    /// Anything else (absent, empty, non-string) yields `None`.
    pub fn first_output(&self) -> Option<String> {
        match self.output.as_ref()? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Array(items) => items.first().and_then(Value::as_str).map(str::to_string),
            _ => None,
        }
    }
}

/// Parameters for one image generation job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Model identifier understood by the service
    pub model: String,
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    pub num_inference_steps: u32,
}

impl GenerationRequest {
    /// A request with the default model and parameters
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            model: "black-forest-labs/flux-1.1-pro".to_string(),
            prompt: prompt.into(),
            width: 1024,
            height: 1024,
            num_inference_steps: 25,
        }
    }

    /// Request body for the create call
    pub fn to_body(&self) -> Value {
        serde_json::json!({
            "version": self.model,
            "input": {
                "prompt": self.prompt,
                "width": self.width,
                "height": self.height,
                "num_inference_steps": self.num_inference_steps,
            }
        })
    }
}

/// Bearer credentials for the generation service
#[derive(Clone, Default)]
pub struct Credentials {
    token: Option<String>,
}

impl Credentials {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn none() -> Self {
        Self { token: None }
    }

    /// The token, if one is configured and not blank
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.trim().is_empty())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shown = if self.token().is_some() { "<redacted>" } else { "<none>" };
        f.debug_struct("Credentials").field("token", &shown).finish()
    }
}

/// How the poll loop paces itself and when it gives up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay before each status poll
    pub interval: Duration,

    /// Stop with `Timeout` after this many polls
    pub max_attempts: Option<u32>,

    /// Stop with `Timeout` once this much time has passed since submission
    pub max_duration: Option<Duration>,

    /// Attempts per status poll before a transport error becomes `PollFailed`
    pub poll_retries: u32,

    /// First retry delay; doubles on each further retry
    pub retry_backoff: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            max_attempts: Some(150),
            max_duration: Some(Duration::from_secs(600)),
            poll_retries: 3,
            retry_backoff: Duration::from_millis(1000),
        }
    }
}

impl PollPolicy {
    /// Poll forever at `interval`, giving up on the first transport error
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
            max_duration: None,
            poll_retries: 1,
            retry_backoff: Duration::ZERO,
        }
    }

    /// Backoff before retry number `retry` (1-based)
    pub fn backoff_for(&self, retry: u32) -> Duration {
        self.retry_backoff.saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
    }
}

/// Progress notification from the poll loop
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    /// The create call returned
    Created { id: String, status: JobStatus },
    /// A status poll returned
    Polled { id: String, attempt: u32, status: JobStatus },
    /// A status poll failed and will be retried
    Retrying {
        id: String,
        attempt: u32,
        retry: u32,
        backoff: Duration,
    },
}
