//! Image generation
//!
//! Long-running image jobs against a create-then-poll service. The
//! [`JobPoller`] drives one job to a terminal status; the
//! [`ImageController`] adds per-target single-flight and the placeholder
//! fallback on top.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

mod controller;
mod error;
mod placeholder;
mod poller;
mod service;
mod types;

pub use controller::{ImageController, ImageOutcome, ImageState};
pub use error::{FailureKind, JobError, ServiceError};
pub use placeholder::{DEFAULT_PLACEHOLDER_BASE, placeholder_url};
pub use poller::JobPoller;
pub use service::{GenerationService, HttpGenerationService, ServiceRoute};
pub use types::{Credentials, GenerationRequest, Job, JobEvent, JobStatus, PollPolicy};

use crate::config::ImageConfig;

/// Create a poller talking HTTP to the route selected in config
pub fn create_poller(config: &ImageConfig) -> Result<JobPoller, ServiceError> {
    debug!(route = %config.route, endpoint = %config.endpoint(), "create_poller: called");
    let service = HttpGenerationService::new(
        config.endpoint(),
        config.route,
        Duration::from_millis(config.timeout_ms),
    )?;
    Ok(JobPoller::new(Arc::new(service), config.poll_policy()))
}
