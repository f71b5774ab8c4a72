//! Image controller
//!
//! Owns the per-target image state machine and applies the degrade-silently
//! policy: whatever goes wrong, the caller gets a URL it can render.
//!
//! ```text
//! idle -> requesting -> polling -> done
//!              \            \
//!               `-----------`--> failed (placeholder)
//! ```
//!
//! At most one job is in flight per trigger target. A second trigger on a
//! busy target is refused rather than queued.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::{FailureKind, ServiceError};
use super::placeholder::placeholder_url;
use super::poller::JobPoller;
use super::types::{Credentials, GenerationRequest, JobEvent};
use crate::config::ImageConfig;

/// State of one trigger target
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ImageState {
    #[default]
    Idle,
    /// Create call outstanding
    Requesting,
    /// Job created, waiting for a terminal status
    Polling { job_id: String, attempt: u32 },
    Done { url: String },
    /// Generation failed; `placeholder` is what the caller shows instead
    Failed { placeholder: String, kind: FailureKind },
}

impl ImageState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Requesting | Self::Polling { .. })
    }
}

/// What a `generate` call produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    /// The generated image
    Ready { url: String },
    /// Generation failed; a placeholder stands in
    Placeholder { url: String, kind: FailureKind },
    /// The target already has a job in flight; nothing was started
    InFlight,
}

impl ImageOutcome {
    /// URL to render, if this call produced one
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Ready { url } | Self::Placeholder { url, .. } => Some(url),
            Self::InFlight => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Placeholder { .. })
    }
}

type Slots = Arc<Mutex<HashMap<String, ImageState>>>;

fn lock(slots: &Slots) -> MutexGuard<'_, HashMap<String, ImageState>> {
    slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Releases a target whose `generate` future was dropped mid-flight
struct FlightGuard {
    slots: Slots,
    target: String,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let mut slots = lock(&self.slots);
        if slots.get(&self.target).is_some_and(ImageState::is_in_flight) {
            debug!(target = %self.target, "FlightGuard::drop: releasing abandoned target");
            slots.insert(self.target.clone(), ImageState::Idle);
        }
    }
}

/// Runs image jobs per trigger target with single-flight and placeholder fallback
pub struct ImageController {
    poller: JobPoller,
    credentials: Credentials,
    template: GenerationRequest,
    placeholder_base: String,
    slots: Slots,
}

impl ImageController {
    pub fn new(
        poller: JobPoller,
        credentials: Credentials,
        template: GenerationRequest,
        placeholder_base: impl Into<String>,
    ) -> Self {
        debug!(?credentials, "ImageController::new: called");
        Self {
            poller,
            credentials,
            template,
            placeholder_base: placeholder_base.into(),
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Build a controller talking HTTP to the configured route
    pub fn from_config(config: &ImageConfig) -> Result<Self, ServiceError> {
        debug!(route = %config.route, "ImageController::from_config: called");
        let poller = super::create_poller(config)?;
        Ok(Self::new(
            poller,
            config.credentials(),
            config.request(""),
            config.placeholder_url.clone(),
        ))
    }

    /// Current state of `target`
    pub fn state(&self, target: &str) -> ImageState {
        lock(&self.slots).get(target).cloned().unwrap_or_default()
    }

    /// Forget a finished target; in-flight targets are left alone
    pub fn reset(&self, target: &str) -> bool {
        let mut slots = lock(&self.slots);
        if slots.get(target).is_some_and(ImageState::is_in_flight) {
            return false;
        }
        slots.remove(target);
        true
    }

    fn begin(&self, target: &str) -> Option<FlightGuard> {
        let mut slots = lock(&self.slots);
        if slots.get(target).is_some_and(ImageState::is_in_flight) {
            return None;
        }
        slots.insert(target.to_string(), ImageState::Requesting);
        Some(FlightGuard {
            slots: self.slots.clone(),
            target: target.to_string(),
        })
    }

    fn set(&self, target: &str, state: ImageState) {
        lock(&self.slots).insert(target.to_string(), state);
    }

    /// Mirror one poller event into the state of `target`
    fn track(&self, target: &str, event: JobEvent) {
        match event {
            // A job created already terminal is never polled
            JobEvent::Created { status, .. } if status.is_terminal() => {}
            JobEvent::Created { id, .. } => self.set(
                target,
                ImageState::Polling {
                    job_id: id,
                    attempt: 0,
                },
            ),
            JobEvent::Polled { id, attempt, .. } => self.set(target, ImageState::Polling { job_id: id, attempt }),
            JobEvent::Retrying { .. } => {}
        }
    }

    /// Generate an image for `prompt` on behalf of `target`
    ///
    /// Never fails: on any error the outcome is a placeholder and the
    /// diagnostic detail goes to the log.
    pub async fn generate(&self, target: &str, prompt: &str, cancel: &CancellationToken) -> ImageOutcome {
        debug!(%target, prompt_len = prompt.len(), "generate: called");
        let Some(_guard) = self.begin(target) else {
            info!(%target, "Image already in flight for target, ignoring trigger");
            return ImageOutcome::InFlight;
        };

        let request = GenerationRequest {
            prompt: prompt.trim().to_string(),
            ..self.template.clone()
        };

        let (tx, mut rx) = mpsc::channel(16);
        let run = async {
            let tx = tx;
            self.poller
                .submit_and_await_observed(&request, &self.credentials, cancel, Some(&tx))
                .await
        };
        let track = async {
            while let Some(event) = rx.recv().await {
                self.track(target, event);
            }
        };
        let (result, ()) = tokio::join!(run, track);

        match result {
            Ok(url) => {
                info!(%target, %url, "Image ready");
                self.set(target, ImageState::Done { url: url.clone() });
                ImageOutcome::Ready { url }
            }
            Err(e) => {
                let kind = e.kind();
                warn!(%target, %kind, job_id = ?e.job_id(), error = %e, "Image generation failed, using placeholder");
                let url = placeholder_url(&self.placeholder_base, prompt);
                self.set(
                    target,
                    ImageState::Failed {
                        placeholder: url.clone(),
                        kind,
                    },
                );
                ImageOutcome::Placeholder { url, kind }
            }
        }
    }
}
