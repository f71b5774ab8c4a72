//! Job poller
//!
//! Drives one remote generation job from submission to a terminal status and
//! turns the outcome into either a result URL or a classified [`JobError`].
//!
//! Every suspension point (the create call, the wait between polls, each
//! poll call, each retry backoff and each progress event) is raced against
//! the caller's cancellation token. Waits never run past `max_duration`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::JobError;
use super::service::GenerationService;
use super::types::{Credentials, GenerationRequest, Job, JobEvent, JobStatus, PollPolicy};

/// Submits image jobs and waits for them to finish
///
/// The poller holds no per-job state; one instance can drive any number of
/// concurrent jobs. It does not de-duplicate: two calls with the same request
/// create two remote jobs.
#[derive(Clone)]
pub struct JobPoller {
    service: Arc<dyn GenerationService>,
    policy: PollPolicy,
}

impl JobPoller {
    pub fn new(service: Arc<dyn GenerationService>, policy: PollPolicy) -> Self {
        debug!(?policy, "JobPoller::new: called");
        Self { service, policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Create a job and wait for its result
    pub async fn submit_and_await(
        &self,
        request: &GenerationRequest,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> Result<String, JobError> {
        self.submit_and_await_observed(request, credentials, cancel, None).await
    }

    /// Same as [`submit_and_await`](Self::submit_and_await), reporting progress on `events`
    pub async fn submit_and_await_observed(
        &self,
        request: &GenerationRequest,
        credentials: &Credentials,
        cancel: &CancellationToken,
        events: Option<&mpsc::Sender<JobEvent>>,
    ) -> Result<String, JobError> {
        debug!(prompt_len = request.prompt.len(), "submit_and_await: called");
        let Some(token) = credentials.token() else {
            debug!("submit_and_await: no credentials, failing before any request");
            return Err(JobError::AuthMissing);
        };
        if request.prompt.trim().is_empty() {
            debug!("submit_and_await: empty prompt");
            return Err(JobError::EmptyPrompt);
        }

        let started = Instant::now();
        let deadline = self.deadline(started);
        let mut job = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(JobError::Canceled { id: None }),
            created = self.service.create(request, token) => created.map_err(JobError::CreateFailed)?,
        };
        if job.id.is_empty() {
            return Err(JobError::MissingJobId);
        }
        info!(id = %job.id, status = %job.status, "Image job created");
        emit(
            events,
            cancel,
            JobEvent::Created {
                id: job.id.clone(),
                status: job.status,
            },
        )
        .await;

        let mut polls = 0u32;
        while !job.status.is_terminal() {
            if let Some(max) = self.policy.max_attempts
                && polls >= max
            {
                return Err(self.timeout(&job, polls, started));
            }
            if expired(deadline) {
                return Err(self.timeout(&job, polls, started));
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(JobError::Canceled { id: Some(job.id.clone()) }),
                _ = tokio::time::sleep_until(wake_at(self.policy.interval, deadline)) => {}
            }
            if expired(deadline) {
                return Err(self.timeout(&job, polls, started));
            }

            polls += 1;
            let update = self.poll_once(&job, token, polls, started, cancel, events).await?;
            job.observe(update);
            debug!(id = %job.id, polls, status = %job.status, "submit_and_await: polled");
            emit(
                events,
                cancel,
                JobEvent::Polled {
                    id: job.id.clone(),
                    attempt: polls,
                    status: job.status,
                },
            )
            .await;
        }

        info!(id = %job.id, status = %job.status, polls, elapsed = ?started.elapsed(), "Image job finished");
        resolve(job)
    }

    /// One status observation, retrying transient failures with backoff
    ///
    /// Backoffs stop at the `max_duration` deadline, which yields `Timeout`.
    async fn poll_once(
        &self,
        job: &Job,
        token: &str,
        poll: u32,
        started: Instant,
        cancel: &CancellationToken,
        events: Option<&mpsc::Sender<JobEvent>>,
    ) -> Result<Job, JobError> {
        let id = job.id.as_str();
        let deadline = self.deadline(started);
        let attempts = self.policy.poll_retries.max(1);
        let mut attempt = 1;
        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(JobError::Canceled { id: Some(id.to_string()) }),
                fetched = self.service.fetch(id, token) => fetched,
            };

            let err = match result {
                Ok(job) => return Ok(job),
                Err(e) => e,
            };

            if !err.is_retryable() || attempt >= attempts {
                debug!(%id, attempt, error = %err, "poll_once: giving up");
                return Err(JobError::PollFailed {
                    id: id.to_string(),
                    attempts: attempt,
                    source: err,
                });
            }

            let backoff = self.policy.backoff_for(attempt);
            warn!(%id, poll, attempt, backoff_ms = backoff.as_millis() as u64, error = %err, "poll_once: retrying after transient error");
            emit(
                events,
                cancel,
                JobEvent::Retrying {
                    id: id.to_string(),
                    attempt: poll,
                    retry: attempt,
                    backoff,
                },
            )
            .await;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(JobError::Canceled { id: Some(id.to_string()) }),
                _ = tokio::time::sleep_until(wake_at(backoff, deadline)) => {}
            }
            if expired(deadline) {
                return Err(self.timeout(job, poll, started));
            }
            attempt += 1;
        }
    }

    /// Instant at which `max_duration` runs out for a job submitted at `started`
    fn deadline(&self, started: Instant) -> Option<Instant> {
        self.policy.max_duration.map(|max| started + max)
    }

    fn timeout(&self, job: &Job, polls: u32, started: Instant) -> JobError {
        warn!(id = %job.id, polls, status = %job.status, "Image job exceeded poll limits");
        JobError::Timeout {
            id: job.id.clone(),
            status: job.status,
            polls,
            elapsed: started.elapsed(),
        }
    }
}

/// Map a terminal job to its result
fn resolve(job: Job) -> Result<String, JobError> {
    match job.status {
        JobStatus::Succeeded => job.first_output().ok_or(JobError::NoOutput {
            id: job.id,
            output: job.output,
        }),
        status => Err(JobError::JobFailed {
            id: job.id,
            status,
            error: job.error,
        }),
    }
}

/// When to wake after waiting `wait`, never later than `deadline`
fn wake_at(wait: Duration, deadline: Option<Instant>) -> Instant {
    let wake = Instant::now() + wait;
    deadline.map_or(wake, |deadline| wake.min(deadline))
}

fn expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|deadline| Instant::now() >= deadline)
}

/// Report `event`, giving up if `cancel` fires while the channel is full
///
/// The next wait in the poll loop turns the cancellation into `Canceled`.
async fn emit(events: Option<&mpsc::Sender<JobEvent>>, cancel: &CancellationToken, event: JobEvent) {
    let Some(tx) = events else {
        return;
    };
    tokio::select! {
        biased;
        _ = cancel.cancelled() => debug!("emit: canceled while the event channel was full, dropping event"),
        _ = tx.send(event) => {}
    }
}
