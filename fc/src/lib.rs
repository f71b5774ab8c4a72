//! fitcoach - personal fitness plans with generated illustrations
//!
//! A profile goes to a language model, which answers with a seven-day plan.
//! The plan is split into workout, diet and tips sections, kept on disk, and
//! rendered or exported on demand. Any piece of text can be illustrated
//! through a remote image generation job.
//!
//! # Modules
//!
//! - [`image`] - image job poller, generation service and single-flight controller
//! - [`plan`] - profile, plan generator and plan controller
//! - [`prompts`] - prompt templates
//! - [`render`] - terminal output and Markdown export
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod image;
pub mod plan;
pub mod prompts;
pub mod render;

// Re-export commonly used types
pub use config::Config;
pub use image::{
    Credentials, FailureKind, GenerationRequest, GenerationService, ImageController, ImageOutcome, ImageState, Job,
    JobError, JobPoller, JobStatus, PollPolicy, ServiceError, ServiceRoute, create_poller,
};
pub use plan::{GeneratedPlan, PlanController, PlanError, PlanGenerator, PlanSnapshot, UserProfile, create_generator};
pub use prompts::PromptLoader;
