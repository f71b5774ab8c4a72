//! Plan generation
//!
//! Turns a [`UserProfile`] into a workout/diet/tips plan through a language
//! model, and keeps the last plan on disk.

use std::sync::Arc;

use tracing::debug;

mod controller;
mod error;
mod gemini;
pub mod generator;
mod profile;
mod sections;

pub use controller::{PLAN_KEY, PlanController, PlanPhase, PlanSnapshot};
pub use error::PlanError;
pub use gemini::GeminiClient;
pub use generator::PlanGenerator;
pub use profile::{Diet, Gender, Goal, Level, Location, UserProfile};
pub use sections::{GeneratedPlan, Section, split_sections};

use crate::config::PlanConfig;
use crate::prompts::PromptLoader;

/// Create the plan generator described by config
pub fn create_generator(config: &PlanConfig, prompts: PromptLoader) -> Result<Arc<dyn PlanGenerator>, PlanError> {
    debug!(model = %config.model, "create_generator: called");
    Ok(Arc::new(GeminiClient::from_config(config, prompts)?))
}
