//! Prompt Loader
//!
//! Loads prompt templates from files or falls back to embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, info};

use super::embedded;
use crate::plan::UserProfile;

/// Context for rendering the plan prompt
#[derive(Debug, Clone, Serialize)]
pub struct PlanPromptContext {
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub height_cm: u32,
    pub weight_kg: u32,
    pub goal: String,
    pub level: String,
    pub location: String,
    pub diet: String,
    /// "None" when the profile has no medical notes
    pub medical: String,
    /// "Normal" when the profile has no stress level
    pub stress: String,
}

impl From<&UserProfile> for PlanPromptContext {
    fn from(profile: &UserProfile) -> Self {
        Self {
            name: profile.name.trim().to_string(),
            age: profile.age,
            gender: profile.gender.to_string(),
            height_cm: profile.height_cm,
            weight_kg: profile.weight_kg,
            goal: profile.goal.to_string(),
            level: profile.level.to_string(),
            location: profile.location.to_string(),
            diet: profile.diet.to_string(),
            medical: profile.medical_or_default().to_string(),
            stress: profile.stress_or_default().to_string(),
        }
    }
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// User override directory (e.g., `.fitcoach/prompts/`)
    user_dir: Option<PathBuf>,
    /// Project default directory (e.g., `prompts/`)
    repo_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader rooted at `root`
    ///
    /// Looks for `.fitcoach/prompts/` and `prompts/` under `root`; missing
    /// directories are skipped.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        debug!(?root, "PromptLoader::new: called");
        let user_dir = root.join(".fitcoach/prompts");
        let repo_dir = root.join("prompts");
        debug!(
            ?user_dir,
            user_dir_exists = user_dir.exists(),
            ?repo_dir,
            repo_dir_exists = repo_dir.exists(),
            "PromptLoader::new: checking directories"
        );

        Self {
            hbs: Self::engine(),
            user_dir: user_dir.exists().then_some(user_dir),
            repo_dir: repo_dir.exists().then_some(repo_dir),
        }
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: Self::engine(),
            user_dir: None,
            repo_dir: None,
        }
    }

    // Prompts are plain text, not HTML
    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks in order:
    /// 1. User override: `.fitcoach/prompts/{name}.pmt`
    /// 2. Project default: `prompts/{name}.pmt`
    /// 3. Embedded fallback
    fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        for dir in [&self.user_dir, &self.repo_dir].into_iter().flatten() {
            let path = dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found on disk");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read prompt {}: {}", path.display(), e));
            }
        }

        if let Some(content) = embedded::get_embedded(name) {
            debug!(%name, "PromptLoader::load_template: found in embedded");
            return Ok(content.to_string());
        }

        debug!(%name, "PromptLoader::load_template: not found anywhere");
        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String> {
        debug!(%template_name, "PromptLoader::render: called");
        let template = self.load_template(template_name)?;
        info!("Rendering template '{}'", template_name);
        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }

    /// The seven-day plan prompt for `profile`
    pub fn plan_prompt(&self, profile: &UserProfile) -> Result<String> {
        debug!(name = %profile.name, "PromptLoader::plan_prompt: called");
        self.render("plan", &PlanPromptContext::from(profile))
    }

    /// The motivational quote prompt
    pub fn quote_prompt(&self) -> Result<String> {
        debug!("PromptLoader::quote_prompt: called");
        Ok(self.load_template("quote")?.trim().to_string())
    }
}
