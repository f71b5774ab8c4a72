//! Split a generated plan into its sections

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A generated plan, one Markdown string per section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedPlan {
    pub workout: String,
    pub diet: String,
    pub tips: String,
}

/// Which part of a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Section {
    Workout,
    Diet,
    Tips,
}

impl Section {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Workout => "Workout Plan",
            Self::Diet => "Diet Plan",
            Self::Tips => "Tips & Motivation",
        }
    }
}

impl GeneratedPlan {
    pub fn section(&self, section: Section) -> &str {
        match section {
            Section::Workout => &self.workout,
            Section::Diet => &self.diet,
            Section::Tips => &self.tips,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.workout.trim().is_empty() && self.diet.trim().is_empty() && self.tips.trim().is_empty()
    }
}

/// Body of the section headed `heading`, up to the next `#`
fn extract(text: &str, heading: &str) -> Option<String> {
    let section = RegexBuilder::new(&format!(r"#{{1,3}}\s*{}[^#]*", heading))
        .case_insensitive(true)
        .build()
        .ok()?;
    let title = RegexBuilder::new(&format!(r"^#{{1,3}}\s*{}", heading))
        .case_insensitive(true)
        .build()
        .ok()?;

    let found = section.find(text)?.as_str();
    let body = title.replace(found, "").trim().to_string();
    (!body.is_empty()).then_some(body)
}

/// Split LLM output on its Workout Plan / Diet Plan / Tips headings
///
/// Without a workout heading the whole text is the workout. Missing diet or
/// tips sections are empty.
pub fn split_sections(text: &str) -> GeneratedPlan {
    debug!(text_len = text.len(), "split_sections: called");
    let workout = extract(text, "workout plan").unwrap_or_else(|| text.to_string());
    let diet = extract(text, "diet plan").unwrap_or_default();
    let tips = extract(text, "tips").unwrap_or_default();
    debug!(
        workout_len = workout.len(),
        diet_len = diet.len(),
        tips_len = tips.len(),
        "split_sections: done"
    );
    GeneratedPlan { workout, diet, tips }
}
