//! User fitness profile

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::PlanError;

/// Implements `Display` with the human label used in prompts and exports
macro_rules! labelled {
    ($name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $name {
            pub fn label(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.label())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum Gender {
    #[default]
    Male,
    Female,
    Other,
}

labelled!(Gender {
    Male => "Male",
    Female => "Female",
    Other => "Other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum Goal {
    #[default]
    #[serde(rename = "Weight Loss")]
    WeightLoss,
    #[serde(rename = "Muscle Gain")]
    MuscleGain,
    Endurance,
    Mobility,
    #[serde(rename = "General Fitness")]
    GeneralFitness,
}

labelled!(Goal {
    WeightLoss => "Weight Loss",
    MuscleGain => "Muscle Gain",
    Endurance => "Endurance",
    Mobility => "Mobility",
    GeneralFitness => "General Fitness",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum Level {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

labelled!(Level {
    Beginner => "Beginner",
    Intermediate => "Intermediate",
    Advanced => "Advanced",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum Location {
    #[default]
    Home,
    Gym,
    Outdoor,
}

labelled!(Location {
    Home => "Home",
    Gym => "Gym",
    Outdoor => "Outdoor",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum Diet {
    Veg,
    #[default]
    #[serde(rename = "Non-Veg")]
    NonVeg,
    Vegan,
    Keto,
}

labelled!(Diet {
    Veg => "Veg",
    NonVeg => "Non-Veg",
    Vegan => "Vegan",
    Keto => "Keto",
});

/// Everything the plan generator knows about the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    pub height_cm: u32,
    pub weight_kg: u32,
    pub goal: Goal,
    pub level: Level,
    pub location: Location,
    pub diet: Diet,

    /// Free-text medical notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical: Option<String>,

    /// Free-text stress level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stress: Option<String>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            age: 25,
            gender: Gender::default(),
            height_cm: 170,
            weight_kg: 70,
            goal: Goal::default(),
            level: Level::default(),
            location: Location::default(),
            diet: Diet::default(),
            medical: None,
            stress: None,
        }
    }
}

impl UserProfile {
    /// A default profile for `name`
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Check the profile before it is sent anywhere
    pub fn validate(&self) -> Result<(), PlanError> {
        debug!(name = %self.name, age = self.age, "validate: called");
        if self.name.trim().is_empty() {
            return Err(PlanError::InvalidProfile("name is required".to_string()));
        }
        if !(15..=100).contains(&self.age) {
            return Err(PlanError::InvalidProfile(format!("age {} outside 15-100", self.age)));
        }
        if !(100..=250).contains(&self.height_cm) {
            return Err(PlanError::InvalidProfile(format!(
                "height {}cm outside 100-250",
                self.height_cm
            )));
        }
        if !(30..=300).contains(&self.weight_kg) {
            return Err(PlanError::InvalidProfile(format!(
                "weight {}kg outside 30-300",
                self.weight_kg
            )));
        }
        Ok(())
    }

    /// Medical notes, or "None" when blank
    pub fn medical_or_default(&self) -> &str {
        self.medical.as_deref().map(str::trim).filter(|s| !s.is_empty()).unwrap_or("None")
    }

    /// Stress level, or "Normal" when blank
    pub fn stress_or_default(&self) -> &str {
        self.stress.as_deref().map(str::trim).filter(|s| !s.is_empty()).unwrap_or("Normal")
    }
}
