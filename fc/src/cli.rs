//! CLI command definitions and subcommands

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::plan::{Diet, Gender, Goal, Level, Location, Section, UserProfile};

/// fitcoach - personal fitness plans from a language model
#[derive(Parser)]
#[command(
    name = "fc",
    about = "Generate, show and export personal fitness plans",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a new plan for a profile
    Plan(ProfileArgs),

    /// Generate a fresh plan for the saved profile
    Regenerate,

    /// Show the saved plan
    Show {
        /// Only show one section
        #[arg(short, long)]
        section: Option<Section>,
    },

    /// Print a motivational quote
    Quote,

    /// Generate an image for a piece of text
    Image {
        /// Text to illustrate
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,

        /// Trigger target the image belongs to
        #[arg(short, long, default_value = "cli")]
        target: String,
    },

    /// Export the saved plan as Markdown
    Export {
        /// Output file (defaults to `{name}-Fitness-Plan.md`)
        path: Option<PathBuf>,
    },

    /// Delete the saved plan
    Clear,
}

/// Profile fields for `fc plan`
#[derive(Debug, Args)]
pub struct ProfileArgs {
    /// Your name
    #[arg(short, long)]
    pub name: String,

    #[arg(long, default_value_t = 25)]
    pub age: u32,

    #[arg(long, value_enum, default_value_t = Gender::Male)]
    pub gender: Gender,

    /// Height in centimetres
    #[arg(long = "height", default_value_t = 170)]
    pub height_cm: u32,

    /// Weight in kilograms
    #[arg(long = "weight", default_value_t = 70)]
    pub weight_kg: u32,

    #[arg(long, value_enum, default_value_t = Goal::WeightLoss)]
    pub goal: Goal,

    #[arg(long, value_enum, default_value_t = Level::Beginner)]
    pub level: Level,

    #[arg(long, value_enum, default_value_t = Location::Home)]
    pub location: Location,

    #[arg(long, value_enum, default_value_t = Diet::NonVeg)]
    pub diet: Diet,

    /// Medical conditions or injuries
    #[arg(long)]
    pub medical: Option<String>,

    /// Current stress level
    #[arg(long)]
    pub stress: Option<String>,
}

impl From<ProfileArgs> for UserProfile {
    fn from(args: ProfileArgs) -> Self {
        debug!(name = %args.name, "UserProfile::from(ProfileArgs): called");
        Self {
            name: args.name,
            age: args.age,
            gender: args.gender,
            height_cm: args.height_cm,
            weight_kg: args.weight_kg,
            goal: args.goal,
            level: args.level,
            location: args.location,
            diet: args.diet,
            medical: args.medical,
            stress: args.stress,
        }
    }
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fitcoach")
        .join("logs")
        .join("fitcoach.log")
}

/// Generate the after_help text
pub fn generate_after_help() -> String {
    format!("Logs are written to: {}\n", get_log_path().display())
}
