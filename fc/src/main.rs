//! fitcoach - personal fitness plans
//!
//! CLI entry point.

use std::fs;
use std::path::PathBuf;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result};
use planstore::SnapshotStore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use fitcoach::cli::{Cli, Command, generate_after_help};
use fitcoach::config::Config;
use fitcoach::image::{ImageController, ImageOutcome};
use fitcoach::plan::{PlanController, Section, UserProfile, create_generator};
use fitcoach::prompts::PromptLoader;
use fitcoach::render;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fitcoach")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("fitcoach.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = Cli::command().after_help(generate_after_help());
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(
        route = %config.image.route,
        store = %config.storage.path.display(),
        "fitcoach loaded config"
    );

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Plan(args)) => cmd_plan(&config, args.into()).await,
        Some(Command::Regenerate) => cmd_regenerate(&config).await,
        Some(Command::Show { section }) => cmd_show(&config, section),
        Some(Command::Quote) => cmd_quote(&config).await,
        Some(Command::Image { prompt, target }) => cmd_image(&config, &prompt.join(" "), &target).await,
        Some(Command::Export { path }) => cmd_export(&config, path),
        Some(Command::Clear) => cmd_clear(&config),
        None => {
            let mut cmd = Cli::command().after_help(generate_after_help());
            cmd.print_help()?;
            Ok(())
        }
    }
}

fn open_controller(config: &Config) -> Result<PlanController> {
    debug!("open_controller: called");
    let root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let generator = create_generator(&config.plan, PromptLoader::new(root)).context("Failed to create plan generator")?;
    let store = SnapshotStore::open(&config.storage.path)
        .context(format!("Failed to open plan store at {}", config.storage.path.display()))?;
    Ok(PlanController::open(generator, store))
}

fn print_error(message: &str) {
    eprintln!("{} {}", "Error:".red().bold(), message);
}

async fn cmd_plan(config: &Config, profile: UserProfile) -> Result<()> {
    debug!(name = %profile.name, "cmd_plan: called");
    let mut controller = open_controller(config)?;
    println!("{}", "Generating your plan...".dimmed());
    if let Err(e) = controller.generate(profile).await.map(|s| render::print_plan(s, None)) {
        print_error(&e.to_string());
        return Err(e).context("Plan generation failed");
    }
    println!("{}", controller.quote().await.italic());
    Ok(())
}

async fn cmd_regenerate(config: &Config) -> Result<()> {
    debug!("cmd_regenerate: called");
    let mut controller = open_controller(config)?;
    println!("{}", "Regenerating your plan...".dimmed());
    let result = controller.regenerate().await.map(|s| render::print_plan(s, None));
    if let Err(e) = result {
        print_error(&e.to_string());
        if controller.current().is_some() {
            println!("{}", "Your previous plan is unchanged.".dimmed());
        }
        return Err(e).context("Plan regeneration failed");
    }
    Ok(())
}

fn cmd_show(config: &Config, section: Option<Section>) -> Result<()> {
    debug!(?section, "cmd_show: called");
    let controller = open_controller(config)?;
    match controller.current() {
        Some(snapshot) => render::print_plan(snapshot, section),
        None => println!("No saved plan. Run {} first.", "fc plan --name <you>".yellow()),
    }
    Ok(())
}

async fn cmd_quote(config: &Config) -> Result<()> {
    debug!("cmd_quote: called");
    let controller = open_controller(config)?;
    println!("{}", controller.quote().await);
    Ok(())
}

async fn cmd_image(config: &Config, prompt: &str, target: &str) -> Result<()> {
    debug!(%target, "cmd_image: called");
    let controller = ImageController::from_config(&config.image).context("Failed to create image service client")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, canceling image job");
            on_interrupt.cancel();
        }
    });

    println!("{}", "Generating image...".dimmed());
    match controller.generate(target, prompt, &cancel).await {
        ImageOutcome::Ready { url } => println!("{}", url),
        ImageOutcome::Placeholder { url, kind } => {
            println!("{}", url);
            println!(
                "{}",
                format!("Image generation unavailable ({}), showing a placeholder.", kind).dimmed()
            );
        }
        ImageOutcome::InFlight => println!("{}", "An image is already being generated.".dimmed()),
    }
    Ok(())
}

fn cmd_export(config: &Config, path: Option<PathBuf>) -> Result<()> {
    debug!(?path, "cmd_export: called");
    let controller = open_controller(config)?;
    let Some(snapshot) = controller.current() else {
        print_error("No saved plan to export.");
        return Err(eyre::eyre!("No saved plan to export"));
    };
    let path = path.unwrap_or_else(|| PathBuf::from(render::default_export_name(&snapshot.profile)));
    render::export_markdown(snapshot, &path)?;
    println!("Exported plan to {}", path.display().to_string().green());
    Ok(())
}

fn cmd_clear(config: &Config) -> Result<()> {
    debug!("cmd_clear: called");
    let mut controller = open_controller(config)?;
    controller.clear()?;
    println!("{}", "Saved plan cleared.".dimmed());
    Ok(())
}
