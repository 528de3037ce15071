//! Artefact - one generated keepsake per calendar day
//!
//! Main entry point for the operator CLI and the daily scheduler.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod app;
mod commands;

use commands::{config, dates, generate, regenerate, resume, schedule, show, translate};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Artefact - one generated keepsake per calendar day
#[derive(Parser)]
#[command(name = "artefact")]
#[command(author, version, about = "Artefact - one generated keepsake per calendar day", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// User configuration directory
    #[arg(long, global = true, env = "ARTEFACT_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate the artefact for a day (resumes if one is in flight)
    Generate(generate::GenerateArgs),

    /// Delete a day's artefact and generate it again
    Regenerate(regenerate::RegenerateArgs),

    /// Resume an interrupted or timed-out generation
    Resume(resume::ResumeArgs),

    /// Translate one day, or every day missing translations
    Translate(translate::TranslateArgs),

    /// Show an artefact and its neighbours
    Show(show::ShowArgs),

    /// List days with a completed artefact
    Dates(dates::DatesArgs),

    /// Run the daily generation on a schedule
    Schedule(schedule::ScheduleArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = artefact_config::load_config_with_options(None, cli.config_dir.as_deref())?;

    // Console (human-readable) + daily-rolling JSON file
    let filter = if cli.verbose {
        "artefact=debug,artefact_pipeline=debug,artefact_remote=debug,artefact_store=debug,artefact_cache=debug,artefact_config=debug,info"
    } else {
        "artefact=info,artefact_pipeline=info,artefact_remote=info,artefact_store=info,warn"
    };

    let logging = loaded.config.logging_or_default();
    let (file_writer, _guard) = match logging.resolve_directory().filter(|_| logging.file) {
        Some(log_dir) => {
            let file_appender = tracing_appender::rolling::daily(&log_dir, "artefact.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            (Some(non_blocking), Some(guard))
        }
        None => (None, None),
    };

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(file_writer.map(|writer| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "artefact=trace,artefact_pipeline=trace,artefact_remote=trace,artefact_store=trace,artefact_cache=trace,artefact_config=trace,info",
                ))
        }))
        .init();

    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }

    let ctx = commands::Context {
        json_output: cli.json,
        verbose: cli.verbose,
        config_dir: cli.config_dir,
        loaded,
    };

    match cli.command {
        Commands::Generate(args) => generate::run(args, &ctx).await,
        Commands::Regenerate(args) => regenerate::run(args, &ctx).await,
        Commands::Resume(args) => resume::run(args, &ctx).await,
        Commands::Translate(args) => translate::run(args, &ctx).await,
        Commands::Show(args) => show::run(args, &ctx).await,
        Commands::Dates(args) => dates::run(args, &ctx).await,
        Commands::Schedule(args) => schedule::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
