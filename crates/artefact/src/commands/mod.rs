//! CLI command handlers.

use std::path::PathBuf;

use anyhow::Result;
use artefact_config::LoadedConfig;
use artefact_types::{ArtefactRecord, ArtefactStatus};
use console::{Style, style};

pub mod config;
pub mod dates;
pub mod generate;
pub mod regenerate;
pub mod resume;
pub mod schedule;
pub mod show;
pub mod translate;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Explicit user config directory, if given.
    pub config_dir: Option<PathBuf>,
    /// Merged configuration and where it came from.
    pub loaded: LoadedConfig,
}

fn status_style(status: ArtefactStatus) -> Style {
    match status {
        ArtefactStatus::Completed => Style::new().green(),
        ArtefactStatus::Failed => Style::new().red(),
        ArtefactStatus::Generating | ArtefactStatus::Pending => Style::new().yellow(),
    }
}

/// Print one record, as JSON or as a short human summary.
pub fn print_record(record: &ArtefactRecord, ctx: &Context) -> Result<()> {
    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(record)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!();
    println!("{}", style(&record.title).bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!("  {} {}", dim.apply_to("Date:"), record.key);
    println!(
        "  {} {}",
        dim.apply_to("Status:"),
        status_style(record.status).apply_to(format!("● {}", record.status))
    );
    println!(
        "  {} {} ({:.2}, {:.2})",
        dim.apply_to("Where:"),
        record.location_name,
        record.latitude,
        record.longitude
    );
    println!("  {} {}", dim.apply_to("Source:"), record.source_event);
    if !record.asset_ref.is_empty() {
        println!("  {} {}", dim.apply_to("Asset:"), record.asset_ref);
    }
    if let Some(translations) = &record.translations {
        let languages: Vec<&str> = translations.languages().collect();
        println!("  {} {}", dim.apply_to("Languages:"), languages.join(", "));
    }
    if ctx.verbose {
        println!();
        println!("  {}", record.description);
        if let Some(state) = &record.pipeline_state {
            println!("  {} {}", dim.apply_to("Checkpoint:"), state);
        }
    }
    println!();
    Ok(())
}
