//! Translate command - translate one day or backfill every missing day.

use anyhow::{Result, bail};
use artefact_types::CalendarKey;
use clap::Args;
use console::Style;
use serde::Serialize;

use super::{Context, print_record};
use crate::app::{App, cancel_on_ctrl_c};

/// Arguments for the translate command.
#[derive(Args, Debug)]
pub struct TranslateArgs {
    /// Day to translate (YYYY-MM-DD)
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub date: Option<CalendarKey>,

    /// Translate every completed day that has no translations
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, Serialize)]
struct OutcomeOutput {
    date: String,
    languages: Option<usize>,
    error: Option<String>,
}

/// Run the translate command.
pub async fn run(args: TranslateArgs, ctx: &Context) -> Result<()> {
    let config = &ctx.loaded.config;
    let app = App::open(config)?;
    let orchestrator = app.orchestrator(config, cancel_on_ctrl_c())?;

    if let Some(key) = args.date {
        let record = orchestrator.translate(key).await?;
        return print_record(&record, ctx);
    }

    let outcomes = orchestrator.translate_missing().await?;
    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();

    if ctx.json_output {
        let output: Vec<OutcomeOutput> = outcomes
            .iter()
            .map(|o| OutcomeOutput {
                date: o.key.to_string(),
                languages: o.result.as_ref().ok().copied(),
                error: o.result.as_ref().err().map(|e| e.to_string()),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if outcomes.is_empty() {
        println!("Every completed day is already translated.");
    } else {
        let green = Style::new().green();
        let red = Style::new().red();
        for outcome in &outcomes {
            match &outcome.result {
                Ok(n) => println!("  {} {} ({n} languages)", green.apply_to("✓"), outcome.key),
                Err(e) => println!("  {} {} {}", red.apply_to("✗"), outcome.key, e),
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} translations failed", outcomes.len());
    }
    Ok(())
}
