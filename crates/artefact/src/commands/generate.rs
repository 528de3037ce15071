//! Generate command - produce (or resume) the artefact for one day.

use anyhow::Result;
use artefact_types::CalendarKey;
use clap::Args;

use super::{Context, print_record};
use crate::app::{App, cancel_on_ctrl_c};

/// Arguments for the generate command.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Day to generate (YYYY-MM-DD, default: today in UTC)
    #[arg(long)]
    pub date: Option<CalendarKey>,
}

/// Run the generate command.
pub async fn run(args: GenerateArgs, ctx: &Context) -> Result<()> {
    let config = &ctx.loaded.config;
    let key = args.date.unwrap_or_else(CalendarKey::today);

    let app = App::open(config)?;
    let orchestrator = app.orchestrator(config, cancel_on_ctrl_c())?;
    let record = orchestrator.generate(key).await?;

    print_record(&record, ctx)
}
