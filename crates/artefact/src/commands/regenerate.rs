//! Regenerate command - delete a day's artefact and start over.

use anyhow::Result;
use artefact_types::CalendarKey;
use clap::Args;

use super::{Context, print_record};
use crate::app::{App, cancel_on_ctrl_c};

/// Arguments for the regenerate command.
#[derive(Args, Debug)]
pub struct RegenerateArgs {
    /// Day to regenerate (YYYY-MM-DD)
    pub date: CalendarKey,
}

/// Run the regenerate command.
pub async fn run(args: RegenerateArgs, ctx: &Context) -> Result<()> {
    let config = &ctx.loaded.config;
    let app = App::open(config)?;
    let orchestrator = app.orchestrator(config, cancel_on_ctrl_c())?;

    let record = orchestrator.regenerate(args.date).await?;
    print_record(&record, ctx)
}
