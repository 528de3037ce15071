//! Dates command - list days with a completed artefact.

use anyhow::Result;
use clap::Args;

use super::Context;
use crate::app::App;

/// Arguments for the dates command.
#[derive(Args, Debug)]
pub struct DatesArgs {
    /// Show at most this many days
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

/// Run the dates command.
pub async fn run(args: DatesArgs, ctx: &Context) -> Result<()> {
    let app = App::open(&ctx.loaded.config)?;
    let mut keys = app.repo.completed_keys()?;
    if let Some(limit) = args.limit {
        keys.truncate(limit);
    }

    if ctx.json_output {
        let dates: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        println!("{}", serde_json::to_string_pretty(&dates)?);
    } else if keys.is_empty() {
        println!("No completed artefacts yet.");
    } else {
        for key in keys {
            println!("{key}");
        }
    }
    Ok(())
}
