//! Show command - display an artefact with its neighbours.

use anyhow::Result;
use artefact_types::CalendarKey;
use clap::Args;
use console::Style;

use super::{Context, print_record};
use crate::app::App;

/// Arguments for the show command.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Day to show (YYYY-MM-DD, default: latest completed)
    pub date: Option<CalendarKey>,
}

/// Run the show command.
pub async fn run(args: ShowArgs, ctx: &Context) -> Result<()> {
    let app = App::open(&ctx.loaded.config)?;

    let Some(nav) = app.repo.navigation(args.date)? else {
        if ctx.json_output {
            println!("null");
        } else {
            match args.date {
                Some(key) => println!("No completed artefact for {key}."),
                None => println!("No completed artefacts yet."),
            }
        }
        return Ok(());
    };

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&nav.to_json())?);
        return Ok(());
    }

    print_record(&nav.record, ctx)?;
    let dim = Style::new().dim();
    let prev = nav.prev.map_or("-".to_string(), |k| k.to_string());
    let next = nav.next.map_or("-".to_string(), |k| k.to_string());
    println!("  {} {}   {} {}", dim.apply_to("← prev"), prev, dim.apply_to("next →"), next);
    println!();
    Ok(())
}
