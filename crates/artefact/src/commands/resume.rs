//! Resume command - continue a generation from its checkpoint.

use anyhow::Result;
use artefact_pipeline::{OrchestrationError, ResumeBudget};
use artefact_remote::TaskKind;
use artefact_types::CalendarKey;
use clap::Args;
use console::Style;

use super::{Context, print_record};
use crate::app::{App, cancel_on_ctrl_c};

/// Arguments for the resume command.
#[derive(Args, Debug)]
pub struct ResumeArgs {
    /// Day to resume (YYYY-MM-DD)
    pub date: CalendarKey,

    /// Poll attempts for the image stage (overrides config)
    #[arg(long)]
    pub image_attempts: Option<u32>,

    /// Poll attempts for the model stage (overrides config)
    #[arg(long)]
    pub model_attempts: Option<u32>,
}

/// Run the resume command.
pub async fn run(args: ResumeArgs, ctx: &Context) -> Result<()> {
    let config = &ctx.loaded.config;
    let app = App::open(config)?;
    let orchestrator = app.orchestrator(config, cancel_on_ctrl_c())?;

    let budget = ResumeBudget {
        image_attempts: args.image_attempts,
        model_attempts: args.model_attempts,
    };
    match orchestrator.resume(args.date, budget).await {
        Ok(record) => print_record(&record, ctx),
        Err(e) => {
            if let OrchestrationError::Timeout { kind, task_id, .. } = &e
                && !ctx.json_output
            {
                let flag = match kind {
                    TaskKind::Image => "--image-attempts",
                    TaskKind::ImageToModel => "--model-attempts",
                };
                let dim = Style::new().dim();
                eprintln!(
                    "  {}",
                    dim.apply_to(format!(
                        "Task {task_id} is still running remotely. Resume again with a larger {flag}."
                    ))
                );
            }
            Err(e.into())
        }
    }
}
