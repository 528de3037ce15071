//! Schedule command - generate today's artefact once a day at a fixed UTC time.

use anyhow::{Result, anyhow};
use artefact_pipeline::Orchestrator;
use artefact_types::CalendarKey;
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use tracing::{error, info};

use super::Context;
use crate::app::{App, cancel_on_ctrl_c};

/// Arguments for the schedule command.
#[derive(Args, Debug)]
pub struct ScheduleArgs {
    /// Also run once immediately on startup
    #[arg(long)]
    pub now: bool,
}

/// The first `hour:minute` UTC strictly after `now`.
fn next_run(now: DateTime<Utc>, hour: u32, minute: u32) -> Result<DateTime<Utc>> {
    let today = now
        .date_naive()
        .and_hms_opt(hour, minute, 0)
        .ok_or_else(|| anyhow!("invalid schedule time {hour:02}:{minute:02}"))?
        .and_utc();
    Ok(if today > now {
        today
    } else {
        today + Duration::days(1)
    })
}

async fn run_once(orchestrator: &Orchestrator) {
    let key = CalendarKey::today();
    match orchestrator.generate(key).await {
        Ok(record) => info!(key = %key, title = %record.title, "Scheduled generation finished"),
        Err(e) => error!(key = %key, error = %e, "Scheduled generation failed"),
    }
}

/// Run the schedule command. Returns on Ctrl-C.
pub async fn run(args: ScheduleArgs, ctx: &Context) -> Result<()> {
    let config = &ctx.loaded.config;
    let schedule = config.schedule_or_default();
    let app = App::open(config)?;
    let cancel = cancel_on_ctrl_c();
    let orchestrator = app.orchestrator(config, cancel.clone())?;

    if args.now {
        run_once(&orchestrator).await;
    }

    loop {
        let now = Utc::now();
        let next = next_run(now, schedule.hour, schedule.minute)?;
        let wait = (next - now).to_std().unwrap_or_default();
        info!(next = %next, "Next run scheduled");

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(wait) => {}
        }
        run_once(&orchestrator).await;
    }

    info!("Scheduler stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_next_run_later_today() {
        let now = Utc.with_ymd_and_hms(2024, 6, 2, 0, 1, 0).unwrap();
        let next = next_run(now, 0, 5).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 6, 2, 0, 5, 0).unwrap());
    }

    #[test]
    fn test_next_run_rolls_to_tomorrow() {
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 0, 5, 0).unwrap();
        let next = next_run(now, 0, 5).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 1, 1, 0, 5, 0).unwrap());
    }

    #[test]
    fn test_invalid_time() {
        assert!(next_run(Utc::now(), 24, 0).is_err());
    }
}
