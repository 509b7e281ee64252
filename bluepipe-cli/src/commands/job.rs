//! Job command handlers
//!
//! Submits a daily job run and follows its instances until they finish. A
//! termination signal received while waiting kills every tracked instance.

use anyhow::{Context, Result};
use bluepipe_client::{CompletionPolicy, JobClient, WaitOptions};
use bluepipe_core::domain::job::JobSubmission;
use chrono::{DateTime, Local, NaiveDate, TimeDelta, TimeZone, Utc};
use clap::Args;
use std::time::Duration;
use tracing::{error, warn};

use super::Outcome;
use crate::config::Config;
use crate::signal;

/// Distance between the read offset and the readiness threshold of a daily run
const READY_DELAY_MS: i64 = 86_460_000;

/// Options controlling how long and how to wait
#[derive(Args, Debug, Clone)]
pub struct WaitArgs {
    /// Give up after this many seconds (0 waits indefinitely)
    #[arg(long, default_value_t = 0)]
    pub timeout: u64,

    /// Succeed only if every instance finishes, not just one
    #[arg(long)]
    pub require_all: bool,

    /// Seconds between status polls
    #[arg(long, default_value_t = 3)]
    pub poll_interval: u64,
}

impl WaitArgs {
    fn options(&self) -> WaitOptions {
        let policy = if self.require_all {
            CompletionPolicy::AllFinished
        } else {
            CompletionPolicy::AnyFinished
        };

        WaitOptions::default()
            .with_poll_interval(Duration::from_secs(self.poll_interval))
            .with_timeout(Duration::from_secs(self.timeout))
            .with_policy(policy)
    }
}

/// Arguments of the `run` command
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Bluepipe job id
    #[arg(short, long)]
    pub job: String,

    /// Source table name, e.g. db.schema.table
    #[arg(short, long)]
    pub table: String,

    /// Data date in local time as YYYYMMDD (default: yesterday)
    #[arg(short, long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    #[command(flatten)]
    pub wait: WaitArgs,
}

/// Submit a job for one day of data and wait for it
pub async fn run_job(args: RunArgs, config: &Config) -> Result<Outcome> {
    let mut client = config.client()?;

    let date = args.date.unwrap_or_else(yesterday);
    let submission = daily_submission(args.job, args.table, date)?;

    match client.submit(&submission).await {
        Some(instances) if !instances.is_empty() => {}
        _ => {
            error!("Nothing started for {}", submission.describe());
            return Ok(Outcome::RequestFailed);
        }
    }

    wait_until_done(&mut client, &args.wait.options()).await
}

/// Attach to existing instances and wait for them
pub async fn wait_instances(
    instances: Vec<String>,
    args: WaitArgs,
    config: &Config,
) -> Result<Outcome> {
    let mut client = config.client()?;

    for instance in instances {
        if !client.track(instance.as_str()) {
            warn!("Ignoring instance ({})", instance);
        }
    }

    wait_until_done(&mut client, &args.options()).await
}

/// Wait for the tracked instances, or kill them if a termination signal arrives
async fn wait_until_done(client: &mut JobClient, options: &WaitOptions) -> Result<Outcome> {
    let signal = tokio::select! {
        finished = client.wait_finished(options) => {
            return Ok(if finished { Outcome::Success } else { Outcome::NotFinished });
        }
        signal = signal::termination() => {
            signal.context("Failed to listen for termination signals")?
        }
    };

    error!(
        "Got signal {} ({}), killing instances ...",
        signal.name(),
        signal.number()
    );

    let reason = format!("signal {} ({})", signal.name(), signal.number());
    client.shutdown(Some(&reason)).await;

    Ok(Outcome::Terminated(signal))
}

/// Submission reading one local calendar day
///
/// The read offset is local midnight of `date`; readiness is required a
/// little over a day later.
fn daily_submission(job: String, table: String, date: NaiveDate) -> Result<JobSubmission> {
    let offset = local_midnight(date)?;
    let ready = offset + TimeDelta::milliseconds(READY_DELAY_MS);

    Ok(JobSubmission::new(job, table)
        .with_offset(offset)
        .with_ready_offset(ready))
}

fn local_midnight(date: NaiveDate) -> Result<DateTime<Utc>> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .with_context(|| format!("Invalid date {}", date))?;

    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .with_context(|| format!("{} has no local midnight", date))
}

fn yesterday() -> NaiveDate {
    let today = Local::now().date_naive();
    today.pred_opt().unwrap_or(today)
}

fn parse_date(value: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y%m%d")
        .map_err(|e| format!("expected a date as YYYYMMDD: {}", e))
}
