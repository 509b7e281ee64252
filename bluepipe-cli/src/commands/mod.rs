//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod instance;
mod job;
mod lineage;

pub use job::{RunArgs, WaitArgs};

use anyhow::Result;
use clap::Subcommand;
use std::process::ExitCode;

use crate::config::Config;
use crate::signal::Signal;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Submit a job and wait for its instances to finish
    Run(RunArgs),
    /// Wait for instances that were started elsewhere
    Wait {
        /// Instance ids to follow
        #[arg(required = true)]
        instances: Vec<String>,

        #[command(flatten)]
        wait: WaitArgs,
    },
    /// Show the status of an instance
    Status {
        /// Instance id
        instance: String,
    },
    /// Stop a running instance
    Kill {
        /// Instance id
        instance: String,

        /// Reason recorded with the stop request
        #[arg(short, long)]
        message: Option<String>,
    },
    /// List the tables fed by a source table
    Lineage {
        /// Qualified source table name
        table: String,

        /// Restrict the search to one target system
        #[arg(long)]
        target: Option<String>,
    },
}

/// How a command ended, mapped onto the process exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Exit 0
    Success,
    /// Exit 2: the job could not be submitted, or a one-shot request failed
    RequestFailed,
    /// Exit 3: instances did not finish successfully within the timeout
    NotFinished,
    /// Exit 128 + signal number: terminated, tracked instances were killed
    Terminated(Signal),
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => ExitCode::SUCCESS,
            Outcome::RequestFailed => ExitCode::from(2),
            Outcome::NotFinished => ExitCode::from(3),
            Outcome::Terminated(signal) => ExitCode::from(signal.exit_code()),
        }
    }
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The resolved configuration
///
/// # Returns
/// How the command ended
pub async fn handle_command(command: Commands, config: &Config) -> Result<Outcome> {
    match command {
        Commands::Run(args) => job::run_job(args, config).await,
        Commands::Wait { instances, wait } => job::wait_instances(instances, wait, config).await,
        Commands::Status { instance } => instance::show_status(&instance, config).await,
        Commands::Kill { instance, message } => {
            instance::kill(&instance, message.as_deref(), config).await
        }
        Commands::Lineage { table, target } => {
            lineage::search(&table, target.as_deref(), config).await
        }
    }
}
