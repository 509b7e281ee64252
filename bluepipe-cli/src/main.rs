//! Bluepipe CLI
//!
//! Command-line interface for starting Bluepipe jobs and following their
//! instances until they finish.
//!
//! Exit codes:
//! - 0: success
//! - 1: invalid arguments or configuration
//! - 2: a request to the server failed
//! - 3: instances did not finish successfully
//! - 128 + n: terminated by signal n, tracked instances were killed

mod commands;
mod config;
mod signal;

use anyhow::Result;
use bluepipe_client::ProtocolVersion;
use clap::Parser;
use commands::{Commands, Outcome, handle_command};
use config::{Config, Overrides};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "bluepipe")]
#[command(version, about = "Bluepipe job CLI", long_about = None)]
struct Cli {
    /// Read configuration from this file instead of searching for bluepipe.conf
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API endpoint, e.g. https://api.1stblue.cloud/api/v1
    #[arg(long, global = true, env = "BLUEPIPE_ENDPOINT")]
    endpoint: Option<String>,

    /// Access id
    #[arg(long, global = true, env = "BLUEPIPE_ACCESS_ID")]
    access_id: Option<String>,

    /// Access key used to sign requests
    #[arg(long, global = true, env = "BLUEPIPE_ACCESS_KEY", hide_env_values = true)]
    access_key: Option<String>,

    /// Protocol version spoken by the server (v1 or v2)
    #[arg(long, global = true, env = "BLUEPIPE_PROTOCOL")]
    protocol: Option<ProtocolVersion>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            endpoint: self.endpoint.clone(),
            access_id: self.access_id.clone(),
            access_key: self.access_key.clone(),
            protocol: self.protocol,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    // Logs go to stderr so command output on stdout stays parseable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli).await {
        Ok(outcome) => outcome.into(),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<Outcome> {
    let overrides = cli.overrides();
    let config = Config::load(cli.config.as_deref())?.with_overrides(overrides);
    config.validate()?;

    handle_command(cli.command, &config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "bluepipe",
            "run",
            "-j",
            "42",
            "-t",
            "db.orders",
            "-d",
            "20260115",
            "--require-all",
            "--protocol",
            "v1",
        ])
        .unwrap();

        assert_eq!(cli.protocol, Some(ProtocolVersion::V1));
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.job, "42");
                assert_eq!(args.table, "db.orders");
                assert!(args.date.is_some());
                assert!(args.wait.require_all);
                assert_eq!(args.wait.timeout, 0);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_date() {
        let result = Cli::try_parse_from(["bluepipe", "run", "-j", "42", "-t", "t", "-d", "tomorrow"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_wait_requires_instances() {
        assert!(Cli::try_parse_from(["bluepipe", "wait"]).is_err());
        assert!(Cli::try_parse_from(["bluepipe", "wait", "i-1", "i-2", "--timeout", "60"]).is_ok());
    }
}
