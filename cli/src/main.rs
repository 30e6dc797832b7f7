//! clientsync command-line runner
//!
//! Usage:
//!   clientsync sync
//!   clientsync consume --limit 20
//!   clientsync monitor --topic client-sync
//!
//! Settings come from flags, falling back to `CLIENTSYNC_*` environment
//! variables. Logs go to stderr; summaries go to stdout.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use clientsync_cli::{
    format_report, run_consume, run_consume_from_bus, run_monitor, run_sync, Cli, Command,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    match cli.command.clone() {
        Command::Sync { json } => {
            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received, stopping after the current record");
                    on_signal.cancel();
                }
            });

            info!(primary = %cli.primary_db.display(), secondary = %cli.secondary_db.display(), "starting sync");
            let report = run_sync(&cli, cancel).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", format_report(&report));
            }
            Ok(if report.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Consume { limit, from_bus } => {
            let output = if from_bus {
                run_consume_from_bus(&cli, limit).await?
            } else {
                run_consume(&cli, limit).await?
            };
            println!("{output}");
            Ok(ExitCode::SUCCESS)
        }
        Command::Monitor => {
            println!("{}", run_monitor(&cli).await?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
