//! Courier CLI.
//!
//! Main entry point for the `courier` binary.

use std::process::ExitCode;

use clap::Parser;
use courier_cli::cli::Cli;
use courier_cli::CliError;
use courier_common_async::{build_runtime, RuntimeConfig};
use tracing::error;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = courier_common_log::init(cli.log_config()) {
        eprintln!("warning: {e}");
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(code = e.status(), "{e}");
            eprintln!("error: {e}");
            e.exit_code()
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = cli.load_config()?;

    let runtime = build_runtime(RuntimeConfig {
        worker_threads: config.runtime.worker_threads,
        thread_name: config.runtime.thread_name.clone(),
        ..RuntimeConfig::default()
    })
    .map_err(|e| CliError::Other(anyhow::Error::new(e).context("failed to start runtime")))?;

    runtime.block_on(cli.command.execute(&config))
}
