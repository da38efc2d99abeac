use std::process::ExitCode;

use clap::Parser;

use cron_runner::cli::{self, Cli, Command};
use cron_runner::config::RunnerConfig;
use cron_runner::jobs;
use cron_runner::loader::JobLoader;
use cron_runner::logging;
use cron_runner::runner::JobRunner;

/// Read the environment and install logging.
fn setup() -> cron_runner::Result<RunnerConfig> {
    let config = RunnerConfig::from_env()?;
    logging::init(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match setup() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let runner = JobRunner::from_config(&config);
    let loader = JobLoader::new(jobs::catalogue(&config));

    let outcome = match cli.command.unwrap_or(Command::Run) {
        Command::Run => cli::run(&runner, &loader, &config).await,
        Command::List { json } => cli::list(&runner, &loader, json).await,
        Command::Exec { id } => cli::exec(&runner, &loader, &id).await,
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Command failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
