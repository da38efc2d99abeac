//! Command-line interface: daemon, listing and manual execution.

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::config::RunnerConfig;
use crate::display::{print_heading, print_table, render_table};
use crate::loader::JobLoader;
use crate::runner::{JobInfo, JobRunner};

/// Recurring job runner.
#[derive(Debug, Parser)]
#[command(name = "cron-runner")]
#[command(about = "Run scheduled jobs from the built-in catalogue")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start every enabled job and run until interrupted (default)
    Run,

    /// Show the catalogue and the configuration of every job
    List {
        /// Print the job snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Execute one job immediately and report the result
    Exec {
        /// Job id (or name when the job has no explicit id)
        id: String,
    },
}

/// Daemon mode. Returns once a shutdown signal is received.
pub async fn run(
    runner: &JobRunner,
    loader: &JobLoader,
    config: &RunnerConfig,
) -> anyhow::Result<ExitCode> {
    if !runner.jobs_enabled() {
        tracing::warn!("Jobs are disabled (JOBS_ENABLED=false), exiting");
        return Ok(ExitCode::SUCCESS);
    }

    loader.load_all(runner).await;

    if runner.active_jobs_count().await == 0 {
        tracing::warn!("No enabled jobs to run, exiting");
        return Ok(ExitCode::SUCCESS);
    }

    let started = runner.start_all().await;
    tracing::info!(
        started,
        timezone = %config.default_timezone,
        log_dir = %config.log_dir.display(),
        "Cron runner up, press Ctrl+C to stop"
    );

    shutdown_signal().await;
    runner.shutdown().await;
    Ok(ExitCode::SUCCESS)
}

/// Resolve on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}

/// Print the catalogue, the configuration tables and a summary.
pub async fn list(runner: &JobRunner, loader: &JobLoader, json: bool) -> anyhow::Result<ExitCode> {
    let available = loader.available();
    loader.load_all(runner).await;
    let jobs = runner.jobs_info().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&jobs)?);
        return Ok(ExitCode::SUCCESS);
    }

    if available.is_empty() {
        println!("No jobs in the catalogue");
        return Ok(ExitCode::SUCCESS);
    }

    print_heading("Catalogue");
    let rows: Vec<Vec<String>> = available
        .iter()
        .map(|a| {
            vec![
                a.directory.clone(),
                if a.ready { "Ready" } else { "Not Ready" }.to_string(),
            ]
        })
        .collect();
    print_table(&["Job Directory", "Status"], &rows);

    print_heading("Job configuration");
    print_table(
        &["Job Name", "Schedule", "Timezone", "Status", "Description"],
        &configuration_rows(&jobs),
    );

    let advanced = advanced_rows(&jobs);
    if !advanced.is_empty() {
        print_heading("Advanced configuration");
        print_table(&["Job Name", "Run on Init", "Max Retries", "Retry Delay"], &advanced);
    }

    let enabled = jobs.iter().filter(|j| j.config.enabled).count();
    let ready = available.iter().filter(|a| a.ready).count();
    print_heading("Summary");
    print_table(
        &["Metric", "Count"],
        &[
            vec!["Total Jobs".to_string(), jobs.len().to_string()],
            vec!["Enabled".to_string(), enabled.to_string()],
            vec!["Disabled".to_string(), (jobs.len() - enabled).to_string()],
            vec!["Ready to Run".to_string(), ready.to_string()],
        ],
    );

    Ok(ExitCode::SUCCESS)
}

/// Execute one job by id and print its result.
pub async fn exec(runner: &JobRunner, loader: &JobLoader, id: &str) -> anyhow::Result<ExitCode> {
    loader.load_all(runner).await;

    let Some(job) = runner.find_by_id(id).await else {
        eprintln!("Job '{id}' not found");
        let jobs = runner.jobs_info().await;
        if !jobs.is_empty() {
            print_heading("Available jobs");
            print!("{}", available_jobs_table(&jobs));
        }
        return Ok(ExitCode::FAILURE);
    };

    println!(
        "Executing {} (id: {}, {})",
        job.name(),
        job.identity(),
        job.config().description().unwrap_or("No description")
    );

    let result = runner.execute_job_by_id(id).await?;

    if result.success {
        println!("Job completed successfully in {}ms", result.execution_millis());
        if let Some(message) = &result.message {
            println!("Message: {message}");
        }
        if let Some(data) = &result.data {
            print_heading("Result data");
            println!("{}", serde_json::to_string_pretty(data)?);
        }
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!(
            "Job failed after {}ms: {}",
            result.execution_millis(),
            result.message.as_deref().unwrap_or("no message")
        );
        if let Some(error) = result.error_message() {
            eprintln!("Error: {error}");
        }
        Ok(ExitCode::FAILURE)
    }
}

fn configuration_rows(jobs: &[JobInfo]) -> Vec<Vec<String>> {
    jobs.iter()
        .map(|j| {
            vec![
                j.name.clone(),
                j.config.cron_expression.clone(),
                j.config.timezone.clone().unwrap_or_else(|| "Default".to_string()),
                if j.config.enabled { "Enabled" } else { "Disabled" }.to_string(),
                j.config.description().unwrap_or("No description").to_string(),
            ]
        })
        .collect()
}

fn advanced_rows(jobs: &[JobInfo]) -> Vec<Vec<String>> {
    jobs.iter()
        .filter(|j| {
            j.config.run_on_init || j.config.max_retries.is_some() || j.config.retry_delay.is_some()
        })
        .map(|j| {
            vec![
                j.name.clone(),
                if j.config.run_on_init { "Yes" } else { "No" }.to_string(),
                j.config
                    .max_retries
                    .map_or_else(|| "Default".to_string(), |n| n.to_string()),
                j.config.retry_delay.map_or_else(
                    || "Default".to_string(),
                    |d: Duration| format!("{}ms", d.as_millis()),
                ),
            ]
        })
        .collect()
}

fn available_jobs_table(jobs: &[JobInfo]) -> String {
    let rows: Vec<Vec<String>> = jobs
        .iter()
        .map(|j| {
            vec![
                j.identity.clone(),
                j.name.clone(),
                j.config.description().unwrap_or("No description").to_string(),
            ]
        })
        .collect();
    render_table(&["ID", "Name", "Description"], &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Tz;

    use crate::job::{JobConfig, JobExecutionContext, JobMetadata, JobResult};

    async fn noop(_ctx: JobExecutionContext) -> anyhow::Result<JobResult> {
        Ok(JobResult::success())
    }

    async fn sample() -> Vec<JobInfo> {
        let runner = JobRunner::new(Tz::UTC);
        runner
            .register(
                JobConfig::new("daily-report", "0 9 * * 1-5")
                    .with_id("report")
                    .with_metadata(JobMetadata::new("Daily report")),
                noop,
            )
            .await
            .unwrap();
        runner
            .register(
                JobConfig::new("cleanup", "0 2 * * *")
                    .with_enabled(false)
                    .with_retries(3, Duration::from_secs(5)),
                noop,
            )
            .await
            .unwrap();
        runner.jobs_info().await
    }

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["cron-runner"]).unwrap();
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["cron-runner", "list", "--json"]).unwrap();
        assert!(matches!(cli.command, Some(Command::List { json: true })));

        let cli = Cli::try_parse_from(["cron-runner", "exec", "report"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Exec { ref id }) if id == "report"));

        assert!(Cli::try_parse_from(["cron-runner", "exec"]).is_err());
    }

    #[tokio::test]
    async fn configuration_table_rows() {
        let rows = configuration_rows(&sample().await);
        assert_eq!(rows[0], ["daily-report", "0 9 * * 1-5", "Default", "Enabled", "Daily report"]);
        assert_eq!(rows[1][3], "Disabled");
        assert_eq!(rows[1][4], "No description");
    }

    #[tokio::test]
    async fn advanced_rows_only_for_tuned_jobs() {
        let rows = advanced_rows(&sample().await);
        assert_eq!(rows, vec![vec!["cleanup", "No", "3", "5000ms"]]);
    }

    #[tokio::test]
    async fn available_jobs_lists_identity() {
        let table = available_jobs_table(&sample().await);
        assert!(table.contains("│ report "));
        assert!(table.contains("│ cleanup "));
    }

    #[tokio::test]
    async fn exec_unknown_id_fails() {
        let runner = JobRunner::new(Tz::UTC);
        let code = exec(&runner, &JobLoader::default(), "ghost").await.unwrap();
        assert_eq!(code, ExitCode::FAILURE);
    }
}
