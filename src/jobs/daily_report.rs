//! Weekday morning report written as JSON to the reports directory.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::job::{JobCallbacks, JobConfig, JobExecutionContext, JobFunction, JobMetadata, JobResult};
use crate::loader::JobModule;

pub fn config() -> JobConfig {
    JobConfig::new("daily-report", "0 9 * * 1-5")
        .with_id("report")
        .with_timezone("America/Mexico_City")
        .with_callbacks(Arc::new(ReportCallbacks))
        .with_metadata(
            JobMetadata::new("Generates the daily system activity report")
                .with_author("cron-runner")
                .with_version("1.0.0")
                .with_tags(["reports", "daily", "analytics"]),
        )
}

pub fn module(reports_dir: PathBuf) -> JobModule {
    JobModule::new("daily-report", config(), DailyReport { reports_dir })
}

pub struct DailyReport {
    pub reports_dir: PathBuf,
}

#[async_trait]
impl JobFunction for DailyReport {
    async fn run(&self, ctx: JobExecutionContext) -> anyhow::Result<JobResult> {
        let report_date = ctx.local_start_time().format("%Y-%m-%d").to_string();
        let report_path = self.reports_dir.join(format!("daily-report-{report_date}.json"));

        let report = json!({
            "date": report_date,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "timezone": ctx.timezone.name(),
            "generatedBy": ctx.job_name,
            "generatedAt": ctx.start_time.to_rfc3339(),
            "runId": ctx.run_id,
            "trigger": ctx.trigger.to_string(),
            "host": {
                "os": std::env::consts::OS,
                "arch": std::env::consts::ARCH,
                "runnerVersion": env!("CARGO_PKG_VERSION"),
            },
        });
        let content = serde_json::to_string_pretty(&report)?;

        let written = async {
            tokio::fs::create_dir_all(&self.reports_dir).await?;
            tokio::fs::write(&report_path, &content).await
        }
        .await;

        if let Err(e) = written {
            return Ok(JobResult::failure(
                anyhow::Error::new(e).context(format!("writing {}", report_path.display())),
            )
            .with_message("failed to generate daily report"));
        }

        Ok(JobResult::success()
            .with_message(format!("daily report generated for {report_date}"))
            .with_data(json!({
                "reportPath": report_path.display().to_string(),
                "reportDate": report_date,
                "fileSize": content.len(),
            })))
    }
}

struct ReportCallbacks;

#[async_trait]
impl JobCallbacks for ReportCallbacks {
    async fn on_success(
        &self,
        result: &JobResult,
        ctx: &JobExecutionContext,
    ) -> anyhow::Result<()> {
        let path = result
            .data
            .as_ref()
            .and_then(|d| d["reportPath"].as_str())
            .unwrap_or("unknown");
        tracing::info!(job = %ctx.job_name, path, "Daily report generated");
        Ok(())
    }

    async fn on_error(
        &self,
        error: &anyhow::Error,
        ctx: &JobExecutionContext,
    ) -> anyhow::Result<()> {
        tracing::error!(job = %ctx.job_name, error = %format!("{error:#}"), "Daily report failed");
        Ok(())
    }
}
