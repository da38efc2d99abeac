//! Nightly sweep of stale temporary files.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use serde_json::json;

use crate::job::{JobCallbacks, JobConfig, JobExecutionContext, JobFunction, JobMetadata, JobResult};
use crate::loader::JobModule;

pub fn config() -> JobConfig {
    JobConfig::new("example-cleanup", "0 2 * * *")
        .with_timezone("America/Mexico_City")
        .with_retries(3, Duration::from_secs(5))
        .with_callbacks(Arc::new(CleanupCallbacks))
        .with_metadata(
            JobMetadata::new("Removes old temporary files")
                .with_author("cron-runner")
                .with_version("1.0.0"),
        )
}

pub fn module(directory: PathBuf, max_age: Duration) -> JobModule {
    JobModule::new("example-cleanup", config(), Cleanup { directory, max_age })
}

pub struct Cleanup {
    pub directory: PathBuf,
    pub max_age: Duration,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Sweep {
    deleted_files: u64,
    total_size_bytes: u64,
}

impl Cleanup {
    async fn sweep(&self, job: &str) -> std::io::Result<Sweep> {
        let mut sweep = Sweep::default();

        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(
                    job,
                    directory = %self.directory.display(),
                    "Cleanup directory does not exist"
                );
                return Ok(sweep);
            }
            Err(e) => return Err(e),
        };

        let now = SystemTime::now();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let removed = async {
                let meta = entry.metadata().await?;
                if !meta.is_file() {
                    return Ok(None);
                }
                let age = now.duration_since(meta.modified()?).unwrap_or_default();
                if age <= self.max_age {
                    return Ok(None);
                }
                tokio::fs::remove_file(&path).await?;
                Ok::<_, std::io::Error>(Some(meta.len()))
            }
            .await;

            match removed {
                Ok(Some(size)) => {
                    sweep.deleted_files += 1;
                    sweep.total_size_bytes += size;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        job,
                        path = %path.display(),
                        error = %e,
                        "Could not process file"
                    );
                }
            }
        }

        Ok(sweep)
    }
}

#[async_trait]
impl JobFunction for Cleanup {
    async fn run(&self, ctx: JobExecutionContext) -> anyhow::Result<JobResult> {
        let max_age_days = self.max_age.as_secs() / 86_400;

        match self.sweep(&ctx.job_name).await {
            Ok(sweep) => {
                let mb = sweep.total_size_bytes as f64 / 1024.0 / 1024.0;
                Ok(JobResult::success()
                    .with_message(format!(
                        "deleted {} files, freed {mb:.2} MB",
                        sweep.deleted_files
                    ))
                    .with_data(json!({
                        "deletedFiles": sweep.deleted_files,
                        "totalSizeBytes": sweep.total_size_bytes,
                        "directory": self.directory.display().to_string(),
                        "maxAgeDays": max_age_days,
                    })))
            }
            Err(e) => Ok(JobResult::failure(
                anyhow::Error::new(e).context(format!("sweeping {}", self.directory.display())),
            )
            .with_message("temporary file cleanup failed")),
        }
    }
}

struct CleanupCallbacks;

#[async_trait]
impl JobCallbacks for CleanupCallbacks {
    async fn on_success(
        &self,
        result: &JobResult,
        ctx: &JobExecutionContext,
    ) -> anyhow::Result<()> {
        tracing::info!(
            job = %ctx.job_name,
            summary = result.message.as_deref().unwrap_or(""),
            "Cleanup completed"
        );
        Ok(())
    }

    async fn on_error(
        &self,
        error: &anyhow::Error,
        ctx: &JobExecutionContext,
    ) -> anyhow::Result<()> {
        tracing::error!(job = %ctx.job_name, error = %format!("{error:#}"), "Cleanup failed");
        Ok(())
    }

    async fn on_complete(
        &self,
        result: &JobResult,
        ctx: &JobExecutionContext,
    ) -> anyhow::Result<()> {
        tracing::info!(
            job = %ctx.job_name,
            elapsed_ms = result.execution_millis() as u64,
            "Cleanup finished"
        );
        Ok(())
    }
}
