//! Registration, lifecycle and lookup of jobs.

use std::sync::Arc;

use crate::error::RunnerError;
use crate::job::{JobConfig, JobFunction, TriggerKind};
use crate::schedule::{CronSchedule, ScheduleHandle, TriggerFn, parse_timezone};

use super::slot::ExecutionSlot;
use super::{JobInfo, JobRunner, RegisteredJob};

impl JobRunner {
    /// Register a job. Its schedule is validated and bound but not started.
    pub async fn register<F>(&self, config: JobConfig, executable: F) -> Result<(), RunnerError>
    where
        F: JobFunction + 'static,
    {
        self.register_shared(config, Arc::new(executable)).await
    }

    /// Register a job whose executable is already shared.
    pub async fn register_shared(
        &self,
        config: JobConfig,
        executable: Arc<dyn JobFunction>,
    ) -> Result<(), RunnerError> {
        let required = [("name", &config.name), ("cronExpression", &config.cron_expression)];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(RunnerError::MissingField {
                    name: config.name.clone(),
                    field: field.to_string(),
                });
            }
        }

        let timezone = match config.timezone.as_deref() {
            Some(tz) => parse_timezone(tz).map_err(|_| RunnerError::InvalidTimezone {
                name: config.name.clone(),
                timezone: tz.to_string(),
            })?,
            None => self.inner.default_timezone,
        };

        let schedule = CronSchedule::parse(&config.cron_expression, timezone).map_err(|e| {
            RunnerError::InvalidSchedule {
                name: config.name.clone(),
                expression: config.cron_expression.clone(),
                reason: e.to_string(),
            }
        })?;

        let mut table = self.inner.jobs.write().await;

        let conflict = if table.by_name.contains_key(&config.name) {
            Some(config.name.clone())
        } else {
            table
                .by_name
                .values()
                .find(|job| job.identity() == config.identity())
                .map(|_| config.identity().to_string())
        };
        if let Some(name) = conflict {
            return Err(RunnerError::DuplicateJob { name });
        }

        let handle = ScheduleHandle::new(schedule, self.trigger_for(&config.name));
        let name = config.name.clone();

        tracing::info!(
            job = %name,
            schedule = %config.cron_expression,
            timezone = %timezone,
            "Registered job"
        );

        table.order.push(name.clone());
        table.by_name.insert(
            name,
            Arc::new(RegisteredJob {
                config,
                timezone,
                executable,
                handle,
                slot: ExecutionSlot::new(),
            }),
        );

        Ok(())
    }

    /// Trigger callback for a job's schedule handle. Holds the runner weakly
    /// so the registry does not keep itself alive through its own handles.
    fn trigger_for(&self, name: &str) -> TriggerFn {
        let weak = Arc::downgrade(&self.inner);
        let name = name.to_string();

        Arc::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let runner = JobRunner { inner };
            let name = name.clone();
            tokio::spawn(async move {
                runner.dispatch(&name, TriggerKind::Schedule).await;
            });
        })
    }

    /// Start a job's schedule. Disabled jobs are left stopped with a warning.
    pub async fn start(&self, name: &str) -> Result<(), RunnerError> {
        let job = self.lookup(name).await?;
        self.start_job(&job);
        Ok(())
    }

    fn start_job(&self, job: &Arc<RegisteredJob>) -> bool {
        if !job.config.enabled {
            tracing::warn!(job = %job.name(), "Attempted to start disabled job");
            return false;
        }

        if !job.handle.start() {
            tracing::debug!(job = %job.name(), "Job already started");
            return false;
        }

        tracing::info!(
            job = %job.name(),
            next_fire = ?job.next_fire(),
            "Job started"
        );

        if job.config.run_on_init {
            let runner = self.clone();
            let name = job.name().to_string();
            tokio::spawn(async move {
                runner.dispatch(&name, TriggerKind::Init).await;
            });
        }

        true
    }

    /// Stop a job's schedule. Runs already in flight continue.
    pub async fn stop(&self, name: &str) -> Result<(), RunnerError> {
        let job = self.lookup(name).await?;
        if job.handle.stop() {
            tracing::info!(job = %name, "Job stopped");
        }
        Ok(())
    }

    /// Start every enabled job. Returns how many were newly started.
    ///
    /// A runner built with jobs globally disabled logs a warning and starts
    /// nothing. The binary checks the flag before calling this, so the check
    /// here covers library callers.
    pub async fn start_all(&self) -> usize {
        if !self.inner.jobs_enabled {
            tracing::warn!("Jobs are disabled by configuration, nothing started");
            return 0;
        }

        let started = self
            .snapshot()
            .await
            .iter()
            .filter(|job| job.config.enabled)
            .filter(|job| self.start_job(job))
            .count();

        tracing::info!(
            started,
            active = self.active_jobs_count().await,
            "Job runner started"
        );
        started
    }

    /// Stop every schedule. Returns how many were running.
    pub async fn stop_all(&self) -> usize {
        let stopped = self
            .snapshot()
            .await
            .iter()
            .filter(|job| job.handle.stop())
            .count();

        tracing::warn!(stopped, "All jobs stopped");
        stopped
    }

    /// Stop all schedules ahead of process exit. In-flight executions are
    /// neither awaited nor cancelled.
    pub async fn shutdown(&self) {
        tracing::warn!("Shutting down job runner");
        let stopped = self.stop_all().await;
        tracing::info!(stopped, "No new runs will be triggered; in-flight runs are not awaited");
    }

    /// Find a job by identity (`id`, falling back to `name`).
    pub async fn find_by_id(&self, id: &str) -> Option<Arc<RegisteredJob>> {
        self.inner
            .jobs
            .read()
            .await
            .by_name
            .values()
            .find(|job| job.identity() == id)
            .cloned()
    }

    /// Configuration snapshot of every job, in registration order.
    pub async fn jobs_info(&self) -> Vec<JobInfo> {
        self.snapshot()
            .await
            .iter()
            .map(|job| JobInfo {
                name: job.name().to_string(),
                identity: job.identity().to_string(),
                timezone: job.timezone().to_string(),
                next_fire: job.next_fire(),
                config: job.config.clone(),
            })
            .collect()
    }

    /// Number of enabled jobs.
    pub async fn active_jobs_count(&self) -> usize {
        self.inner
            .jobs
            .read()
            .await
            .by_name
            .values()
            .filter(|job| job.config.enabled)
            .count()
    }

    pub async fn len(&self) -> usize {
        self.inner.jobs.read().await.by_name.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
