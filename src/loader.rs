//! Job catalogue loading.
//!
//! A [`JobModule`] pairs a configuration with its executable. The
//! [`JobLoader`] validates each module of a catalogue and registers it with a
//! [`JobRunner`]; one bad module is logged and skipped, never fatal.

use std::sync::Arc;

use serde::Serialize;

use crate::error::RunnerError;
use crate::job::{JobConfig, JobFunction};
use crate::runner::JobRunner;

/// One loadable job.
#[derive(Clone)]
pub struct JobModule {
    /// Catalogue key the module is listed under.
    pub directory: String,
    pub config: JobConfig,
    pub executable: Arc<dyn JobFunction>,
}

impl JobModule {
    pub fn new<F>(directory: impl Into<String>, config: JobConfig, executable: F) -> Self
    where
        F: JobFunction + 'static,
    {
        Self {
            directory: directory.into(),
            config,
            executable: Arc::new(executable),
        }
    }

    /// Structural checks run before registration.
    pub fn validate(&self) -> Result<(), RunnerError> {
        if self.config.name.trim().is_empty() {
            return Err(RunnerError::MissingField {
                name: self.directory.clone(),
                field: "name".to_string(),
            });
        }
        if self.config.cron_expression.trim().is_empty() {
            return Err(RunnerError::MissingField {
                name: self.config.name.clone(),
                field: "cronExpression".to_string(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for JobModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobModule")
            .field("directory", &self.directory)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Catalogue entry as reported by [`JobLoader::available`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableJob {
    pub directory: String,
    pub ready: bool,
}

/// What happened when a catalogue was loaded.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Names of registered jobs, in catalogue order.
    pub loaded: Vec<String>,
    /// Catalogue key and reason for every module that was skipped.
    pub failed: Vec<(String, RunnerError)>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Ordered catalogue of job modules.
#[derive(Debug, Default)]
pub struct JobLoader {
    modules: Vec<JobModule>,
}

impl JobLoader {
    pub fn new(modules: Vec<JobModule>) -> Self {
        Self { modules }
    }

    pub fn modules(&self) -> &[JobModule] {
        &self.modules
    }

    /// Every catalogue entry and whether it passes validation.
    pub fn available(&self) -> Vec<AvailableJob> {
        self.modules
            .iter()
            .map(|m| AvailableJob {
                directory: m.directory.clone(),
                ready: m.validate().is_ok(),
            })
            .collect()
    }

    /// Validate and register every module with `runner`.
    pub async fn load_all(&self, runner: &JobRunner) -> LoadReport {
        tracing::info!(count = self.modules.len(), "Loading job catalogue");
        let mut report = LoadReport::default();

        for module in &self.modules {
            let registered = match module.validate() {
                Ok(()) => {
                    runner
                        .register_shared(module.config.clone(), Arc::clone(&module.executable))
                        .await
                }
                Err(e) => Err(e),
            };

            match registered {
                Ok(()) => {
                    tracing::info!(
                        directory = %module.directory,
                        job = %module.config.name,
                        "Loaded job"
                    );
                    report.loaded.push(module.config.name.clone());
                }
                Err(e) if e.is_configuration() => {
                    tracing::error!(
                        directory = %module.directory,
                        error = %e,
                        "Failed to load job"
                    );
                    report.failed.push((module.directory.clone(), e));
                }
                Err(e) => {
                    tracing::warn!(directory = %module.directory, error = %e, "Skipped job");
                    report.failed.push((module.directory.clone(), e));
                }
            }
        }

        tracing::info!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            active = runner.active_jobs_count().await,
            "Job catalogue loaded"
        );
        report
    }
}
