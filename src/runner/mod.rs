//! Job registry and execution engine.
//!
//! One [`JobRunner`] is built at process start and passed by value (it is a
//! cheap `Arc` clone) to the loader, the CLI commands and the shutdown path.
//!
//! - `registry`: registration, start/stop, lookup and snapshots
//! - `engine`: executing a job and dispatching its lifecycle callbacks
//! - `slot`: per-job overlap guard

mod engine;
mod registry;
mod slot;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::config::RunnerConfig;
use crate::error::RunnerError;
use crate::job::{JobConfig, JobFunction};
use crate::schedule::ScheduleHandle;

use slot::ExecutionSlot;

/// Registry and execution engine for scheduled jobs.
#[derive(Clone)]
pub struct JobRunner {
    inner: Arc<RunnerInner>,
}

struct RunnerInner {
    default_timezone: Tz,
    /// Master switch; when false `start_all` starts nothing.
    jobs_enabled: bool,
    jobs: RwLock<JobTable>,
}

/// Jobs keyed by name, plus registration order for listings.
#[derive(Default)]
struct JobTable {
    by_name: HashMap<String, Arc<RegisteredJob>>,
    order: Vec<String>,
}

/// A job owned by the registry.
pub struct RegisteredJob {
    config: JobConfig,
    timezone: Tz,
    executable: Arc<dyn JobFunction>,
    handle: ScheduleHandle,
    slot: ExecutionSlot,
}

impl RegisteredJob {
    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn identity(&self) -> &str {
        self.config.identity()
    }

    /// Resolved timezone (job setting or process default).
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Whether the schedule handle is currently started.
    pub fn is_scheduled(&self) -> bool {
        self.handle.is_active()
    }

    pub fn next_fire(&self) -> Option<DateTime<Utc>> {
        self.handle.schedule().upcoming()
    }
}

impl std::fmt::Debug for RegisteredJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredJob")
            .field("config", &self.config)
            .field("timezone", &self.timezone)
            .field("handle", &self.handle)
            .finish()
    }
}

/// Read-only snapshot of one registered job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInfo {
    pub name: String,
    pub identity: String,
    pub timezone: String,
    pub next_fire: Option<DateTime<Utc>>,
    pub config: JobConfig,
}

impl JobRunner {
    /// Create an empty runner. Jobs without a timezone use `default_timezone`.
    pub fn new(default_timezone: Tz) -> Self {
        Self::build(default_timezone, true)
    }

    pub fn from_config(config: &RunnerConfig) -> Self {
        Self::build(config.default_timezone, config.jobs_enabled)
    }

    fn build(default_timezone: Tz, jobs_enabled: bool) -> Self {
        Self {
            inner: Arc::new(RunnerInner {
                default_timezone,
                jobs_enabled,
                jobs: RwLock::new(JobTable::default()),
            }),
        }
    }

    pub fn default_timezone(&self) -> Tz {
        self.inner.default_timezone
    }

    pub fn jobs_enabled(&self) -> bool {
        self.inner.jobs_enabled
    }

    async fn lookup(&self, name: &str) -> Result<Arc<RegisteredJob>, RunnerError> {
        self.inner
            .jobs
            .read()
            .await
            .by_name
            .get(name)
            .cloned()
            .ok_or_else(|| RunnerError::NotFound(name.to_string()))
    }

    /// All jobs in registration order.
    async fn snapshot(&self) -> Vec<Arc<RegisteredJob>> {
        let table = self.inner.jobs.read().await;
        table
            .order
            .iter()
            .filter_map(|name| table.by_name.get(name).cloned())
            .collect()
    }
}
