//! Per-execution context handed to job bodies and callbacks.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use super::{JobConfig, JobMetadata};

/// What caused an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    /// The job's cron schedule fired.
    Schedule,
    /// `run_on_init` fired when the job was started.
    Init,
    /// Invoked by hand (CLI or API).
    Manual,
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerKind::Schedule => write!(f, "schedule"),
            TriggerKind::Init => write!(f, "init"),
            TriggerKind::Manual => write!(f, "manual"),
        }
    }
}

/// Read-only information about one execution. Built fresh for every run.
#[derive(Debug, Clone)]
pub struct JobExecutionContext {
    /// Unique per execution, for correlating log lines.
    pub run_id: Uuid,
    pub job_name: String,
    pub start_time: DateTime<Utc>,
    pub timezone: Tz,
    pub trigger: TriggerKind,
    pub metadata: JobMetadata,
}

impl JobExecutionContext {
    pub fn new(config: &JobConfig, timezone: Tz, trigger: TriggerKind) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            job_name: config.name.clone(),
            start_time: Utc::now(),
            timezone,
            trigger,
            metadata: config.metadata.clone(),
        }
    }

    /// Start time in the job's timezone.
    pub fn local_start_time(&self) -> DateTime<Tz> {
        self.start_time.with_timezone(&self.timezone)
    }
}
