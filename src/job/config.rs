//! Job configuration.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::JobCallbacks;

/// Delay between retry attempts when a job sets `max_retries` without a delay.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// What happens when a job fires while a previous run is still executing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Reject the new firing.
    #[default]
    Skip,
    /// Hold one pending firing until the running one finishes; reject the rest.
    Queue,
    /// Run concurrently.
    Allow,
}

impl std::fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverlapPolicy::Skip => write!(f, "skip"),
            OverlapPolicy::Queue => write!(f, "queue"),
            OverlapPolicy::Allow => write!(f, "allow"),
        }
    }
}

/// Free-form descriptive data. Passed through to the execution context,
/// never interpreted by the runner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl JobMetadata {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Default::default()
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Configuration of a single job. Immutable once registered.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobConfig {
    /// Display label, also the key the registry stores the job under.
    pub name: String,
    /// Explicit identity for manual invocation. Falls back to `name`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub cron_expression: String,
    /// IANA timezone. Falls back to the process-wide default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    pub enabled: bool,
    /// Fire once immediately when started, in addition to the schedule.
    pub run_on_init: bool,
    /// Additional attempts after a failed one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_delay: Option<Duration>,
    pub overlap: OverlapPolicy,
    #[serde(skip)]
    pub callbacks: Option<Arc<dyn JobCallbacks>>,
    pub metadata: JobMetadata,
}

impl JobConfig {
    /// Create an enabled job with no callbacks.
    pub fn new(name: impl Into<String>, cron_expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            cron_expression: cron_expression.into(),
            timezone: None,
            enabled: true,
            run_on_init: false,
            max_retries: None,
            retry_delay: None,
            overlap: OverlapPolicy::default(),
            callbacks: None,
            metadata: JobMetadata::default(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_run_on_init(mut self, run_on_init: bool) -> Self {
        self.run_on_init = run_on_init;
        self
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = Some(max_retries);
        self.retry_delay = Some(retry_delay);
        self
    }

    pub fn with_overlap(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }

    pub fn with_callbacks(mut self, callbacks: Arc<dyn JobCallbacks>) -> Self {
        self.callbacks = Some(callbacks);
        self
    }

    pub fn with_metadata(mut self, metadata: JobMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// The identity used for uniqueness and manual lookup: `id`, else `name`.
    pub fn identity(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.name)
    }

    /// Total invocations allowed for one execution.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.unwrap_or(0).saturating_add(1)
    }

    pub fn retry_delay_or_default(&self) -> Duration {
        self.retry_delay.unwrap_or(DEFAULT_RETRY_DELAY)
    }

    pub fn description(&self) -> Option<&str> {
        self.metadata.description.as_deref()
    }
}

impl std::fmt::Debug for JobConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobConfig")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("cron_expression", &self.cron_expression)
            .field("timezone", &self.timezone)
            .field("enabled", &self.enabled)
            .field("run_on_init", &self.run_on_init)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("overlap", &self.overlap)
            .field("callbacks", &self.callbacks.is_some())
            .field("metadata", &self.metadata)
            .finish()
    }
}
