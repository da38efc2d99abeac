//! Outcome of a single execution.

use std::time::Duration;

/// Produced exactly once per execution.
///
/// `execution_time` and `attempts` are always overwritten by the runner;
/// values set by a job body are discarded.
#[derive(Debug, Default)]
pub struct JobResult {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<serde_json::Value>,
    /// Set whenever `success` is false.
    pub error: Option<anyhow::Error>,
    pub execution_time: Duration,
    pub attempts: u32,
}

impl JobResult {
    /// A successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    /// A failed result carrying `error`.
    pub fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn execution_millis(&self) -> u128 {
        self.execution_time.as_millis()
    }

    /// Error text, if the execution failed.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| format!("{e:#}"))
    }
}
