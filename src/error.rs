//! Error types for the job runner.

/// Process startup errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging setup failed: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the job registry and execution engine.
///
/// Job body failures never show up here; they are reported through
/// [`crate::job::JobResult`].
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("Job '{name}' is already registered")]
    DuplicateJob { name: String },

    #[error("Invalid cron expression for job '{name}': {expression} ({reason})")]
    InvalidSchedule {
        name: String,
        expression: String,
        reason: String,
    },

    #[error("Invalid timezone for job '{name}': {timezone}")]
    InvalidTimezone { name: String, timezone: String },

    #[error("Job '{name}' is missing required field '{field}'")]
    MissingField { name: String, field: String },

    #[error("Job '{0}' not found")]
    NotFound(String),

    #[error("Job '{name}' is already running, overlapping run rejected")]
    Overlapping { name: String },
}

impl RunnerError {
    /// Configuration errors are fatal to registering one job, not to the process.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::DuplicateJob { .. }
                | Self::InvalidSchedule { .. }
                | Self::InvalidTimezone { .. }
                | Self::MissingField { .. }
        )
    }
}

/// Errors from the scheduling primitive.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("invalid cron expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },

    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),
}

/// Result type alias for the runner.
pub type Result<T> = std::result::Result<T, Error>;
