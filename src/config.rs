//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;

use crate::error::ConfigError;
use crate::schedule::parse_timezone;

/// Process-wide runner configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Timezone for jobs that don't set one (`TIMEZONE`).
    pub default_timezone: Tz,
    /// Master switch for scheduled execution (`JOBS_ENABLED`).
    pub jobs_enabled: bool,
    /// Log filter directive when `RUST_LOG` is unset (`LOG_LEVEL`).
    pub log_level: String,
    /// Directory for rotated log files (`LOG_DIR`).
    pub log_dir: PathBuf,
    /// Where the daily report job writes (`REPORTS_DIR`).
    pub reports_dir: PathBuf,
    /// Directory swept by the cleanup job (`CLEANUP_DIR`).
    pub cleanup_dir: PathBuf,
    /// Files older than this are deleted by the cleanup job (`CLEANUP_MAX_AGE_DAYS`).
    pub cleanup_max_age: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            default_timezone: chrono_tz::America::Mexico_City,
            jobs_enabled: true,
            log_level: "info".to_string(),
            log_dir: PathBuf::from("./logs"),
            reports_dir: PathBuf::from("./reports"),
            cleanup_dir: PathBuf::from("./temp"),
            cleanup_max_age: Duration::from_secs(7 * SECS_PER_DAY),
        }
    }
}

impl RunnerConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Unset or blank keys
    /// keep their defaults; malformed values are rejected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(tz) = get("TIMEZONE") {
            config.default_timezone = parse_timezone(&tz).map_err(|e| invalid("TIMEZONE", e))?;
        }
        if let Some(enabled) = get("JOBS_ENABLED") {
            config.jobs_enabled = parse_bool(&enabled).ok_or_else(|| {
                invalid("JOBS_ENABLED", format!("expected true or false, got '{enabled}'"))
            })?;
        }
        if let Some(level) = get("LOG_LEVEL") {
            config.log_level = level.to_lowercase();
        }
        if let Some(dir) = get("LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("REPORTS_DIR") {
            config.reports_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("CLEANUP_DIR") {
            config.cleanup_dir = PathBuf::from(dir);
        }
        if let Some(age) = get("CLEANUP_MAX_AGE_DAYS") {
            let n: u64 = age
                .parse()
                .map_err(|e| invalid("CLEANUP_MAX_AGE_DAYS", format!("'{age}': {e}")))?;
            config.cleanup_max_age = n
                .checked_mul(SECS_PER_DAY)
                .map(Duration::from_secs)
                .ok_or_else(|| {
                    invalid("CLEANUP_MAX_AGE_DAYS", format!("'{age}' days is out of range"))
                })?;
        }

        Ok(config)
    }
}

const SECS_PER_DAY: u64 = 24 * 60 * 60;

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn invalid(key: &str, message: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}
