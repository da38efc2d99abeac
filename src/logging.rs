//! Tracing setup: console output plus daily-rotated files in the log directory.

use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::RunnerConfig;
use crate::error::{ConfigError, Result};

/// Days of rotated log files kept on disk.
pub const RETAINED_LOG_FILES: usize = 30;

static GUARDS: OnceLock<[WorkerGuard; 2]> = OnceLock::new();

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `LOG_LEVEL`. All events go to the
/// console and to `app.<date>.log`; errors are also written to
/// `error.<date>.log`.
pub fn init(config: &RunnerConfig) -> Result<()> {
    std::fs::create_dir_all(&config.log_dir).map_err(ConfigError::Io)?;

    let (app_writer, app_guard) = tracing_appender::non_blocking(appender(&config.log_dir, "app")?);
    let (error_writer, error_guard) =
        tracing_appender::non_blocking(appender(&config.log_dir, "error")?);
    let _ = GUARDS.set([app_guard, error_guard]);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_writer(app_writer).with_ansi(false))
        .with(
            fmt::layer()
                .with_writer(error_writer)
                .with_ansi(false)
                .with_filter(LevelFilter::ERROR),
        )
        .try_init()?;

    Ok(())
}

fn appender(dir: &Path, prefix: &str) -> std::result::Result<RollingFileAppender, ConfigError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .max_log_files(RETAINED_LOG_FILES)
        .build(dir)
        .map_err(|e| ConfigError::InvalidValue {
            key: "LOG_DIR".to_string(),
            message: format!("cannot open {prefix} log in {}: {e}", dir.display()),
        })
}
