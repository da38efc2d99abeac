//! Cron runner: a scheduled job registry and execution engine.

pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod job;
pub mod jobs;
pub mod loader;
pub mod logging;
pub mod runner;
pub mod schedule;

pub use config::RunnerConfig;
pub use error::{Error, Result};
pub use job::{JobCallbacks, JobConfig, JobExecutionContext, JobFunction, JobResult};
pub use loader::{JobLoader, JobModule};
pub use runner::{JobInfo, JobRunner};
