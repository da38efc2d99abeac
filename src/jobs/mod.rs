//! Built-in jobs shipped with the runner.

pub mod daily_report;
pub mod example_cleanup;

use crate::config::RunnerConfig;
use crate::loader::JobModule;

/// The built-in catalogue, in load order.
pub fn catalogue(config: &RunnerConfig) -> Vec<JobModule> {
    vec![
        daily_report::module(config.reports_dir.clone()),
        example_cleanup::module(config.cleanup_dir.clone(), config.cleanup_max_age),
    ]
}
