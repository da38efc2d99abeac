//! Cron expressions evaluated in a timezone, plus
//! start/stop handles that raise a trigger at every matching instant.
//!
//! Expressions use the standard 5-field cron grammar
//! (`minute hour day-of-month month day-of-week`). A leading seconds field
//! is also accepted, as are the `@daily`-style aliases.

pub mod expression;
pub mod handle;

pub use expression::{CronSchedule, parse_timezone};
pub use handle::{ScheduleHandle, TriggerFn};
