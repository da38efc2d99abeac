//! The job model: configuration, bodies, per-run context, results and callbacks.

pub mod callback;
pub mod config;
pub mod context;
pub mod function;
pub mod result;

pub use callback::JobCallbacks;
pub use config::{JobConfig, JobMetadata, OverlapPolicy};
pub use context::{JobExecutionContext, TriggerKind};
pub use function::JobFunction;
pub use result::JobResult;
