//! Executable job bodies.

use std::future::Future;

use async_trait::async_trait;

use super::{JobExecutionContext, JobResult};

/// The body of a job.
///
/// Returning `Err` (or panicking) is treated as an unexpected failure; a
/// body that wants to report an expected failure returns
/// [`JobResult::failure`]. Any async fn or closure with the signature
/// `Fn(JobExecutionContext) -> impl Future<Output = anyhow::Result<JobResult>>`
/// implements this trait.
#[async_trait]
pub trait JobFunction: Send + Sync {
    async fn run(&self, ctx: JobExecutionContext) -> anyhow::Result<JobResult>;
}

#[async_trait]
impl<F, Fut> JobFunction for F
where
    F: Fn(JobExecutionContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<JobResult>> + Send + 'static,
{
    async fn run(&self, ctx: JobExecutionContext) -> anyhow::Result<JobResult> {
        (self)(ctx).await
    }
}
