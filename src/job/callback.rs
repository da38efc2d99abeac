//! Lifecycle callback protocol.
//!
//! After every execution the runner calls exactly one of [`on_success`] or
//! [`on_error`], then always [`on_complete`]. Errors and panics raised by a
//! handler are logged and discarded; they never change the [`JobResult`].
//!
//! [`on_success`]: JobCallbacks::on_success
//! [`on_error`]: JobCallbacks::on_error
//! [`on_complete`]: JobCallbacks::on_complete

use async_trait::async_trait;

use super::{JobExecutionContext, JobResult};

/// Handlers a job author implements to react to an execution's outcome.
/// Every method defaults to a no-op.
#[async_trait]
pub trait JobCallbacks: Send + Sync {
    async fn on_success(
        &self,
        _result: &JobResult,
        _ctx: &JobExecutionContext,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_error(
        &self,
        _error: &anyhow::Error,
        _ctx: &JobExecutionContext,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_complete(
        &self,
        _result: &JobResult,
        _ctx: &JobExecutionContext,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}
