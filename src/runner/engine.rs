//! Executing a job and dispatching its lifecycle callbacks.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;

use crate::error::RunnerError;
use crate::job::{JobExecutionContext, JobResult, TriggerKind};

use super::{JobRunner, RegisteredJob};

impl JobRunner {
    /// Run a job now, outside its schedule, and wait for the result.
    ///
    /// Works whether or not the schedule is started and whether or not the
    /// job is enabled. Failures of the job body are reported in the returned
    /// [`JobResult`]; `Err` is only returned when the job does not exist or
    /// the run was rejected by the overlap policy.
    pub async fn execute_job(&self, name: &str) -> Result<JobResult, RunnerError> {
        let job = self.lookup(name).await?;
        execute(&job, TriggerKind::Manual).await
    }

    /// Same as [`execute_job`](Self::execute_job), looking the job up by identity.
    pub async fn execute_job_by_id(&self, id: &str) -> Result<JobResult, RunnerError> {
        let job = self
            .find_by_id(id)
            .await
            .ok_or_else(|| RunnerError::NotFound(id.to_string()))?;
        execute(&job, TriggerKind::Manual).await
    }

    /// Fire-and-forget entry point used by schedule and init triggers.
    pub(crate) async fn dispatch(&self, name: &str, trigger: TriggerKind) {
        let job = match self.lookup(name).await {
            Ok(job) => job,
            Err(e) => {
                tracing::error!(job = %name, error = %e, "Triggered job is not registered");
                return;
            }
        };

        match execute(&job, trigger).await {
            Ok(_) => {}
            Err(RunnerError::Overlapping { .. }) => {
                tracing::warn!(
                    job = %name,
                    trigger = %trigger,
                    policy = %job.config.overlap,
                    "Previous run still in progress, firing skipped"
                );
            }
            Err(e) => {
                tracing::error!(job = %name, error = %e, "Triggered run failed to start");
            }
        }
    }
}

async fn execute(job: &Arc<RegisteredJob>, trigger: TriggerKind) -> Result<JobResult, RunnerError> {
    let Some(_slot) = job.slot.acquire(job.config.overlap).await else {
        return Err(RunnerError::Overlapping {
            name: job.name().to_string(),
        });
    };

    let ctx = JobExecutionContext::new(&job.config, job.timezone, trigger);
    tracing::info!(
        job = %ctx.job_name,
        run_id = %ctx.run_id,
        trigger = %trigger,
        "Executing job"
    );

    let started = Instant::now();
    let (outcome, attempts) = invoke_with_retries(job, &ctx).await;
    let result = classify(job.name(), outcome, started, attempts);

    if result.success {
        tracing::info!(
            job = %ctx.job_name,
            run_id = %ctx.run_id,
            elapsed_ms = result.execution_millis() as u64,
            attempts = result.attempts,
            message = result.message.as_deref().unwrap_or(""),
            "Job completed successfully"
        );
    } else {
        tracing::error!(
            job = %ctx.job_name,
            run_id = %ctx.run_id,
            elapsed_ms = result.execution_millis() as u64,
            attempts = result.attempts,
            error = result.error_message().as_deref().unwrap_or("unknown error"),
            "Job failed"
        );
    }

    dispatch_callbacks(job, &result, &ctx).await;
    Ok(result)
}

/// How one invocation of the job body ended.
enum Outcome {
    Returned(JobResult),
    Raised(anyhow::Error),
    Panicked(String),
}

impl Outcome {
    fn succeeded(&self) -> bool {
        matches!(self, Outcome::Returned(r) if r.success)
    }
}

/// Invoke the body up to `max_attempts` times, sleeping `retry_delay`
/// between failed attempts.
async fn invoke_with_retries(job: &RegisteredJob, ctx: &JobExecutionContext) -> (Outcome, u32) {
    let max_attempts = job.config.max_attempts();
    let delay = job.config.retry_delay_or_default();
    let mut attempt = 1;

    loop {
        let outcome = invoke(job, ctx.clone()).await;
        if outcome.succeeded() || attempt >= max_attempts {
            return (outcome, attempt);
        }

        tracing::warn!(
            job = %ctx.job_name,
            run_id = %ctx.run_id,
            attempt,
            max_attempts,
            retry_in_ms = delay.as_millis() as u64,
            "Job attempt failed, retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

async fn invoke(job: &RegisteredJob, ctx: JobExecutionContext) -> Outcome {
    match AssertUnwindSafe(job.executable.run(ctx)).catch_unwind().await {
        Ok(Ok(result)) => Outcome::Returned(result),
        Ok(Err(e)) => Outcome::Raised(e),
        Err(panic) => Outcome::Panicked(panic_message(panic.as_ref())),
    }
}

/// Turn the final outcome into the one `JobResult` the caller sees.
fn classify(name: &str, outcome: Outcome, started: Instant, attempts: u32) -> JobResult {
    let mut result = match outcome {
        Outcome::Returned(mut result) => {
            if !result.success && result.error.is_none() {
                let reason = result
                    .message
                    .clone()
                    .unwrap_or_else(|| "no error given".to_string());
                result.error = Some(anyhow::anyhow!("job {name} reported failure: {reason}"));
            }
            result
        }
        Outcome::Raised(e) => {
            JobResult::failure(e).with_message(format!("unexpected error in job {name}"))
        }
        Outcome::Panicked(msg) => JobResult::failure(anyhow::anyhow!("job panicked: {msg}"))
            .with_message(format!("unexpected error in job {name}")),
    };

    result.execution_time = started.elapsed();
    result.attempts = attempts;
    result
}

/// Exactly one of `on_success`/`on_error`, then always `on_complete`.
async fn dispatch_callbacks(job: &RegisteredJob, result: &JobResult, ctx: &JobExecutionContext) {
    let Some(callbacks) = job.config.callbacks.as_ref() else {
        return;
    };

    if result.success {
        guard("on_success", ctx, callbacks.on_success(result, ctx)).await;
    } else if let Some(error) = result.error.as_ref() {
        guard("on_error", ctx, callbacks.on_error(error, ctx)).await;
    }

    guard("on_complete", ctx, callbacks.on_complete(result, ctx)).await;
}

/// Await a callback, logging and discarding any error or panic.
async fn guard<F>(hook: &str, ctx: &JobExecutionContext, fut: F)
where
    F: Future<Output = anyhow::Result<()>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::error!(
                job = %ctx.job_name,
                run_id = %ctx.run_id,
                hook,
                error = %format!("{e:#}"),
                "Callback failed"
            );
        }
        Err(panic) => {
            tracing::error!(
                job = %ctx.job_name,
                run_id = %ctx.run_id,
                hook,
                panic = %panic_message(panic.as_ref()),
                "Callback panicked"
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
