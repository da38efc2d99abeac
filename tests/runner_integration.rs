//! End-to-end tests for the job runner: registration, loading, manual and
//! scheduled execution, callbacks, retries and overlap handling.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono_tz::Tz;
use futures::future::BoxFuture;
use serde_json::json;
use tokio::time::timeout;

use cron_runner::error::RunnerError;
use cron_runner::job::OverlapPolicy;
use cron_runner::{
    JobCallbacks, JobConfig, JobExecutionContext, JobLoader, JobModule, JobResult, JobRunner,
    RunnerConfig, jobs,
};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(10);

type BodyFuture = BoxFuture<'static, anyhow::Result<JobResult>>;
type Body = Box<dyn Fn(JobExecutionContext) -> BodyFuture + Send + Sync>;

fn body<F, Fut>(f: F) -> Body
where
    F: Fn(JobExecutionContext) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = anyhow::Result<JobResult>> + Send + 'static,
{
    Box::new(move |ctx| Box::pin(f(ctx)))
}

/// Records callback invocations in order.
#[derive(Default)]
struct Journal {
    events: Mutex<Vec<&'static str>>,
    explode: bool,
}

impl Journal {
    fn exploding() -> Self {
        Self {
            explode: true,
            ..Default::default()
        }
    }

    fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: &'static str) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(event);
        if self.explode {
            anyhow::bail!("{event} handler failed");
        }
        Ok(())
    }
}

#[async_trait]
impl JobCallbacks for Journal {
    async fn on_success(&self, _: &JobResult, _: &JobExecutionContext) -> anyhow::Result<()> {
        self.record("success")
    }

    async fn on_error(&self, _: &anyhow::Error, _: &JobExecutionContext) -> anyhow::Result<()> {
        self.record("error")
    }

    async fn on_complete(&self, _: &JobResult, _: &JobExecutionContext) -> anyhow::Result<()> {
        self.record("complete")
    }
}

#[tokio::test]
async fn nightly_scenario() {
    let runner = JobRunner::new(Tz::UTC);
    let journal = Arc::new(Journal::default());
    runner
        .register(
            JobConfig::new("nightly", "0 2 * * *").with_callbacks(journal.clone()),
            body(|_| async {
                Ok(JobResult::success()
                    .with_message("ok")
                    .with_data(json!({ "n": 3 })))
            }),
        )
        .await
        .unwrap();

    let result = timeout(TEST_TIMEOUT, runner.execute_job("nightly"))
        .await
        .unwrap()
        .unwrap();

    assert!(result.success);
    assert_eq!(result.message.as_deref(), Some("ok"));
    assert_eq!(result.data.as_ref().unwrap()["n"], 3);
    assert!(result.error.is_none());
    assert_eq!(journal.events(), ["success", "complete"]);
}

#[tokio::test]
async fn bad_expression_scenario() {
    let runner = JobRunner::new(Tz::UTC);
    let err = runner
        .register(
            JobConfig::new("bad", "not-a-cron"),
            body(|_| async { Ok(JobResult::success()) }),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::InvalidSchedule { .. }));
    assert!(runner.jobs_info().await.iter().all(|j| j.name != "bad"));
    assert!(matches!(
        runner.execute_job("bad").await,
        Err(RunnerError::NotFound(_))
    ));
}

#[tokio::test]
async fn throwing_body_reports_error_then_complete() {
    let runner = JobRunner::new(Tz::UTC);
    let journal = Arc::new(Journal::default());
    runner
        .register(
            JobConfig::new("explodes", "0 2 * * *").with_callbacks(journal.clone()),
            body(|_| async { Err(anyhow::anyhow!("database unreachable")) }),
        )
        .await
        .unwrap();

    let result = runner.execute_job("explodes").await.unwrap();
    assert!(!result.success);
    assert!(result.error_message().unwrap().contains("database unreachable"));
    assert_eq!(journal.events(), ["error", "complete"]);
}

#[tokio::test]
async fn throwing_callbacks_are_contained() {
    let runner = JobRunner::new(Tz::UTC);
    let journal = Arc::new(Journal::exploding());
    runner
        .register(
            JobConfig::new("noisy", "0 2 * * *").with_callbacks(journal.clone()),
            body(|_| async { Ok(JobResult::success().with_message("fine")) }),
        )
        .await
        .unwrap();

    let result = runner.execute_job("noisy").await.unwrap();
    assert!(result.success);
    assert_eq!(result.message.as_deref(), Some("fine"));
    assert_eq!(journal.events(), ["success", "complete"]);
}

#[tokio::test]
async fn context_carries_job_details() {
    let runner = JobRunner::new(chrono_tz::Europe::Madrid);
    let seen = Arc::new(Mutex::new(None));
    let sink = seen.clone();
    runner
        .register(
            JobConfig::new("ctx", "0 2 * * *")
                .with_metadata(cron_runner::job::JobMetadata::new("context check")),
            body(move |ctx| {
                let sink = sink.clone();
                async move {
                    *sink.lock().unwrap() = Some(ctx);
                    Ok(JobResult::success())
                }
            }),
        )
        .await
        .unwrap();

    runner.execute_job("ctx").await.unwrap();
    let ctx = seen.lock().unwrap().take().unwrap();
    assert_eq!(ctx.job_name, "ctx");
    assert_eq!(ctx.timezone, chrono_tz::Europe::Madrid);
    assert_eq!(ctx.metadata.description.as_deref(), Some("context check"));
}

#[tokio::test]
async fn scheduled_run_with_retries_and_callbacks() {
    let runner = JobRunner::new(Tz::UTC);
    let journal = Arc::new(Journal::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    runner
        .register(
            JobConfig::new("flaky", "0 0 1 1 *")
                .with_run_on_init(true)
                .with_retries(2, Duration::from_millis(20))
                .with_callbacks(journal.clone()),
            body(move |_| {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        anyhow::bail!("first attempt fails");
                    }
                    Ok(JobResult::success())
                }
            }),
        )
        .await
        .unwrap();

    assert_eq!(runner.start_all().await, 1);

    timeout(TEST_TIMEOUT, async {
        while journal.events().len() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(journal.events(), ["success", "complete"]);
    runner.shutdown().await;
}

#[tokio::test]
async fn queue_policy_runs_one_pending_firing() {
    let runner = JobRunner::new(Tz::UTC);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    runner
        .register(
            JobConfig::new("queued", "0 2 * * *").with_overlap(OverlapPolicy::Queue),
            body(move |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(150)).await;
                    Ok(JobResult::success())
                }
            }),
        )
        .await
        .unwrap();

    let spawn = |runner: &JobRunner| {
        let runner = runner.clone();
        tokio::spawn(async move { runner.execute_job("queued").await })
    };

    let first = spawn(&runner);
    tokio::time::sleep(Duration::from_millis(30)).await;
    let second = spawn(&runner);
    tokio::time::sleep(Duration::from_millis(30)).await;

    let third = runner.execute_job("queued").await;
    assert!(matches!(third, Err(RunnerError::Overlapping { .. })));

    assert!(first.await.unwrap().unwrap().success);
    assert!(second.await.unwrap().unwrap().success);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn allow_policy_runs_concurrently() {
    let runner = JobRunner::new(Tz::UTC);
    runner
        .register(
            JobConfig::new("parallel", "0 2 * * *").with_overlap(OverlapPolicy::Allow),
            body(|_| async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(JobResult::success())
            }),
        )
        .await
        .unwrap();

    let (a, b) = tokio::join!(runner.execute_job("parallel"), runner.execute_job("parallel"));
    assert!(a.unwrap().success);
    assert!(b.unwrap().success);
}

#[tokio::test]
async fn builtin_catalogue_loads_and_runs() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunnerConfig {
        reports_dir: dir.path().join("reports"),
        cleanup_dir: dir.path().join("temp"),
        ..Default::default()
    };

    let runner = JobRunner::from_config(&config);
    let loader = JobLoader::new(jobs::catalogue(&config));
    let report = loader.load_all(&runner).await;
    assert_eq!(report.loaded, ["daily-report", "example-cleanup"]);
    assert!(report.is_clean());

    let info = runner.jobs_info().await;
    assert_eq!(info[0].identity, "report");
    assert_eq!(info[0].timezone, "America/Mexico_City");

    let report = runner.execute_job_by_id("report").await.unwrap();
    assert!(report.success);
    let path = report.data.unwrap()["reportPath"].as_str().unwrap().to_string();
    assert!(std::path::Path::new(&path).exists());

    let cleanup = runner.execute_job_by_id("example-cleanup").await.unwrap();
    assert!(cleanup.success);
    assert_eq!(cleanup.attempts, 1);
}

#[tokio::test]
async fn loader_skips_duplicate_identity() {
    let runner = JobRunner::new(Tz::UTC);
    let noop = || body(|_| async { Ok(JobResult::success()) });
    let loader = JobLoader::new(vec![
        JobModule::new("first", JobConfig::new("first", "0 1 * * *").with_id("shared"), noop()),
        JobModule::new("second", JobConfig::new("second", "0 2 * * *").with_id("shared"), noop()),
    ]);

    let report = loader.load_all(&runner).await;
    assert_eq!(report.loaded, ["first"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(runner.find_by_id("shared").await.unwrap().name(), "first");
}
