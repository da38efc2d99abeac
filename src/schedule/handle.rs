//! Start/stop handle around a cron timer task.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use super::CronSchedule;

/// Callback raised at every matching instant. Must not block.
pub type TriggerFn = Arc<dyn Fn() + Send + Sync>;

/// A schedule bound to a trigger callback. Created stopped.
pub struct ScheduleHandle {
    schedule: CronSchedule,
    on_trigger: TriggerFn,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ScheduleHandle {
    pub fn new(schedule: CronSchedule, on_trigger: TriggerFn) -> Self {
        Self {
            schedule,
            on_trigger,
            task: Mutex::new(None),
        }
    }

    pub fn schedule(&self) -> &CronSchedule {
        &self.schedule
    }

    /// Spawn the timer task. Returns `false` if it was already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> bool {
        let mut slot = self.slot();
        if let Some(task) = slot.as_ref()
            && !task.is_finished()
        {
            return false;
        }

        let schedule = self.schedule.clone();
        let on_trigger = Arc::clone(&self.on_trigger);
        *slot = Some(tokio::spawn(run_timer(schedule, on_trigger)));
        true
    }

    /// Abort the timer task. Returns `false` if it was not running.
    ///
    /// Executions already spawned by the trigger are not affected.
    pub fn stop(&self) -> bool {
        match self.slot().take() {
            Some(task) => {
                let was_running = !task.is_finished();
                task.abort();
                was_running
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.slot().as_ref().is_some_and(|task| !task.is_finished())
    }

    fn slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        // A poisoned slot still holds a valid JoinHandle.
        self.task.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for ScheduleHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for ScheduleHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleHandle")
            .field("expression", &self.schedule.expression())
            .field("timezone", &self.schedule.timezone())
            .field("active", &self.is_active())
            .finish()
    }
}

async fn run_timer(schedule: CronSchedule, on_trigger: TriggerFn) {
    let mut cursor = Utc::now();

    loop {
        let Some(next) = schedule.next_after(cursor) else {
            tracing::debug!(
                expression = %schedule.expression(),
                "Schedule has no upcoming instants, timer exiting"
            );
            return;
        };

        tokio::time::sleep(until(next)).await;
        on_trigger();

        // Instants missed while the process was suspended are skipped.
        cursor = next.max(Utc::now());
    }
}

fn until(instant: DateTime<Utc>) -> Duration {
    (instant - Utc::now()).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono_tz::Tz;

    fn counting_handle(expr: &str) -> (ScheduleHandle, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let schedule = CronSchedule::parse(expr, Tz::UTC).unwrap();
        let handle = ScheduleHandle::new(
            schedule,
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        (handle, count)
    }

    #[tokio::test]
    async fn created_stopped() {
        let (handle, count) = counting_handle("* * * * * *");
        assert!(!handle.is_active());
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fires_every_second_until_stopped() {
        let (handle, count) = counting_handle("* * * * * *");
        assert!(handle.start());
        assert!(handle.is_active());

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(count.load(Ordering::SeqCst) >= 1);

        assert!(handle.stop());
        assert!(!handle.is_active());
        let after_stop = count.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let (handle, _count) = counting_handle("0 0 1 1 *");
        assert!(handle.start());
        assert!(!handle.start());
        assert!(handle.stop());
        assert!(!handle.stop());
        assert!(handle.start());
    }
}
