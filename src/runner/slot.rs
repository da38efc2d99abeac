//! Per-job execution slot enforcing the overlap policy.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::job::OverlapPolicy;

/// Held for the duration of one execution.
pub(crate) struct SlotGuard {
    _permit: Option<OwnedSemaphorePermit>,
}

pub(crate) struct ExecutionSlot {
    permit: Arc<Semaphore>,
    /// A firing is waiting for the slot (`Queue` policy only).
    queued: AtomicBool,
}

impl ExecutionSlot {
    pub(crate) fn new() -> Self {
        Self {
            permit: Arc::new(Semaphore::new(1)),
            queued: AtomicBool::new(false),
        }
    }

    /// Claim the slot. `None` means the firing is rejected.
    pub(crate) async fn acquire(&self, policy: OverlapPolicy) -> Option<SlotGuard> {
        match policy {
            OverlapPolicy::Allow => Some(SlotGuard { _permit: None }),
            OverlapPolicy::Skip => self.try_claim(),
            OverlapPolicy::Queue => {
                if let Some(guard) = self.try_claim() {
                    return Some(guard);
                }
                if self.queued.swap(true, Ordering::AcqRel) {
                    return None;
                }
                // Frees the queue position even if this future is dropped mid-wait.
                let _position = QueuePosition(&self.queued);
                let permit = Arc::clone(&self.permit).acquire_owned().await.ok();
                permit.map(|p| SlotGuard { _permit: Some(p) })
            }
        }
    }

    fn try_claim(&self) -> Option<SlotGuard> {
        Arc::clone(&self.permit)
            .try_acquire_owned()
            .ok()
            .map(|p| SlotGuard { _permit: Some(p) })
    }
}

struct QueuePosition<'a>(&'a AtomicBool);

impl Drop for QueuePosition<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
