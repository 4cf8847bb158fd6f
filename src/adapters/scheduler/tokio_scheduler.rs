//! Scheduler backed by spawned `tokio` sleeps.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::ports::{ScheduledTask, Scheduler, TimerHandle, TimerId};

/// Runs each scheduled task on its own tokio task after a sleep.
///
/// Must be used from within a tokio runtime. Cancelling a pending timer
/// aborts its sleeping task.
#[derive(Debug, Default)]
pub struct TokioScheduler {
    next_id: AtomicU64,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: ScheduledTask) -> TimerHandle {
        let handle = TimerHandle::new(TimerId::new(self.next_id.fetch_add(1, Ordering::Relaxed)));

        let timer = handle.clone();
        let join = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if timer.try_fire() {
                task.await;
            }
        });
        handle.attach_abort(join.abort_handle());

        handle
    }

    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}
