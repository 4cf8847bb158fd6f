//! Scheduler port - Cancelable delayed tasks.
//!
//! The reconnect delay and the idle timeout both run through this port so
//! tests can drive them with a virtual clock.

use futures::future::BoxFuture;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::AbortHandle;

/// Work run when a timer fires.
pub type ScheduledTask = BoxFuture<'static, ()>;

/// Identifies one scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

#[derive(Debug)]
struct TimerState {
    phase: AtomicU8,
    abort: Mutex<Option<AbortHandle>>,
}

/// Handle to a scheduled timer.
///
/// A timer either fires or is cancelled, never both. Cancelling after the
/// timer fired is a no-op, so a task may safely cancel its own handle.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    id: TimerId,
    state: Arc<TimerState>,
}

impl TimerHandle {
    pub fn new(id: TimerId) -> Self {
        Self {
            id,
            state: Arc::new(TimerState {
                phase: AtomicU8::new(PENDING),
                abort: Mutex::new(None),
            }),
        }
    }

    pub fn id(&self) -> TimerId {
        self.id
    }

    /// Attach the task that sleeps on behalf of this timer.
    pub fn attach_abort(&self, abort: AbortHandle) {
        let mut slot = self.state.abort.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(abort);
    }

    /// Claim the timer for firing. Returns `false` if it was cancelled.
    pub fn try_fire(&self) -> bool {
        self.state
            .phase
            .compare_exchange(PENDING, FIRED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Cancel a pending timer. Returns `true` if this call cancelled it.
    pub fn cancel(&self) -> bool {
        let cancelled = self
            .state
            .phase
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if cancelled {
            let slot = self.state.abort.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(abort) = slot.as_ref() {
                abort.abort();
            }
        }
        cancelled
    }

    pub fn is_pending(&self) -> bool {
        self.state.phase.load(Ordering::Acquire) == PENDING
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.phase.load(Ordering::Acquire) == CANCELLED
    }

    pub fn has_fired(&self) -> bool {
        self.state.phase.load(Ordering::Acquire) == FIRED
    }
}

/// Port for delayed work.
pub trait Scheduler: Send + Sync {
    /// Run `task` once after `delay` unless the handle is cancelled first.
    fn schedule(&self, delay: Duration, task: ScheduledTask) -> TimerHandle;

    /// The scheduler's notion of now.
    fn now(&self) -> Instant;
}
