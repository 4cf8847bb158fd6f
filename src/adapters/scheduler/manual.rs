//! Virtual-clock scheduler for deterministic tests.
//!
//! Nothing fires until the test calls `advance`. Tasks run inline, in due
//! order, on the caller's task.
//!
//! # Example
//!
//! ```ignore
//! let scheduler = Arc::new(ManualScheduler::new());
//! let idle = IdleSupervisor::new(scheduler.clone(), Duration::from_secs(180));
//!
//! scheduler.advance(Duration::from_secs(170)).await;
//! idle.record_activity(ActivitySignal::PointerMove);
//! assert_eq!(scheduler.pending_delays(), vec![Duration::from_secs(180)]);
//! ```

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::ports::{ScheduledTask, Scheduler, TimerHandle, TimerId};

struct Entry {
    due: Duration,
    handle: TimerHandle,
    task: ScheduledTask,
}

struct ManualState {
    elapsed: Duration,
    next_id: u64,
    entries: Vec<Entry>,
}

/// Scheduler whose clock only moves when told to.
pub struct ManualScheduler {
    origin: Instant,
    state: Mutex<ManualState>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(ManualState {
                elapsed: Duration::ZERO,
                next_id: 0,
                entries: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Virtual time since the scheduler was created.
    pub fn elapsed(&self) -> Duration {
        self.state().elapsed
    }

    /// Timers that are neither fired nor cancelled.
    pub fn pending_count(&self) -> usize {
        self.state()
            .entries
            .iter()
            .filter(|e| e.handle.is_pending())
            .count()
    }

    /// Time until each pending timer is due, soonest first.
    pub fn pending_delays(&self) -> Vec<Duration> {
        let state = self.state();
        let mut delays: Vec<Duration> = state
            .entries
            .iter()
            .filter(|e| e.handle.is_pending())
            .map(|e| e.due.saturating_sub(state.elapsed))
            .collect();
        delays.sort();
        delays
    }

    /// Moves the clock forward by `by`, firing every timer that falls due
    /// on the way. Returns the number of tasks run.
    pub async fn advance(&self, by: Duration) -> usize {
        let target = self.elapsed() + by;
        let mut fired = 0;

        loop {
            let next = {
                let mut state = self.state();
                state.entries.retain(|e| e.handle.is_pending());
                let soonest = state
                    .entries
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| e.due <= target)
                    .min_by_key(|(_, e)| (e.due, e.handle.id()))
                    .map(|(i, _)| i);
                match soonest {
                    Some(index) => {
                        let entry = state.entries.remove(index);
                        state.elapsed = state.elapsed.max(entry.due);
                        Some(entry)
                    }
                    None => None,
                }
            };

            match next {
                Some(entry) => {
                    if entry.handle.try_fire() {
                        entry.task.await;
                        fired += 1;
                    }
                }
                None => break,
            }
        }

        let mut state = self.state();
        state.elapsed = state.elapsed.max(target);
        fired
    }

    /// Advances exactly to the soonest pending timer and fires it.
    pub async fn fire_next(&self) -> bool {
        let delay = self.pending_delays().into_iter().next();
        match delay {
            Some(delay) => self.advance(delay).await > 0,
            None => false,
        }
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: ScheduledTask) -> TimerHandle {
        let mut state = self.state();
        state.next_id += 1;
        let handle = TimerHandle::new(TimerId::new(state.next_id));
        let due = state.elapsed + delay;
        state.entries.push(Entry {
            due,
            handle: handle.clone(),
            task,
        });
        handle
    }

    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex as StdMutex};

    fn recording_task(log: &Arc<StdMutex<Vec<&'static str>>>, label: &'static str) -> ScheduledTask {
        let log = Arc::clone(log);
        async move {
            log.lock().unwrap().push(label);
        }
        .boxed()
    }

    #[tokio::test]
    async fn nothing_fires_before_due() {
        let scheduler = ManualScheduler::new();
        let log = Arc::new(StdMutex::new(Vec::new()));
        scheduler.schedule(Duration::from_secs(5), recording_task(&log, "a"));

        assert_eq!(scheduler.advance(Duration::from_secs(4)).await, 0);
        assert_eq!(scheduler.pending_delays(), vec![Duration::from_secs(1)]);

        assert_eq!(scheduler.advance(Duration::from_secs(1)).await, 1);
        assert_eq!(*log.lock().unwrap(), vec!["a"]);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test]
    async fn fires_in_due_order() {
        let scheduler = ManualScheduler::new();
        let log = Arc::new(StdMutex::new(Vec::new()));
        scheduler.schedule(Duration::from_secs(3), recording_task(&log, "late"));
        scheduler.schedule(Duration::from_secs(1), recording_task(&log, "early"));

        scheduler.advance(Duration::from_secs(10)).await;

        assert_eq!(*log.lock().unwrap(), vec!["early", "late"]);
        assert_eq!(scheduler.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn cancelled_entries_are_skipped() {
        let scheduler = ManualScheduler::new();
        let log = Arc::new(StdMutex::new(Vec::new()));
        let handle = scheduler.schedule(Duration::from_secs(1), recording_task(&log, "x"));

        handle.cancel();

        assert_eq!(scheduler.pending_count(), 0);
        assert_eq!(scheduler.advance(Duration::from_secs(2)).await, 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn tasks_can_schedule_followups() {
        let scheduler = Arc::new(ManualScheduler::new());
        let count = Arc::new(AtomicUsize::new(0));

        let inner = {
            let count = Arc::clone(&count);
            async move {
                count.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        };
        let outer = {
            let scheduler = Arc::clone(&scheduler);
            let count = Arc::clone(&count);
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                scheduler.schedule(Duration::from_secs(1), inner);
            }
            .boxed()
        };
        scheduler.schedule(Duration::from_secs(1), outer);

        scheduler.advance(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn now_tracks_virtual_time() {
        let scheduler = ManualScheduler::new();
        let start = scheduler.now();
        scheduler.advance(Duration::from_secs(170)).await;
        assert_eq!(scheduler.now() - start, Duration::from_secs(170));
    }

    #[tokio::test]
    async fn fire_next_jumps_to_soonest() {
        let scheduler = ManualScheduler::new();
        let log = Arc::new(StdMutex::new(Vec::new()));
        scheduler.schedule(Duration::from_secs(30), recording_task(&log, "x"));

        assert!(scheduler.fire_next().await);
        assert_eq!(scheduler.elapsed(), Duration::from_secs(30));
        assert!(!scheduler.fire_next().await);
    }
}
