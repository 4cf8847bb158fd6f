//! IdleSupervisor - Forces logout after a period without input.
//!
//! While armed, exactly one timer is pending. Every activity signal
//! cancels it and schedules a fresh one, so the effective deadline is
//! always the last signal plus the timeout.

use futures::FutureExt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::domain::foundation::StateMachine;
use crate::domain::idle::{ActivitySignal, IdleState, IdleWindow};
use crate::ports::{ScheduledTask, Scheduler, TimerHandle};

/// What to run when the window lapses.
pub type ExpireAction = Arc<dyn Fn() -> ScheduledTask + Send + Sync>;

#[derive(Default)]
struct IdleInner {
    state: IdleState,
    window: Option<IdleWindow>,
    timer: Option<TimerHandle>,
    on_expire: Option<ExpireAction>,
}

impl IdleInner {
    fn move_to(&mut self, next: IdleState) {
        match self.state.transition_to(next) {
            Ok(state) => self.state = state,
            Err(e) => tracing::error!(error = %e, "Rejected idle state change"),
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }
}

struct IdleShared {
    scheduler: Arc<dyn Scheduler>,
    timeout: Duration,
    inner: Mutex<IdleInner>,
}

/// Inactivity watchdog for the current session.
#[derive(Clone)]
pub struct IdleSupervisor {
    shared: Arc<IdleShared>,
}

impl IdleSupervisor {
    pub fn new(scheduler: Arc<dyn Scheduler>, timeout: Duration) -> Self {
        Self {
            shared: Arc::new(IdleShared {
                scheduler,
                timeout,
                inner: Mutex::new(IdleInner::default()),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, IdleInner> {
        self.shared.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn timeout(&self) -> Duration {
        self.shared.timeout
    }

    pub fn state(&self) -> IdleState {
        self.lock().state
    }

    pub fn is_armed(&self) -> bool {
        self.state() == IdleState::Armed
    }

    /// Current deadline, if armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.lock().window.map(|w| w.deadline)
    }

    /// Time left before expiry, if armed.
    pub fn remaining(&self) -> Option<Duration> {
        let window = self.lock().window?;
        Some(window.remaining(self.shared.scheduler.now()))
    }

    /// Starts a fresh window for a new session. Re-arming replaces the
    /// previous action and timer.
    pub fn arm(&self, on_expire: ExpireAction) {
        let mut inner = self.lock();
        inner.move_to(IdleState::Armed);
        inner.on_expire = Some(on_expire);
        self.restart_window(&mut inner);
        tracing::debug!(timeout_secs = self.shared.timeout.as_secs(), "Idle supervisor armed");
    }

    /// Pushes the deadline out to now + timeout. Ignored unless armed.
    /// Returns true if the window was extended.
    pub fn record_activity(&self, signal: ActivitySignal) -> bool {
        let mut inner = self.lock();
        if inner.state != IdleState::Armed {
            return false;
        }
        self.restart_window(&mut inner);
        tracing::trace!(?signal, "Activity extended idle window");
        true
    }

    /// Stops watching. Safe to call when already inactive.
    pub fn disarm(&self) {
        let mut inner = self.lock();
        inner.cancel_timer();
        inner.window = None;
        inner.on_expire = None;
        if inner.state == IdleState::Armed {
            inner.move_to(IdleState::Inactive);
            tracing::debug!("Idle supervisor disarmed");
        }
    }

    fn restart_window(&self, inner: &mut IdleInner) {
        inner.cancel_timer();

        let timeout = self.shared.timeout;
        inner.window = Some(IdleWindow::starting_at(self.shared.scheduler.now(), timeout));

        let shared = Arc::downgrade(&self.shared);
        inner.timer = Some(self.shared.scheduler.schedule(
            timeout,
            async move {
                if let Some(shared) = shared.upgrade() {
                    IdleSupervisor { shared }.expire().await;
                }
            }
            .boxed(),
        ));
    }

    async fn expire(&self) {
        let action = {
            let mut inner = self.lock();
            match inner.timer.as_ref() {
                Some(timer) if timer.has_fired() => inner.timer = None,
                _ => return,
            }
            if inner.state != IdleState::Armed {
                return;
            }
            inner.move_to(IdleState::Inactive);
            inner.window = None;
            inner.on_expire.take()
        };

        tracing::info!(
            timeout_secs = self.shared.timeout.as_secs(),
            "Idle timeout reached"
        );
        if let Some(action) = action {
            action().await;
        }
    }
}
