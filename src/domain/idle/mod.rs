//! Idle timeout vocabulary.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::domain::foundation::StateMachine;

/// State of the Idle Supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdleState {
    /// No session; activity is ignored.
    #[default]
    Inactive,
    /// Session present and a logout timer pending.
    Armed,
}

impl StateMachine for IdleState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use IdleState::*;
        matches!((self, target), (Inactive, Armed) | (Armed, Armed) | (Armed, Inactive))
    }

    fn valid_transitions(&self) -> Vec<Self> {
        match self {
            IdleState::Inactive => vec![IdleState::Armed],
            IdleState::Armed => vec![IdleState::Armed, IdleState::Inactive],
        }
    }
}

/// User input that counts as activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivitySignal {
    PointerMove,
    KeyPress,
}

/// The current inactivity deadline. Only meaningful while `Armed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleWindow {
    pub deadline: Instant,
}

impl IdleWindow {
    /// Window ending `timeout` after `from`.
    pub fn starting_at(from: Instant, timeout: Duration) -> Self {
        Self {
            deadline: from + timeout,
        }
    }

    /// Time left before the deadline as seen from `now`.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now)
    }
}
