//! Startup restore policy and its outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What to do when the timetable fetch fails during a restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestorePolicy {
    /// Keep the stored session and show an empty timetable.
    #[default]
    Lenient,
    /// Treat the stored token as dead and log out.
    Strict,
}

impl fmt::Display for RestorePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestorePolicy::Lenient => f.write_str("lenient"),
            RestorePolicy::Strict => f.write_str("strict"),
        }
    }
}

/// Result of restoring at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// A stored session is current again. `fresh` is false when the
    /// timetable could not be fetched and an empty one was used.
    Restored { events: usize, fresh: bool },
    /// No stored session; the demo timetable was broadcast.
    Demo,
    /// Nobody is logged in.
    LoggedOut,
}

impl RestoreOutcome {
    pub fn is_logged_in(&self) -> bool {
        matches!(self, RestoreOutcome::Restored { .. })
    }
}
