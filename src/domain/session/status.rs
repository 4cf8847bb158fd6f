//! SessionStatus - login state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

/// Login state of the kiosk.
///
/// `LoggingIn` only occurs on the REST path while the HTTP response is
/// outstanding; a pushed card-scan login goes straight to `LoggedIn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    LoggedOut,
    LoggingIn,
    LoggedIn,
}

impl SessionStatus {
    /// Returns true when a session is current.
    pub fn is_logged_in(&self) -> bool {
        matches!(self, SessionStatus::LoggedIn)
    }
}

impl StateMachine for SessionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SessionStatus::*;
        matches!(
            (self, target),
            (LoggedOut, LoggingIn)
                | (LoggedOut, LoggedIn)
                | (LoggingIn, LoggedIn)
                | (LoggingIn, LoggedOut)
                | (LoggedIn, LoggingIn)
                | (LoggedIn, LoggedIn)
                | (LoggedIn, LoggedOut)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SessionStatus::*;
        match self {
            LoggedOut => vec![LoggingIn, LoggedIn],
            LoggingIn => vec![LoggedIn, LoggedOut],
            LoggedIn => vec![LoggingIn, LoggedIn, LoggedOut],
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::LoggedOut => "logged_out",
            SessionStatus::LoggingIn => "logging_in",
            SessionStatus::LoggedIn => "logged_in",
        };
        write!(f, "{}", s)
    }
}
