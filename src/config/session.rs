//! Session configuration (idle timeout, token storage, restore policy)

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::session::RestorePolicy;

/// Session Store and Idle Supervisor settings
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Seconds without input before forced logout
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// File holding the persisted tokens
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,

    #[serde(default)]
    pub restore_policy: RestorePolicy,

    /// Show the demo timetable when the API is local and nothing is stored
    #[serde(default = "default_demo_when_local")]
    pub demo_when_local: bool,
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Validate session configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(10..=3600).contains(&self.idle_timeout_secs) {
            return Err(ValidationError::InvalidIdleTimeout);
        }
        if self.token_path.as_os_str().is_empty() {
            return Err(ValidationError::MissingRequired("session.token_path"));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout(),
            token_path: default_token_path(),
            restore_policy: RestorePolicy::default(),
            demo_when_local: default_demo_when_local(),
        }
    }
}

fn default_idle_timeout() -> u64 {
    180
}

fn default_token_path() -> PathBuf {
    PathBuf::from("./data/session.yaml")
}

fn default_demo_when_local() -> bool {
    true
}
