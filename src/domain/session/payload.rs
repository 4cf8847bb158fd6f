//! Wire shapes for login payloads and persisted tokens.

use serde::{Deserialize, Serialize};

use super::TimetableEvent;
use crate::domain::foundation::UserId;

/// Body of a successful `POST /api/login/` and the `message` of a pushed
/// `user.login` frame.
///
/// The user block is usually nested (`user.username`, `user.events`) but
/// some backend builds flatten it onto the top level; both are accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoginPayload {
    #[serde(default)]
    pub access: String,
    #[serde(default)]
    pub refresh: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<LoginUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<TimetableEvent>>,
}

/// Nested user block of a login payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoginUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<TimetableEvent>>,
}

impl LoginPayload {
    /// Payload with just a token pair and a nested user.
    pub fn new(
        access: impl Into<String>,
        refresh: impl Into<String>,
        username: impl Into<String>,
        events: Vec<TimetableEvent>,
    ) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
            user: Some(LoginUser {
                id: None,
                username: Some(username.into()),
                events: Some(events),
            }),
            username: None,
            events: None,
        }
    }
}

/// What survives a restart: the `access_token`, `refresh_token` and
/// optional `username` keys of client storage.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl StoredTokens {
    /// A stored pair only counts if the access token is non-blank.
    pub fn has_access_token(&self) -> bool {
        !self.access_token.trim().is_empty()
    }
}

impl std::fmt::Debug for StoredTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredTokens")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("username", &self.username)
            .finish()
    }
}
