//! Session aggregate.

use serde::{Deserialize, Serialize};

use super::{LoginPayload, StoredTokens, TimetableEvent};
use crate::domain::foundation::{UserId, ValidationError};

/// The one authenticated identity currently active at the kiosk.
#[derive(Clone, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user: Option<SessionUser>,
}

/// User attached to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    pub username: String,
    #[serde(default)]
    pub events: Vec<TimetableEvent>,
}

impl Session {
    /// Builds a session from either login path.
    ///
    /// Requires a non-blank access token. Nested user fields win over the
    /// flattened ones.
    pub fn from_login(payload: LoginPayload) -> Result<Self, ValidationError> {
        if payload.access.trim().is_empty() {
            return Err(ValidationError::empty_field("access"));
        }

        let LoginPayload {
            access,
            refresh,
            user,
            username,
            events,
        } = payload;

        let (id, nested_name, nested_events) = match user {
            Some(u) => (u.id, u.username, u.events),
            None => (None, None, None),
        };

        let username = nested_name.or(username);
        let events = nested_events.or(events).unwrap_or_default();

        let user = username.map(|username| SessionUser {
            id,
            username,
            events,
        });

        Ok(Self {
            access_token: access,
            refresh_token: refresh,
            user,
        })
    }

    /// Rebuilds a session from client storage. The timetable is not stored,
    /// so the user (if any) starts with no events.
    pub fn from_stored(tokens: StoredTokens) -> Result<Self, ValidationError> {
        if !tokens.has_access_token() {
            return Err(ValidationError::empty_field("access_token"));
        }
        Ok(Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            user: tokens.username.map(|username| SessionUser {
                id: None,
                username,
                events: Vec::new(),
            }),
        })
    }

    /// What gets written to client storage.
    pub fn to_stored(&self) -> StoredTokens {
        StoredTokens {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            username: self.username().map(str::to_string),
        }
    }

    pub fn username(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.username.as_str())
    }

    pub fn events(&self) -> &[TimetableEvent] {
        self.user.as_ref().map(|u| u.events.as_slice()).unwrap_or(&[])
    }

    /// Replaces the timetable after a refresh.
    pub fn with_events(mut self, events: Vec<TimetableEvent>) -> Self {
        if let Some(user) = self.user.as_mut() {
            user.events = events;
        }
        self
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}

/// How the current login came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginSource {
    Credentials,
    CardScan,
    Restored,
    Demo,
}

/// Payload of `auth-login-success`: everything a timetable or map consumer
/// needs, and nothing secret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginNotice {
    pub source: LoginSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
    pub events: Vec<TimetableEvent>,
}

impl LoginNotice {
    pub fn for_session(session: &Session, source: LoginSource) -> Self {
        Self {
            source,
            user: session.user.clone(),
            events: session.events().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::LoginUser;
    use serde_json::json;

    fn alice_payload() -> LoginPayload {
        serde_json::from_value(json!({
            "access": "A",
            "refresh": "R",
            "user": {"username": "alice", "events": []}
        }))
        .unwrap()
    }

    #[test]
    fn from_login_maps_tokens_and_user() {
        let session = Session::from_login(alice_payload()).unwrap();

        assert_eq!(session.access_token, "A");
        assert_eq!(session.refresh_token, "R");
        assert_eq!(session.username(), Some("alice"));
        assert!(session.events().is_empty());
    }

    #[test]
    fn from_login_rejects_missing_access() {
        let mut payload = alice_payload();
        payload.access = String::new();
        assert!(Session::from_login(payload).is_err());
    }

    #[test]
    fn flattened_and_nested_payloads_give_same_session() {
        let nested = alice_payload();
        let flat = LoginPayload {
            access: "A".to_string(),
            refresh: "R".to_string(),
            user: None,
            username: Some("alice".to_string()),
            events: Some(vec![]),
        };

        assert_eq!(
            Session::from_login(nested).unwrap(),
            Session::from_login(flat).unwrap()
        );
    }

    #[test]
    fn nested_username_wins() {
        let payload = LoginPayload {
            access: "A".to_string(),
            refresh: "R".to_string(),
            user: Some(LoginUser {
                id: None,
                username: Some("nested".to_string()),
                events: None,
            }),
            username: Some("flat".to_string()),
            events: None,
        };
        let session = Session::from_login(payload).unwrap();
        assert_eq!(session.username(), Some("nested"));
    }

    #[test]
    fn stored_round_trip_keeps_tokens() {
        let session = Session::from_login(alice_payload()).unwrap();
        let restored = Session::from_stored(session.to_stored()).unwrap();

        assert_eq!(restored.access_token, session.access_token);
        assert_eq!(restored.refresh_token, session.refresh_token);
        assert_eq!(restored.username(), Some("alice"));
    }

    #[test]
    fn debug_output_hides_tokens() {
        let session = Session::from_login(alice_payload()).unwrap();
        let debug = format!("{:?}", session);
        assert!(!debug.contains("\"A\""));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn login_notice_carries_user_and_events() {
        let session = Session::from_login(alice_payload()).unwrap();
        let notice = LoginNotice::for_session(&session, LoginSource::CardScan);
        let value = serde_json::to_value(&notice).unwrap();

        assert_eq!(value["source"], "card_scan");
        assert_eq!(value["user"]["username"], "alice");
        assert!(value.get("access").is_none());
    }
}
