//! EventPublisher port - Interface for publishing bus events.
//!
//! Components publish to a `Topic` without knowing who listens: the
//! Connection Manager publishes lifecycle topics, the Message Router
//! publishes `user-login`, the Session Store publishes `auth-*`.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{EventId, Timestamp};

/// Canonical topics carried by the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    ConnectionOpened,
    ConnectionClosed,
    ConnectionFailed,
    /// Raw pushed login payload from the gateway.
    UserLogin,
    /// Normalized, session-ready login notice.
    AuthLoginSuccess,
    AuthLogout,
    /// Route data for map consumers.
    VisualizeRoute,
    /// Fresh timetable after an explicit refresh.
    TimetableRefreshed,
}

impl Topic {
    pub const ALL: [Topic; 8] = [
        Topic::ConnectionOpened,
        Topic::ConnectionClosed,
        Topic::ConnectionFailed,
        Topic::UserLogin,
        Topic::AuthLoginSuccess,
        Topic::AuthLogout,
        Topic::VisualizeRoute,
        Topic::TimetableRefreshed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::ConnectionOpened => "connection-opened",
            Topic::ConnectionClosed => "connection-closed",
            Topic::ConnectionFailed => "connection-failed",
            Topic::UserLogin => "user-login",
            Topic::AuthLoginSuccess => "auth-login-success",
            Topic::AuthLogout => "auth-logout",
            Topic::VisualizeRoute => "visualize-route",
            Topic::TimetableRefreshed => "timetable-refreshed",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown topic: {}", s))
    }
}

/// One message on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusEvent {
    pub event_id: EventId,
    pub topic: Topic,
    pub payload: JsonValue,
    pub occurred_at: Timestamp,
}

impl BusEvent {
    pub fn new(topic: Topic, payload: JsonValue) -> Self {
        Self {
            event_id: EventId::new(),
            topic,
            payload,
            occurred_at: Timestamp::now(),
        }
    }

    /// Event with a `null` payload, for pure notifications.
    pub fn signal(topic: Topic) -> Self {
        Self::new(topic, JsonValue::Null)
    }

    /// Serializes `payload` into a new event.
    pub fn with_payload<T: Serialize>(topic: Topic, payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(topic, serde_json::to_value(payload)?))
    }

    /// Deserializes the payload into a typed value.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

/// Outcome of a publish: how many handlers ran cleanly and how many failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub failed: usize,
}

impl PublishReport {
    pub fn handlers_invoked(&self) -> usize {
        self.delivered + self.failed
    }
}

/// Port for publishing bus events.
///
/// Implementations must:
/// - Invoke every current subscriber of the topic, in subscription order
/// - Complete all handlers before returning (synchronous delivery)
/// - Isolate handler failures: an error or panic in one handler never stops
///   the others, and never propagates to the publisher
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a single event.
    async fn publish(&self, event: BusEvent) -> PublishReport;
}
