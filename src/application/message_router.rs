//! MessageRouter - Translates gateway frames into bus events.
//!
//! Known frame types map to topics; anything else is dropped with a
//! warning. The router keeps no state between frames, so dispatch order is
//! exactly the order frames are handed in.

use std::sync::Arc;

use crate::adapters::websocket::{DecodeError, InboundMessage, USER_LOGIN};
use crate::ports::{BusEvent, EventPublisher, Topic};

/// What happened to one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Published to the topic.
    Published(Topic),
    /// Decoded, but the type is not one we route.
    Unknown(String),
    /// Not a valid frame.
    Malformed(DecodeError),
}

/// Routes inbound gateway frames onto the event bus.
#[derive(Clone)]
pub struct MessageRouter {
    publisher: Arc<dyn EventPublisher>,
}

impl MessageRouter {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self { publisher }
    }

    /// Parses one raw frame.
    pub fn decode(raw: &str) -> Result<InboundMessage, DecodeError> {
        InboundMessage::decode(raw)
    }

    /// Topic for a frame type, if it is one we route.
    pub fn topic_for(kind: &str) -> Option<Topic> {
        match kind {
            USER_LOGIN => Some(Topic::UserLogin),
            _ => None,
        }
    }

    /// Publishes a decoded message to its topic.
    pub async fn route(&self, message: InboundMessage) -> Dispatch {
        let Some(topic) = Self::topic_for(&message.kind) else {
            tracing::warn!(kind = %message.kind, "Dropping frame of unknown type");
            return Dispatch::Unknown(message.kind);
        };

        let report = self
            .publisher
            .publish(BusEvent::new(topic, message.payload))
            .await;
        tracing::debug!(
            topic = %topic,
            handlers = report.handlers_invoked(),
            "Routed gateway frame"
        );
        Dispatch::Published(topic)
    }

    /// Decodes and routes one raw frame. Never fails; bad frames are
    /// logged and dropped.
    pub async fn handle_frame(&self, raw: &str) -> Dispatch {
        match Self::decode(raw) {
            Ok(message) => self.route(message).await,
            Err(e) => {
                tracing::warn!(error = %e, len = raw.len(), "Dropping undecodable frame");
                Dispatch::Malformed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryEventBus;
    use serde_json::json;

    fn router() -> (MessageRouter, Arc<InMemoryEventBus>) {
        let bus = Arc::new(InMemoryEventBus::new());
        (MessageRouter::new(bus.clone()), bus)
    }

    #[tokio::test]
    async fn user_login_frame_publishes_message_payload() {
        let (router, bus) = router();
        let raw = r#"{"type":"user.login","message":{"access":"A","refresh":"R"}}"#;

        let dispatch = router.handle_frame(raw).await;

        assert_eq!(dispatch, Dispatch::Published(Topic::UserLogin));
        let events = bus.events_of_topic(Topic::UserLogin);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload, json!({"access": "A", "refresh": "R"}));
    }

    #[tokio::test]
    async fn alternate_type_spellings_are_unknown() {
        let (router, bus) = router();

        for kind in ["user_login", "card_scan"] {
            let raw = json!({"type": kind, "message": {"access": "A"}}).to_string();
            assert_eq!(
                router.handle_frame(&raw).await,
                Dispatch::Unknown(kind.to_string())
            );
        }
        assert_eq!(bus.event_count(), 0);
    }

    #[tokio::test]
    async fn malformed_frame_is_dropped() {
        let (router, bus) = router();

        let dispatch = router.handle_frame("{\"type\": ").await;

        assert!(matches!(dispatch, Dispatch::Malformed(DecodeError::Malformed(_))));
        assert_eq!(bus.event_count(), 0);
    }

    #[tokio::test]
    async fn frames_are_published_in_arrival_order() {
        let (router, bus) = router();

        for n in 0..5 {
            let raw = json!({"type": "user.login", "message": {"n": n}}).to_string();
            router.handle_frame(&raw).await;
        }

        let order: Vec<_> = bus
            .published_events()
            .iter()
            .map(|e| e.payload["n"].as_i64().unwrap())
            .collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn only_user_login_has_a_topic() {
        assert_eq!(MessageRouter::topic_for("user.login"), Some(Topic::UserLogin));
        assert_eq!(MessageRouter::topic_for("register_kiosk"), None);
    }
}
