//! EventSubscriber port - Interface for subscribing to bus topics.
//!
//! Handlers register interest in a `Topic` and receive a `Subscription`
//! that removes them again when `unsubscribe` is called.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use super::event_publisher::{BusEvent, Topic};

/// Error returned by a handler. Logged by the bus, never propagated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct HandlerError(String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self(format!("payload decode failed: {}", err))
    }
}

/// Handler for processing bus events.
///
/// Implementations should be:
/// - **Quick** - the publisher waits for every handler
/// - **Isolated** - errors don't affect other handlers
///
/// # Example
///
/// ```ignore
/// struct MapOverlay { /* ... */ }
///
/// #[async_trait]
/// impl EventHandler for MapOverlay {
///     async fn handle(&self, event: BusEvent) -> Result<(), HandlerError> {
///         let route: RouteResult = event.payload_as()?;
///         // Draw the route...
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str {
///         "MapOverlay"
///     }
/// }
/// ```
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Process an event.
    async fn handle(&self, event: BusEvent) -> Result<(), HandlerError>;

    /// Handler name for logging.
    fn name(&self) -> &'static str;
}

/// Wraps a synchronous closure as an `EventHandler`.
pub fn handler_fn<F>(name: &'static str, f: F) -> Arc<dyn EventHandler>
where
    F: Fn(BusEvent) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    Arc::new(FnHandler { name, f })
}

struct FnHandler<F> {
    name: &'static str,
    f: F,
}

#[async_trait]
impl<F> EventHandler for FnHandler<F>
where
    F: Fn(BusEvent) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    async fn handle(&self, event: BusEvent) -> Result<(), HandlerError> {
        (self.f)(event)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Identifies one registration on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Handle returned by `subscribe`.
///
/// Dropping it leaves the handler registered; call `unsubscribe` to remove
/// it. Removal takes effect for publishes that start afterwards.
pub struct Subscription {
    id: SubscriptionId,
    topic: Topic,
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(
        id: SubscriptionId,
        topic: Topic,
        cancel: impl FnOnce() + Send + Sync + 'static,
    ) -> Self {
        Self {
            id,
            topic,
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .finish()
    }
}

/// Port for subscribing to bus topics.
///
/// # Example
///
/// ```ignore
/// let sub = subscriber.subscribe(Topic::VisualizeRoute, map_overlay);
/// // ...
/// sub.unsubscribe();
/// ```
pub trait EventSubscriber: Send + Sync {
    /// Subscribe handler to a topic.
    ///
    /// Handlers for the same topic are invoked in subscription order.
    fn subscribe(&self, topic: Topic, handler: Arc<dyn EventHandler>) -> Subscription;

    /// Subscribe the same handler instance to several topics.
    fn subscribe_all(&self, topics: &[Topic], handler: Arc<dyn EventHandler>) -> Vec<Subscription> {
        topics
            .iter()
            .map(|topic| self.subscribe(*topic, Arc::clone(&handler)))
            .collect()
    }
}

/// Combined trait for event bus implementations.
pub trait EventBus: super::EventPublisher + EventSubscriber {}

// Blanket implementation - any type that implements both traits is an EventBus
impl<T: super::EventPublisher + EventSubscriber> EventBus for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[allow(dead_code)]
    fn assert_handler_object_safe(_: &dyn EventHandler) {}

    #[allow(dead_code)]
    fn assert_subscriber_object_safe(_: &dyn EventSubscriber) {}

    #[tokio::test]
    async fn handler_fn_forwards_to_closure() {
        let handler = handler_fn("Rejecting", |_| Err(HandlerError::new("nope")));
        let result = handler.handle(BusEvent::signal(Topic::AuthLogout)).await;

        assert_eq!(handler.name(), "Rejecting");
        assert_eq!(result.unwrap_err().message(), "nope");
    }

    #[test]
    fn unsubscribe_runs_cancel_once() {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let sub = Subscription::new(SubscriptionId::new(7), Topic::UserLogin, move || {
            flag.store(true, Ordering::SeqCst)
        });

        assert_eq!(sub.id().as_u64(), 7);
        assert_eq!(sub.topic(), Topic::UserLogin);
        sub.unsubscribe();
        assert!(cancelled.load(Ordering::SeqCst));
    }

    #[test]
    fn dropping_subscription_does_not_cancel() {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        drop(Subscription::new(SubscriptionId::new(1), Topic::UserLogin, move || {
            flag.store(true, Ordering::SeqCst)
        }));
        assert!(!cancelled.load(Ordering::SeqCst));
    }
}
