//! In-process event bus.
//!
//! Delivery is synchronous from the publisher's point of view: `publish`
//! returns after every subscriber of the topic has run, in subscription
//! order. A failing or panicking handler is logged and skipped.

use async_trait::async_trait;
use futures::FutureExt;
use std::collections::{HashMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::ports::{
    BusEvent, EventHandler, EventPublisher, EventSubscriber, PublishReport, Subscription,
    SubscriptionId, Topic,
};

const DEFAULT_HISTORY: usize = 256;

struct Registration {
    id: SubscriptionId,
    handler: Arc<dyn EventHandler>,
}

type HandlerTable = HashMap<Topic, Vec<Registration>>;

/// In-memory event bus.
///
/// Features:
/// - Ordered, awaited delivery per topic
/// - Handler error and panic isolation
/// - Bounded history of published events for inspection
///
/// # Example
///
/// ```ignore
/// let bus = Arc::new(InMemoryEventBus::new());
/// let sub = bus.subscribe(Topic::AuthLogout, handler);
///
/// bus.publish(BusEvent::signal(Topic::AuthLogout)).await;
///
/// assert!(bus.has_event(Topic::AuthLogout));
/// sub.unsubscribe();
/// ```
pub struct InMemoryEventBus {
    handlers: Arc<RwLock<HandlerTable>>,
    published: RwLock<VecDeque<BusEvent>>,
    history_limit: usize,
    next_id: AtomicU64,
}

impl InMemoryEventBus {
    /// Creates a new empty event bus.
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY)
    }

    /// Creates a bus that keeps at most `limit` published events.
    pub fn with_history_limit(limit: usize) -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
            published: RwLock::new(VecDeque::new()),
            history_limit: limit,
            next_id: AtomicU64::new(1),
        }
    }

    fn read_handlers(&self) -> RwLockReadGuard<'_, HandlerTable> {
        self.handlers.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_published(&self) -> RwLockWriteGuard<'_, VecDeque<BusEvent>> {
        self.published.write().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, event: &BusEvent) {
        if self.history_limit == 0 {
            return;
        }
        let mut published = self.write_published();
        while published.len() >= self.history_limit {
            published.pop_front();
        }
        published.push_back(event.clone());
    }

    // === Inspection ===

    /// Returns the retained published events, oldest first.
    pub fn published_events(&self) -> Vec<BusEvent> {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// Returns retained events for one topic.
    pub fn events_of_topic(&self, topic: Topic) -> Vec<BusEvent> {
        self.published_events()
            .into_iter()
            .filter(|e| e.topic == topic)
            .collect()
    }

    /// Topics of retained events, in publish order.
    pub fn topics(&self) -> Vec<Topic> {
        self.published_events().iter().map(|e| e.topic).collect()
    }

    /// Clears retained events.
    pub fn clear(&self) {
        self.write_published().clear();
    }

    pub fn event_count(&self) -> usize {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn has_event(&self, topic: Topic) -> bool {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|e| e.topic == topic)
    }

    /// Number of handlers currently registered for a topic.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.read_handlers().get(&topic).map_or(0, Vec::len)
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: BusEvent) -> PublishReport {
        self.record(&event);

        // Clone handlers to release lock before await points
        let topic_handlers: Vec<Arc<dyn EventHandler>> = {
            let handlers = self.read_handlers();
            handlers
                .get(&event.topic)
                .map(|regs| regs.iter().map(|r| Arc::clone(&r.handler)).collect())
                .unwrap_or_default()
        };

        let mut report = PublishReport::default();
        for handler in topic_handlers {
            let outcome = AssertUnwindSafe(handler.handle(event.clone()))
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    tracing::warn!(
                        topic = %event.topic,
                        handler = handler.name(),
                        error = %e,
                        "Event handler failed"
                    );
                }
                Err(_) => {
                    report.failed += 1;
                    tracing::error!(
                        topic = %event.topic,
                        handler = handler.name(),
                        "Event handler panicked"
                    );
                }
            }
        }

        tracing::trace!(
            topic = %event.topic,
            delivered = report.delivered,
            failed = report.failed,
            "Event published"
        );
        report
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, topic: Topic, handler: Arc<dyn EventHandler>) -> Subscription {
        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        {
            let mut handlers = self.handlers.write().unwrap_or_else(|e| e.into_inner());
            handlers
                .entry(topic)
                .or_default()
                .push(Registration { id, handler });
        }

        let table = Arc::downgrade(&self.handlers);
        Subscription::new(id, topic, move || {
            if let Some(table) = table.upgrade() {
                let mut handlers = table.write().unwrap_or_else(|e| e.into_inner());
                if let Some(regs) = handlers.get_mut(&topic) {
                    regs.retain(|r| r.id != id);
                }
            }
        })
    }
}
