//! ConnectionManager - One logical connection to the realtime gateway.
//!
//! Owns at most one socket and at most one pending reconnect timer. Raw
//! frames go to the `MessageRouter`; everything else the outside world
//! sees are the `connection-*` topics on the bus.
//!
//! Every socket belongs to a generation. Anything that ends or replaces a
//! socket bumps the generation, so late results from an older socket
//! (an open that completes after `disconnect`, a close after an error) are
//! ignored.

use futures::FutureExt;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use super::MessageRouter;
use crate::adapters::websocket::OutboundMessage;
use crate::domain::connection::{ConnectionState, ReconnectPolicy};
use crate::domain::foundation::StateMachine;
use crate::ports::{
    BusEvent, EventPublisher, GatewayConnector, GatewayLink, LinkEvent, Scheduler, TimerHandle,
    Topic, TransportError,
};

/// Behaviour knobs for a `ConnectionManager`.
#[derive(Debug, Clone, Default)]
pub struct ConnectionSettings {
    pub policy: ReconnectPolicy,
    /// When set, `register_kiosk` is sent on every open.
    pub kiosk_id: Option<String>,
    /// When true, `connect` is a no-op and nothing reconnects.
    pub disabled: bool,
}

struct ActiveLink {
    outbound: mpsc::UnboundedSender<String>,
    // Dropping this stops the reader task
    _stop: oneshot::Sender<()>,
}

#[derive(Default)]
struct Inner {
    state: ConnectionState,
    url: Option<String>,
    generation: u64,
    link: Option<ActiveLink>,
    reconnect: Option<TimerHandle>,
    attempts: u32,
    stopped: bool,
    disabled: bool,
}

impl Inner {
    fn move_to(&mut self, next: ConnectionState) {
        if self.state == next {
            return;
        }
        match self.state.transition_to(next) {
            Ok(state) => self.state = state,
            Err(e) => tracing::error!(error = %e, "Rejected connection state change"),
        }
    }

    /// Starts a new attempt and returns its generation.
    fn begin_attempt(&mut self) -> u64 {
        self.generation += 1;
        self.move_to(ConnectionState::Connecting);
        self.generation
    }

    fn cancel_reconnect(&mut self) {
        if let Some(timer) = self.reconnect.take() {
            timer.cancel();
        }
    }

    fn reconnect_pending(&self) -> bool {
        self.reconnect.as_ref().is_some_and(TimerHandle::is_pending)
    }

    /// Drops the current socket, if any. Returns true if there was one.
    fn discard_link(&mut self) -> bool {
        self.link.take().is_some()
    }
}

enum Failure {
    Refused(TransportError),
    Errored(String),
    Closed { code: Option<u16>, reason: String },
}

impl Failure {
    fn reason(&self) -> String {
        match self {
            Failure::Refused(e) => e.to_string(),
            Failure::Errored(message) => message.clone(),
            Failure::Closed { reason, .. } => reason.clone(),
        }
    }

    fn code(&self) -> Option<u16> {
        match self {
            Failure::Closed { code, .. } => *code,
            _ => None,
        }
    }
}

enum Retry {
    Scheduled { attempt: u32, delay: Duration },
    AlreadyPending,
    Suppressed,
    Exhausted { attempts: u32 },
}

struct Shared {
    connector: Arc<dyn GatewayConnector>,
    scheduler: Arc<dyn Scheduler>,
    publisher: Arc<dyn EventPublisher>,
    router: MessageRouter,
    policy: ReconnectPolicy,
    registration: Option<String>,
    inner: Mutex<Inner>,
}

/// Maintains the kiosk's realtime connection.
///
/// Cheap to clone; clones share the same connection.
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

impl ConnectionManager {
    pub fn new(
        connector: Arc<dyn GatewayConnector>,
        scheduler: Arc<dyn Scheduler>,
        publisher: Arc<dyn EventPublisher>,
        router: MessageRouter,
        settings: ConnectionSettings,
    ) -> Self {
        let registration = settings.kiosk_id.and_then(|id| {
            serde_json::to_string(&OutboundMessage::register(id))
                .map_err(|e| tracing::error!(error = %e, "Cannot encode kiosk registration"))
                .ok()
        });

        Self {
            shared: Arc::new(Shared {
                connector,
                scheduler,
                publisher,
                router,
                policy: settings.policy,
                registration,
                inner: Mutex::new(Inner {
                    disabled: settings.disabled,
                    ..Inner::default()
                }),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    // === Accessors ===

    pub fn state(&self) -> ConnectionState {
        self.lock().state
    }

    /// Reconnect attempts made since the last successful open.
    pub fn attempts(&self) -> u32 {
        self.lock().attempts
    }

    pub fn is_reconnect_pending(&self) -> bool {
        self.lock().reconnect_pending()
    }

    pub fn is_disabled(&self) -> bool {
        self.lock().disabled
    }

    /// The last URL passed to `connect`.
    pub fn url(&self) -> Option<String> {
        self.lock().url.clone()
    }

    // === Commands ===

    /// Opens the connection unless one is already open or opening.
    ///
    /// Returns true if an attempt was started. Resolves once that attempt
    /// has opened or failed.
    pub async fn connect(&self, url: &str) -> bool {
        let generation = {
            let mut inner = self.lock();
            if inner.disabled {
                tracing::debug!("Realtime connection disabled, not connecting");
                return false;
            }
            if inner.state.is_active() {
                tracing::debug!(state = %inner.state, "Already connected or connecting");
                return false;
            }
            inner.stopped = false;
            inner.attempts = 0;
            inner.url = Some(url.to_string());
            inner.cancel_reconnect();
            inner.begin_attempt()
        };

        tracing::info!(url, "Connecting to gateway");
        self.open(generation, url.to_string()).await;
        true
    }

    /// Caller-driven teardown. Cancels any pending reconnect; nothing
    /// reconnects until `connect` is called again.
    pub async fn disconnect(&self) {
        let (was_connected, had_attempt) = {
            let mut inner = self.lock();
            inner.stopped = true;
            inner.cancel_reconnect();
            inner.generation += 1;
            inner.attempts = 0;
            let was_connected = inner.state == ConnectionState::Connected;
            let had_attempt = inner.discard_link() || inner.state == ConnectionState::Connecting;
            inner.move_to(ConnectionState::Disconnected);
            (was_connected, had_attempt)
        };

        if had_attempt {
            tracing::info!("Gateway connection closed by caller");
            self.publish(
                Topic::ConnectionClosed,
                json!({ "reason": "disconnect", "code": null, "was_connected": was_connected }),
            )
            .await;
        }
    }

    /// Drops the current socket, resets the retry budget and connects again
    /// to the last URL. Returns false if there is nothing to reconnect to.
    pub async fn force_reconnect(&self) -> bool {
        let url = {
            let mut inner = self.lock();
            if inner.disabled {
                return false;
            }
            let Some(url) = inner.url.clone() else {
                return false;
            };
            inner.cancel_reconnect();
            inner.generation += 1;
            inner.discard_link();
            inner.move_to(ConnectionState::Disconnected);
            url
        };

        tracing::info!("Forcing gateway reconnect");
        self.connect(&url).await
    }

    /// Serializes and sends a message. Returns false unless connected.
    pub fn send<T: Serialize>(&self, message: &T) -> bool {
        match serde_json::to_string(message) {
            Ok(text) => self.send_text(text),
            Err(e) => {
                tracing::warn!(error = %e, "Cannot encode outbound message");
                false
            }
        }
    }

    /// Sends a raw text frame. Returns false unless connected.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        let inner = self.lock();
        if !inner.state.can_send() {
            return false;
        }
        inner
            .link
            .as_ref()
            .is_some_and(|link| link.outbound.send(text.into()).is_ok())
    }

    // === Socket lifecycle ===

    async fn open(&self, generation: u64, url: String) {
        match self.shared.connector.open(&url).await {
            Ok(link) => self.on_open(generation, url, link).await,
            Err(e) => {
                tracing::warn!(error = %e, "Gateway connect failed");
                self.on_failure(generation, Failure::Refused(e)).await;
            }
        }
    }

    async fn on_open(&self, generation: u64, url: String, link: GatewayLink) {
        let GatewayLink { outbound, inbound } = link;
        let (stop_tx, stop_rx) = oneshot::channel();

        {
            let mut inner = self.lock();
            if inner.generation != generation || inner.state != ConnectionState::Connecting {
                tracing::debug!("Discarding socket from a superseded attempt");
                return;
            }
            inner.move_to(ConnectionState::Connected);
            inner.attempts = 0;
            if let Some(frame) = &self.shared.registration {
                if outbound.send(frame.clone()).is_err() {
                    tracing::warn!("Kiosk registration could not be queued");
                }
            }
            inner.link = Some(ActiveLink {
                outbound,
                _stop: stop_tx,
            });
        }

        tracing::info!(url = %url, "Gateway connection opened");
        self.publish(Topic::ConnectionOpened, json!({ "url": url }))
            .await;

        tokio::spawn(self.clone().read_loop(generation, inbound, stop_rx));
    }

    async fn read_loop(
        self,
        generation: u64,
        mut inbound: mpsc::UnboundedReceiver<LinkEvent>,
        mut stop: oneshot::Receiver<()>,
    ) {
        loop {
            let event = tokio::select! {
                biased;
                _ = &mut stop => break,
                event = inbound.recv() => event,
            };

            match event {
                Some(LinkEvent::Frame(text)) => {
                    tracing::debug!(len = text.len(), "Gateway frame received");
                    self.shared.router.handle_frame(&text).await;
                }
                Some(LinkEvent::Error(message)) => {
                    tracing::warn!(error = %message, "Gateway socket error");
                    self.on_failure(generation, Failure::Errored(message)).await;
                    self.await_trailing_close(generation, &mut inbound).await;
                    break;
                }
                Some(LinkEvent::Closed { code, reason }) => {
                    self.on_failure(generation, Failure::Closed { code, reason })
                        .await;
                    break;
                }
                None => {
                    let reason = "link dropped".to_string();
                    self.on_failure(generation, Failure::Closed { code: None, reason })
                        .await;
                    break;
                }
            }
        }
    }

    /// The transport queues a close right behind an error. That close
    /// settles `Errored` into `Disconnected` unless a reconnect already
    /// started. Nothing sent after the error is read.
    async fn await_trailing_close(
        &self,
        generation: u64,
        inbound: &mut mpsc::UnboundedReceiver<LinkEvent>,
    ) {
        inbound.close();
        let mut closed = false;
        while let Some(event) = inbound.recv().await {
            if matches!(event, LinkEvent::Closed { .. }) {
                closed = true;
                break;
            }
        }
        if !closed {
            return;
        }
        let mut inner = self.lock();
        if inner.generation == generation + 1 && inner.state == ConnectionState::Errored {
            inner.move_to(ConnectionState::Disconnected);
        }
    }

    async fn on_failure(&self, generation: u64, failure: Failure) {
        let (was_connected, retry) = {
            let mut inner = self.lock();
            if inner.generation != generation {
                tracing::debug!("Ignoring failure from a superseded socket");
                return;
            }
            inner.generation += 1;
            let was_connected = inner.state == ConnectionState::Connected;
            inner.discard_link();
            match &failure {
                Failure::Closed { .. } => inner.move_to(ConnectionState::Disconnected),
                _ => inner.move_to(ConnectionState::Errored),
            }
            let retry = self.plan_reconnect(&mut inner);
            (was_connected, retry)
        };

        let retry_in_ms = match &retry {
            Retry::Scheduled { attempt, delay } => {
                tracing::info!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Gateway reconnect scheduled"
                );
                Some(delay.as_millis() as u64)
            }
            _ => None,
        };

        tracing::info!(
            reason = %failure.reason(),
            code = ?failure.code(),
            "Gateway connection closed"
        );
        self.publish(
            Topic::ConnectionClosed,
            json!({
                "reason": failure.reason(),
                "code": failure.code(),
                "was_connected": was_connected,
                "retry_in_ms": retry_in_ms,
            }),
        )
        .await;

        if let Retry::Exhausted { attempts } = retry {
            tracing::warn!(attempts, "Gateway unreachable, giving up");
            self.publish(Topic::ConnectionFailed, json!({ "attempts": attempts }))
                .await;
        }
    }

    fn plan_reconnect(&self, inner: &mut Inner) -> Retry {
        if inner.stopped || inner.disabled || inner.url.is_none() {
            return Retry::Suppressed;
        }
        if inner.reconnect_pending() {
            return Retry::AlreadyPending;
        }

        let attempt = inner.attempts + 1;
        match self.shared.policy.delay_for(attempt) {
            Some(delay) => {
                inner.attempts = attempt;
                inner.reconnect = Some(self.schedule_reconnect(delay));
                Retry::Scheduled { attempt, delay }
            }
            None => {
                inner.move_to(ConnectionState::Disconnected);
                Retry::Exhausted {
                    attempts: inner.attempts,
                }
            }
        }
    }

    fn schedule_reconnect(&self, delay: Duration) -> TimerHandle {
        let shared = Arc::downgrade(&self.shared);
        self.shared.scheduler.schedule(
            delay,
            async move {
                if let Some(shared) = shared.upgrade() {
                    ConnectionManager { shared }.reconnect_due().await;
                }
            }
            .boxed(),
        )
    }

    async fn reconnect_due(&self) {
        let (generation, url, attempt) = {
            let mut inner = self.lock();
            match inner.reconnect.as_ref() {
                Some(timer) if timer.has_fired() => inner.reconnect = None,
                _ => return,
            }
            if inner.stopped || inner.disabled || inner.state.is_active() {
                return;
            }
            let Some(url) = inner.url.clone() else {
                return;
            };
            (inner.begin_attempt(), url, inner.attempts)
        };

        tracing::info!(attempt, "Reconnecting to gateway");
        self.open(generation, url).await;
    }

    async fn publish(&self, topic: Topic, payload: JsonValue) {
        self.shared
            .publisher
            .publish(BusEvent::new(topic, payload))
            .await;
    }
}
