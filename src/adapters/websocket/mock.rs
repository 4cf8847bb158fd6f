//! Scripted gateway connector for tests.
//!
//! Every accepted open yields a `MockServerLink`, the gateway's side of the
//! socket: tests push frames, errors and closes through it and read what
//! the kiosk sent.
//!
//! # Example
//!
//! ```ignore
//! let connector = MockGatewayConnector::new();
//! connector.refuse_next(TransportError::ConnectFailed("refused".into()));
//!
//! manager.connect("ws://gw/ws/unimate/").await;   // refused
//! // ... reconnect fires, accepted by default ...
//! connector.last_link().unwrap().push_frame(r#"{"type":"user.login","message":{}}"#);
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

use crate::ports::{GatewayConnector, GatewayLink, LinkEvent, TransportError};

/// Scripted outcome of one `open` call.
#[derive(Debug, Clone)]
pub enum MockOpen {
    Accept,
    Refuse(TransportError),
}

/// Gateway side of one accepted socket.
#[derive(Debug, Clone)]
pub struct MockServerLink {
    url: String,
    to_client: mpsc::UnboundedSender<LinkEvent>,
    from_client: Arc<Mutex<ClientFrames>>,
}

#[derive(Debug)]
struct ClientFrames {
    rx: mpsc::UnboundedReceiver<String>,
    seen: Vec<String>,
}

impl MockServerLink {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Deliver a text frame to the kiosk. Returns `false` if it hung up.
    pub fn push_frame(&self, frame: impl Into<String>) -> bool {
        self.to_client.send(LinkEvent::Frame(frame.into())).is_ok()
    }

    /// Report a socket error.
    pub fn push_error(&self, message: impl Into<String>) -> bool {
        self.to_client.send(LinkEvent::Error(message.into())).is_ok()
    }

    /// Close from the gateway side.
    pub fn close(&self, code: Option<u16>, reason: impl Into<String>) -> bool {
        self.to_client
            .send(LinkEvent::Closed {
                code,
                reason: reason.into(),
            })
            .is_ok()
    }

    /// Frames the kiosk has sent so far, in order.
    pub fn sent_frames(&self) -> Vec<String> {
        let mut frames = self.from_client.lock().unwrap_or_else(|e| e.into_inner());
        while let Ok(frame) = frames.rx.try_recv() {
            frames.seen.push(frame);
        }
        frames.seen.clone()
    }

    /// True while the kiosk still holds this socket.
    pub fn is_live(&self) -> bool {
        !self.to_client.is_closed()
    }
}

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<MockOpen>,
    links: Vec<MockServerLink>,
    attempts: Vec<String>,
}

/// Mock connector. Accepts every open unless scripted otherwise.
#[derive(Debug, Clone, Default)]
pub struct MockGatewayConnector {
    state: Arc<Mutex<MockState>>,
}

impl MockGatewayConnector {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Script the outcome of the next unscripted open.
    pub fn push_outcome(&self, outcome: MockOpen) {
        self.state().script.push_back(outcome);
    }

    pub fn refuse_next(&self, error: TransportError) {
        self.push_outcome(MockOpen::Refuse(error));
    }

    /// URLs of every `open` call, accepted or not.
    pub fn attempts(&self) -> Vec<String> {
        self.state().attempts.clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.state().attempts.len()
    }

    pub fn link(&self, index: usize) -> Option<MockServerLink> {
        self.state().links.get(index).cloned()
    }

    pub fn last_link(&self) -> Option<MockServerLink> {
        self.state().links.last().cloned()
    }

    pub fn accepted_count(&self) -> usize {
        self.state().links.len()
    }

    /// Sockets the kiosk still holds.
    pub fn live_links(&self) -> usize {
        self.state().links.iter().filter(|l| l.is_live()).count()
    }
}

#[async_trait]
impl GatewayConnector for MockGatewayConnector {
    async fn open(&self, url: &str) -> Result<GatewayLink, TransportError> {
        let mut state = self.state();
        state.attempts.push(url.to_string());

        if let Some(MockOpen::Refuse(error)) = state.script.pop_front() {
            return Err(error);
        }

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        state.links.push(MockServerLink {
            url: url.to_string(),
            to_client: in_tx,
            from_client: Arc::new(Mutex::new(ClientFrames {
                rx: out_rx,
                seen: Vec::new(),
            })),
        });

        Ok(GatewayLink::new(out_tx, in_rx))
    }
}
