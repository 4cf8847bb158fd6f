//! GatewayConnector port - Interface for opening the realtime socket.
//!
//! An open `GatewayLink` is a pair of channels. Frames written to
//! `outbound` are sent as text; everything the socket reports arrives on
//! `inbound`, ending with a single `LinkEvent::Closed`. Dropping the
//! `outbound` sender closes the socket.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Something the socket reported after it opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// One text frame.
    Frame(String),
    /// A transport error. A `Closed` always follows.
    Error(String),
    /// The socket is gone.
    Closed { code: Option<u16>, reason: String },
}

/// Channels for one open socket.
#[derive(Debug)]
pub struct GatewayLink {
    pub outbound: mpsc::UnboundedSender<String>,
    pub inbound: mpsc::UnboundedReceiver<LinkEvent>,
}

impl GatewayLink {
    pub fn new(
        outbound: mpsc::UnboundedSender<String>,
        inbound: mpsc::UnboundedReceiver<LinkEvent>,
    ) -> Self {
        Self { outbound, inbound }
    }
}

/// Failure to open or use the socket.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("invalid gateway url: {0}")]
    InvalidUrl(String),

    #[error("connect failed: {0}")]
    ConnectFailed(String),

    #[error("connect timed out after {0:?}")]
    Timeout(Duration),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("socket closed")]
    Closed,
}

/// Port for opening sockets to the realtime gateway.
#[async_trait]
pub trait GatewayConnector: Send + Sync {
    /// Open one socket. Resolves once the handshake completes or fails.
    async fn open(&self, url: &str) -> Result<GatewayLink, TransportError>;
}
