//! Gateway connector backed by `tokio-tungstenite`.
//!
//! Each open socket gets one pump task that forwards outbound text and
//! reports inbound frames. The pump owns the socket; the caller only sees
//! the `GatewayLink` channels.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::ports::{GatewayConnector, GatewayLink, LinkEvent, TransportError};

type Socket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens real WebSocket connections to the gateway.
#[derive(Debug, Clone)]
pub struct TungsteniteConnector {
    connect_timeout: Duration,
}

impl TungsteniteConnector {
    pub fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }
}

impl Default for TungsteniteConnector {
    fn default() -> Self {
        Self::new()
    }
}

/// Only `ws` and `wss` URLs are accepted.
fn parse_gateway_url(raw: &str) -> Result<Url, TransportError> {
    let url = Url::parse(raw).map_err(|e| TransportError::InvalidUrl(format!("{}: {}", raw, e)))?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(TransportError::InvalidUrl(format!(
            "unsupported scheme `{}` in {}",
            other, raw
        ))),
    }
}

#[async_trait]
impl GatewayConnector for TungsteniteConnector {
    async fn open(&self, url: &str) -> Result<GatewayLink, TransportError> {
        let url = parse_gateway_url(url)?;

        let (socket, _response) = timeout(self.connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| TransportError::Timeout(self.connect_timeout))?
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        tokio::spawn(pump(socket, out_rx, in_tx));

        Ok(GatewayLink::new(out_tx, in_rx))
    }
}

/// Runs for the lifetime of one socket.
///
/// Ends when the peer closes, the socket errors, or the owner drops its
/// outbound sender. Only the first two report `LinkEvent::Closed`.
async fn pump(
    socket: Socket,
    mut outbound: mpsc::UnboundedReceiver<String>,
    inbound: mpsc::UnboundedSender<LinkEvent>,
) {
    let (mut sink, mut stream) = socket.split();

    let closed = loop {
        tokio::select! {
            next = outbound.recv() => match next {
                Some(text) => {
                    if let Err(e) = sink.send(Message::Text(text)).await {
                        let _ = inbound.send(LinkEvent::Error(e.to_string()));
                        break Some(LinkEvent::Closed { code: None, reason: "send failed".into() });
                    }
                }
                None => {
                    // Owner discarded the link
                    let _ = sink.send(Message::Close(None)).await;
                    break None;
                }
            },
            next = stream.next() => match next {
                Some(Ok(Message::Text(text))) => {
                    if inbound.send(LinkEvent::Frame(text)).is_err() {
                        break None;
                    }
                }
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                    Ok(text) => {
                        if inbound.send(LinkEvent::Frame(text)).is_err() {
                            break None;
                        }
                    }
                    Err(_) => tracing::warn!("Dropping non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = match frame {
                        Some(f) => (Some(u16::from(f.code)), f.reason.into_owned()),
                        None => (None, String::new()),
                    };
                    break Some(LinkEvent::Closed { code, reason });
                }
                Some(Ok(_)) => {
                    // Ping/pong are answered by tungstenite
                }
                Some(Err(e)) => {
                    let _ = inbound.send(LinkEvent::Error(e.to_string()));
                    break Some(LinkEvent::Closed { code: None, reason: e.to_string() });
                }
                None => break Some(LinkEvent::Closed { code: None, reason: "stream ended".into() }),
            },
        }
    };

    if let Some(event) = closed {
        let _ = inbound.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ws_and_wss() {
        assert!(parse_gateway_url("ws://localhost:8000/ws/unimate/").is_ok());
        assert!(parse_gateway_url("wss://campus.example/ws/kiosk/k1/").is_ok());
    }

    #[test]
    fn rejects_http_and_garbage() {
        assert!(matches!(
            parse_gateway_url("http://localhost:8000/ws/unimate/"),
            Err(TransportError::InvalidUrl(_))
        ));
        assert!(matches!(
            parse_gateway_url("not a url"),
            Err(TransportError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn open_reports_invalid_url_without_connecting() {
        let connector = TungsteniteConnector::new();
        let err = connector.open("ftp://nowhere/").await.unwrap_err();
        assert!(matches!(err, TransportError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn open_reports_refused_connection() {
        // Port 9 (discard) is closed on test hosts
        let connector = TungsteniteConnector::new().with_connect_timeout(Duration::from_secs(2));
        let result = connector.open("ws://127.0.0.1:9/ws/unimate/").await;
        assert!(matches!(
            result,
            Err(TransportError::ConnectFailed(_)) | Err(TransportError::Timeout(_))
        ));
    }
}
