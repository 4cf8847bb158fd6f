//! Realtime gateway adapters.
//!
//! # Components
//!
//! - [`messages`] - Gateway wire protocol types
//! - [`tungstenite`] - Real sockets via `tokio-tungstenite`
//! - [`mock`] - Scripted sockets for tests

pub mod messages;
pub mod mock;
pub mod tungstenite;

pub use messages::{DecodeError, InboundMessage, OutboundMessage, USER_LOGIN};
pub use mock::{MockGatewayConnector, MockOpen, MockServerLink};
pub use tungstenite::TungsteniteConnector;
