//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the session bridge to external systems:
//! - `events` - Event bus implementation
//! - `websocket` - Realtime gateway sockets
//! - `http` - Kiosk REST API client
//! - `storage` - Token persistence
//! - `scheduler` - Timers

pub mod events;
pub mod http;
pub mod scheduler;
pub mod storage;
pub mod websocket;

pub use events::InMemoryEventBus;
pub use http::{HttpApiConfig, HttpKioskApi, MockKioskApi};
pub use scheduler::{ManualScheduler, TokioScheduler};
pub use storage::{FileTokenStorage, InMemoryTokenStorage};
pub use websocket::{MockGatewayConnector, TungsteniteConnector};
