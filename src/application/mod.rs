//! Application layer - The bridge's components.
//!
//! Each component owns one concern and talks to the others only through
//! the event bus. `KioskApp` constructs them once and wires them together.
//!
//! - `ConnectionManager` - single gateway socket with reconnect policy
//! - `MessageRouter` - raw frames to typed bus events
//! - `SessionStore` - who is logged in
//! - `IdleSupervisor` - forced logout after inactivity
//! - `RouteService` - directions for map consumers

mod connection_manager;
mod idle_supervisor;
mod kiosk_app;
mod message_router;
mod route_service;
mod session_store;

pub use connection_manager::{ConnectionManager, ConnectionSettings};
pub use idle_supervisor::{ExpireAction, IdleSupervisor};
pub use kiosk_app::{KioskApp, KioskPorts, KioskSettings, KioskStatus, StartupError, StartupReport};
pub use message_router::{Dispatch, MessageRouter};
pub use route_service::RouteService;
pub use session_store::{SessionSettings, SessionStore};
