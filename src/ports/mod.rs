//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the bridge components and the outside world. Adapters implement these
//! ports.
//!
//! ## Event Ports
//!
//! - `EventPublisher` - Publish a `BusEvent` to every subscriber of its topic
//! - `EventSubscriber` - Register an `EventHandler` for a topic
//! - `EventBus` - Both of the above
//!
//! ## External Collaborators
//!
//! - `GatewayConnector` - Opens one socket to the realtime gateway
//! - `KioskApi` - The backend REST endpoints (login, events, route)
//! - `TokenStorage` - Durable client-side token storage
//!
//! ## Time
//!
//! - `Scheduler` - Cancelable delayed tasks (reconnect delay, idle timeout)

mod event_publisher;
mod event_subscriber;
mod gateway;
mod kiosk_api;
mod scheduler;
mod token_storage;

pub use event_publisher::{BusEvent, EventPublisher, PublishReport, Topic};
pub use event_subscriber::{
    handler_fn, EventBus, EventHandler, EventSubscriber, HandlerError, Subscription,
    SubscriptionId,
};
pub use gateway::{GatewayConnector, GatewayLink, LinkEvent, TransportError};
pub use kiosk_api::{ApiError, KioskApi};
pub use scheduler::{ScheduledTask, Scheduler, TimerHandle, TimerId};
pub use token_storage::{StorageError, TokenStorage};
