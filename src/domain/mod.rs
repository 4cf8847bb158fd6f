//! Domain layer containing the bridge's vocabulary and state machines.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (timestamps, ids, validation, `StateMachine`)
//! - `connection` - Gateway connection state and reconnect policy
//! - `session` - Session aggregate, login payloads, timetable events
//! - `idle` - Idle supervisor state and activity signals
//! - `route` - Route request/response shapes

pub mod connection;
pub mod foundation;
pub mod idle;
pub mod route;
pub mod session;
