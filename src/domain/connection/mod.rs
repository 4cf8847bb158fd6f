//! Realtime gateway connection vocabulary.
//!
//! - `ConnectionState` - lifecycle of the single gateway socket
//! - `ReconnectPolicy` - how long to wait before the next attempt, and when to give up

mod reconnect;
mod state;

pub use reconnect::ReconnectPolicy;
pub use state::ConnectionState;
