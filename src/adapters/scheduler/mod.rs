//! Scheduler adapters.
//!
//! - `TokioScheduler` - Real timers on the tokio runtime
//! - `ManualScheduler` - Virtual clock advanced by tests

mod manual;
mod tokio_scheduler;

pub use manual::ManualScheduler;
pub use tokio_scheduler::TokioScheduler;
