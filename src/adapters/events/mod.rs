//! Event bus adapters.
//!
//! - `InMemoryEventBus` - In-process, ordered, failure-isolating bus

mod in_memory;

pub use in_memory::InMemoryEventBus;
