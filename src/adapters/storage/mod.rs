//! Token Storage Adapters
//!
//! Implementations of the TokenStorage port.
//!
//! ## Available Adapters
//!
//! - **FileTokenStorage** - Stores tokens as a YAML file on disk
//! - **InMemoryTokenStorage** - Stores tokens in memory (testing)
//!
//! ## Usage
//!
//! ```ignore
//! use adapters::storage::{FileTokenStorage, InMemoryTokenStorage};
//!
//! // Production: file-based storage
//! let storage = FileTokenStorage::new("./data/session.yaml");
//!
//! // Testing: in-memory storage
//! let storage = InMemoryTokenStorage::new();
//! ```

mod file_token_storage;
mod in_memory_token_storage;

pub use file_token_storage::FileTokenStorage;
pub use in_memory_token_storage::InMemoryTokenStorage;
