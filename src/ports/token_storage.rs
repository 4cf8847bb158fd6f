//! TokenStorage port - Durable client-side storage for session tokens.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::session::StoredTokens;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("storage io failed: {0}")]
    Io(String),

    #[error("stored tokens are malformed: {0}")]
    Corrupt(String),
}

/// Port for persisting tokens across restarts.
///
/// `load` returns `Ok(None)` when nothing has been saved. `clear` on an
/// empty store succeeds.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    async fn load(&self) -> Result<Option<StoredTokens>, StorageError>;

    async fn save(&self, tokens: &StoredTokens) -> Result<(), StorageError>;

    async fn clear(&self) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn TokenStorage) {}
}
