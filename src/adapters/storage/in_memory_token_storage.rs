//! In-Memory Token Storage Adapter
//!
//! Useful for testing and for kiosks that must forget the session on
//! restart.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::domain::session::StoredTokens;
use crate::ports::{StorageError, TokenStorage};

/// In-memory token storage
#[derive(Debug, Clone, Default)]
pub struct InMemoryTokenStorage {
    tokens: Arc<RwLock<Option<StoredTokens>>>,
    fail_writes: Arc<AtomicBool>,
    saves: Arc<AtomicUsize>,
    save_delay_ms: Arc<AtomicU64>,
}

impl InMemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that starts with `tokens` already saved
    pub fn with_tokens(tokens: StoredTokens) -> Self {
        Self {
            tokens: Arc::new(RwLock::new(Some(tokens))),
            ..Self::default()
        }
    }

    /// Make `save` and `clear` fail until switched back
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Hold every `save` for `delay` before it lands
    pub fn set_save_delay(&self, delay: Duration) {
        self.save_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Current contents, bypassing the port
    pub async fn snapshot(&self) -> Option<StoredTokens> {
        self.tokens.read().await.clone()
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Io("storage is read-only".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TokenStorage for InMemoryTokenStorage {
    async fn load(&self) -> Result<Option<StoredTokens>, StorageError> {
        Ok(self
            .tokens
            .read()
            .await
            .clone()
            .filter(StoredTokens::has_access_token))
    }

    async fn save(&self, tokens: &StoredTokens) -> Result<(), StorageError> {
        self.check_writable()?;
        let delay = self.save_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        *self.tokens.write().await = Some(tokens.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.check_writable()?;
        *self.tokens.write().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> StoredTokens {
        StoredTokens {
            access_token: "a".into(),
            refresh_token: "r".into(),
            username: None,
        }
    }

    #[tokio::test]
    async fn save_load_clear() {
        let storage = InMemoryTokenStorage::new();
        assert_eq!(storage.load().await.unwrap(), None);

        storage.save(&tokens()).await.unwrap();
        assert_eq!(storage.load().await.unwrap(), Some(tokens()));
        assert_eq!(storage.save_count(), 1);

        storage.clear().await.unwrap();
        assert_eq!(storage.snapshot().await, None);
    }

    #[tokio::test]
    async fn failing_writes_leave_contents_alone() {
        let storage = InMemoryTokenStorage::with_tokens(tokens());
        storage.set_fail_writes(true);

        assert!(storage.clear().await.is_err());
        assert_eq!(storage.load().await.unwrap(), Some(tokens()));
    }
}
