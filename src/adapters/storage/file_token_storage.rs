//! File-based Token Storage Adapter
//!
//! Keeps the kiosk's `access_token`, `refresh_token` and `username` in a
//! single YAML file so a restart can restore the session.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::domain::session::StoredTokens;
use crate::ports::{StorageError, TokenStorage};

/// YAML file storage for session tokens
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    /// Create a storage backed by the file at `path`
    ///
    /// # Example
    /// ```ignore
    /// let storage = FileTokenStorage::new("./data/session.yaml");
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_parent(&self) -> Result<(), StorageError> {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)
                .await
                .map_err(|e| StorageError::Io(e.to_string())),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl TokenStorage for FileTokenStorage {
    async fn load(&self) -> Result<Option<StoredTokens>, StorageError> {
        let yaml = match fs::read_to_string(&self.path).await {
            Ok(yaml) => yaml,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io(e.to_string())),
        };

        if yaml.trim().is_empty() {
            return Ok(None);
        }

        let tokens: StoredTokens =
            serde_yaml::from_str(&yaml).map_err(|e| StorageError::Corrupt(e.to_string()))?;

        // A blank access token is the same as no token
        Ok(tokens.has_access_token().then_some(tokens))
    }

    async fn save(&self, tokens: &StoredTokens) -> Result<(), StorageError> {
        self.ensure_parent().await?;

        let yaml =
            serde_yaml::to_string(tokens).map_err(|e| StorageError::Corrupt(e.to_string()))?;

        // Write beside the target, then rename over it
        let tmp = self.path.with_extension("yaml.tmp");
        fs::write(&tmp, yaml)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }
}
