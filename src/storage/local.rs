//! Local-storage backend
//!
//! A flat string key/value store (one JSON file in the data dir). The whole
//! Document is serialized into a single string under a fixed key.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::storage::backend::{Backend, BackendKind};
use crate::storage::{Document, StorageError};

pub struct LocalStorageBackend {
    path: PathBuf,
    key: String,
}

impl LocalStorageBackend {
    pub fn new(data_dir: &Path, key: impl Into<String>) -> Self {
        Self {
            path: data_dir.join("local_storage.json"),
            key: key.into(),
        }
    }

    async fn read_items(&self) -> Result<HashMap<String, String>, StorageError> {
        if !fs::try_exists(&self.path).await? {
            return Ok(HashMap::new());
        }
        let content = fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    pub async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_items().await?.remove(key))
    }

    pub async fn set_item(&self, key: &str, value: String) -> Result<(), StorageError> {
        // Unreadable store is replaced rather than blocking every write.
        let mut items = self.read_items().await.unwrap_or_else(|e| {
            tracing::warn!("Resetting unreadable local storage {}: {}", self.path.display(), e);
            HashMap::new()
        });
        items.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, serde_json::to_string(&items)?).await?;
        Ok(())
    }
}

#[async_trait]
impl Backend for LocalStorageBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::LocalStorage
    }

    async fn is_available(&self) -> bool {
        true
    }

    /// Unreadable contents load as an empty Document; the next flush
    /// replaces them.
    async fn load(&self) -> Result<Document, StorageError> {
        let raw = match self.get_item(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(Document::new()),
            Err(StorageError::Json(e)) => {
                tracing::warn!(
                    "Local storage {} is corrupted, starting empty: {}",
                    self.path.display(),
                    e
                );
                return Ok(Document::new());
            }
            Err(e) => return Err(e),
        };

        match serde_json::from_str(&raw) {
            Ok(doc) => Ok(doc),
            Err(e) => {
                tracing::warn!(
                    "Stored document under {} is corrupted, starting empty: {}",
                    self.key,
                    e
                );
                Ok(Document::new())
            }
        }
    }

    async fn flush(&self, doc: &Document) -> Result<(), StorageError> {
        let raw = serde_json::to_string(doc)?;
        self.set_item(&self.key, raw).await?;
        tracing::debug!("Flushed document to local storage key {}", self.key);
        Ok(())
    }
}
