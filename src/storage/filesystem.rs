//! Local-filesystem backend
//!
//! Keeps the Document as one pretty-printed JSON file inside a directory the
//! user picked. The chosen directory is remembered in `handles.json` so later
//! sessions can reuse it, and its permission is re-checked before every use.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;
use tokio::fs;

use crate::storage::backend::{Backend, BackendKind};
use crate::storage::{Document, StorageError};

/// On-disk shape of handles.json
#[derive(Debug, Default, Serialize, Deserialize)]
struct HandleFile {
    #[serde(default)]
    data_directory: Option<PathBuf>,
}

/// Durable store for the user-chosen directory
#[derive(Debug, Clone)]
pub struct HandleStore {
    path: PathBuf,
}

impl HandleStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("handles.json"),
        }
    }

    /// The remembered directory, if any
    pub async fn get(&self) -> Option<PathBuf> {
        let content = fs::read_to_string(&self.path).await.ok()?;
        match serde_json::from_str::<HandleFile>(&content) {
            Ok(file) => file.data_directory,
            Err(e) => {
                tracing::warn!("Ignoring corrupted handle file {}: {}", self.path.display(), e);
                None
            }
        }
    }

    pub async fn set(&self, dir: Option<&Path>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let file = HandleFile {
            data_directory: dir.map(Path::to_path_buf),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&file)?).await?;
        Ok(())
    }
}

/// Check that `dir` is still an existing, writable directory.
pub async fn validate_permission(dir: &Path) -> Result<(), StorageError> {
    let meta = fs::metadata(dir).await.map_err(|e| {
        StorageError::PermissionDenied(format!("{}: {}", dir.display(), e))
    })?;
    if !meta.is_dir() {
        return Err(StorageError::PermissionDenied(format!(
            "{} is not a directory",
            dir.display()
        )));
    }
    if meta.permissions().readonly() {
        return Err(StorageError::PermissionDenied(format!(
            "{} is read-only",
            dir.display()
        )));
    }
    Ok(())
}

/// Filesystem backend
pub struct FilesystemBackend {
    handles: HandleStore,
    file_name: String,
    /// mtime of the file as we last read or wrote it
    last_seen: Mutex<Option<SystemTime>>,
}

impl FilesystemBackend {
    pub fn new(handles: HandleStore, file_name: impl Into<String>) -> Self {
        Self {
            handles,
            file_name: file_name.into(),
            last_seen: Mutex::new(None),
        }
    }

    /// Resolve the data file after re-validating the directory permission.
    async fn data_file(&self) -> Result<PathBuf, StorageError> {
        let dir = self
            .handles
            .get()
            .await
            .ok_or_else(|| StorageError::Unavailable("no directory chosen".into()))?;
        validate_permission(&dir).await?;
        Ok(dir.join(&self.file_name))
    }

    async fn remember_mtime(&self, path: &Path) {
        let mtime = fs::metadata(path).await.and_then(|m| m.modified()).ok();
        if let Ok(mut last_seen) = self.last_seen.lock() {
            *last_seen = mtime;
        }
    }

    /// Whether the file changed on disk since we last touched it
    async fn changed_externally(&self, path: &Path) -> bool {
        let current = match fs::metadata(path).await.and_then(|m| m.modified()) {
            Ok(mtime) => mtime,
            Err(_) => return false,
        };
        match self.last_seen.lock() {
            Ok(last_seen) => last_seen.map_or(false, |seen| seen != current),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl Backend for FilesystemBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Filesystem
    }

    async fn is_available(&self) -> bool {
        match self.data_file().await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("Filesystem backend unavailable: {}", e);
                false
            }
        }
    }

    async fn load(&self) -> Result<Document, StorageError> {
        let path = self.data_file().await?;
        if !fs::try_exists(&path).await? {
            tracing::info!("{} not found, starting with an empty document", path.display());
            return Ok(Document::new());
        }

        let content = fs::read_to_string(&path).await?;
        let doc: Document = if content.trim().is_empty() {
            Document::new()
        } else {
            serde_json::from_str(&content)?
        };
        self.remember_mtime(&path).await;

        tracing::debug!("Loaded document from {}", path.display());
        Ok(doc)
    }

    async fn flush(&self, doc: &Document) -> Result<(), StorageError> {
        let path = self.data_file().await?;

        // No cross-tab locking: last flush wins, we only make the overwrite visible.
        if self.changed_externally(&path).await {
            tracing::warn!(
                "{} was modified by another writer, overwriting with this session's state",
                path.display()
            );
        }

        let json = serde_json::to_string_pretty(doc)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &path).await?;
        self.remember_mtime(&path).await;

        tracing::debug!("Flushed document to {}", path.display());
        Ok(())
    }
}
