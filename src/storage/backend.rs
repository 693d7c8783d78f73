//! Backend abstraction
//!
//! Every place the Document can live implements [`Backend`]. The manager walks
//! a prioritized list of them once per session and keeps the first that works.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::storage::{Document, StorageError};

/// Which kind of backend is holding the Document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Filesystem,
    Cloud,
    LocalStorage,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Filesystem => write!(f, "filesystem"),
            BackendKind::Cloud => write!(f, "cloud"),
            BackendKind::LocalStorage => write!(f, "local storage"),
        }
    }
}

/// Backend trait - all persistence providers implement this
#[async_trait]
pub trait Backend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Cheap capability check run before `load`.
    async fn is_available(&self) -> bool;

    async fn load(&self) -> Result<Document, StorageError>;

    /// Write the whole Document, replacing what the backend held.
    async fn flush(&self, doc: &Document) -> Result<(), StorageError>;
}

/// Walk `providers` in order and return the first one that is available and
/// loads, together with its contents.
pub async fn select_backend(
    providers: &[Arc<dyn Backend>],
) -> Option<(Arc<dyn Backend>, Document)> {
    for provider in providers {
        let kind = provider.kind();
        if !provider.is_available().await {
            tracing::debug!("Backend {} not available, skipping", kind);
            continue;
        }
        match provider.load().await {
            Ok(doc) => {
                tracing::info!("Using {} backend ({} fields)", kind, doc.len());
                return Some((provider.clone(), doc));
            }
            Err(e) => {
                tracing::warn!("Failed to load from {} backend: {}", kind, e);
            }
        }
    }
    None
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory backend that records every flush.
    pub struct RecordingBackend {
        pub kind: BackendKind,
        pub available: AtomicBool,
        pub fail_load: AtomicBool,
        pub fail_flush: AtomicBool,
        pub stored: Mutex<Document>,
        pub flushes: Mutex<Vec<Document>>,
        pub loads: AtomicUsize,
        /// Simulated write latency
        pub flush_delay_ms: AtomicU64,
    }

    impl RecordingBackend {
        pub fn new(kind: BackendKind) -> Self {
            Self {
                kind,
                available: AtomicBool::new(true),
                fail_load: AtomicBool::new(false),
                fail_flush: AtomicBool::new(false),
                stored: Mutex::new(Document::new()),
                flushes: Mutex::new(Vec::new()),
                loads: AtomicUsize::new(0),
                flush_delay_ms: AtomicU64::new(0),
            }
        }

        pub fn with_doc(kind: BackendKind, doc: Document) -> Self {
            let backend = Self::new(kind);
            *backend.stored.lock().unwrap() = doc;
            backend
        }

        pub fn flush_count(&self) -> usize {
            self.flushes.lock().unwrap().len()
        }

        pub fn last_flush(&self) -> Option<Document> {
            self.flushes.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl Backend for RecordingBackend {
        fn kind(&self) -> BackendKind {
            self.kind
        }

        async fn is_available(&self) -> bool {
            self.available.load(Ordering::SeqCst)
        }

        async fn load(&self) -> Result<Document, StorageError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail_load.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable("load failure".into()));
            }
            Ok(self.stored.lock().unwrap().clone())
        }

        async fn flush(&self, doc: &Document) -> Result<(), StorageError> {
            let delay = self.flush_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            if self.fail_flush.load(Ordering::SeqCst) {
                return Err(StorageError::PermissionDenied("flush failure".into()));
            }
            *self.stored.lock().unwrap() = doc.clone();
            self.flushes.lock().unwrap().push(doc.clone());
            Ok(())
        }
    }
}
