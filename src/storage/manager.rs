//! Persistence manager
//!
//! Owns the in-memory Document cache for one session. `load` and `save` only
//! touch the cache; a background worker flushes the latest snapshot to the
//! selected backend once the debounce window has been quiet.
//!
//! Flush scheduling: `Idle -> Pending -> Writing -> Idle`. A save while
//! `Pending` re-arms the timer; a save while `Writing` is queued on the
//! channel and starts another `Pending` round once the write completes.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;

use crate::storage::backend::{select_backend, Backend, BackendKind};
use crate::storage::cloud::{CloudBackend, CloudSession};
use crate::storage::filesystem::{validate_permission, FilesystemBackend, HandleStore};
use crate::storage::local::LocalStorageBackend;
use crate::storage::settings::StorageSettings;
use crate::storage::{Document, StorageError};

/// Where the flush worker currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlushState {
    Idle,
    Pending,
    Writing,
}

enum Command {
    Saved,
    Shutdown(oneshot::Sender<()>),
}

#[derive(Default)]
struct Cache {
    doc: Document,
    /// Backend chosen for this session
    backend: Option<Arc<dyn Backend>>,
    /// First population has been tried
    attempted: bool,
    /// Fields saved since the last population or successful flush
    unsynced: HashSet<String>,
}

impl Cache {
    /// Adopt a backend. Its contents replace the cache, except for fields
    /// saved that no backend has received yet.
    fn adopt(&mut self, backend: Arc<dyn Backend>, stored: Document) {
        let previous = std::mem::replace(&mut self.doc, stored);
        for (field, value) in previous {
            if self.unsynced.contains(&field) {
                self.doc.insert(field, value);
            }
        }
        self.backend = Some(backend);
        self.attempted = true;
    }
}

struct Inner {
    cache: Mutex<Cache>,
    settings: StorageSettings,
    handles: HandleStore,
    data_dir: PathBuf,
    cloud: std::sync::Mutex<Option<CloudSession>>,
    /// Fixed provider chain, bypassing the built-in one
    providers: Option<Vec<Arc<dyn Backend>>>,
    state: watch::Sender<FlushState>,
}

impl Inner {
    fn providers(&self) -> Vec<Arc<dyn Backend>> {
        if let Some(providers) = &self.providers {
            return providers.clone();
        }

        let mut providers: Vec<Arc<dyn Backend>> = vec![Arc::new(FilesystemBackend::new(
            self.handles.clone(),
            self.settings.data_file.clone(),
        ))];

        let session = self.cloud.lock().ok().and_then(|s| s.clone());
        if let (Some(base_url), Some(session)) = (&self.settings.cloud_base_url, session) {
            providers.push(Arc::new(CloudBackend::new(base_url.clone(), session)));
        }

        providers.push(Arc::new(LocalStorageBackend::new(
            &self.data_dir,
            self.settings.local_storage_key.clone(),
        )));
        providers
    }

    /// Pick a backend if none is chosen yet. Returns the chosen one.
    async fn ensure_backend(&self, cache: &mut Cache) -> Option<Arc<dyn Backend>> {
        if let Some(backend) = &cache.backend {
            return Some(backend.clone());
        }
        cache.attempted = true;
        match select_backend(&self.providers()).await {
            Some((backend, stored)) => {
                cache.adopt(backend.clone(), stored);
                Some(backend)
            }
            None => {
                tracing::warn!("No storage backend reachable, keeping document in memory only");
                None
            }
        }
    }

    /// Write the current snapshot. Failures are logged, never returned.
    async fn flush_snapshot(&self) {
        if let Err(e) = self.try_flush().await {
            tracing::error!("Failed to flush document: {}", e);
        }
    }

    async fn try_flush(&self) -> Result<(), StorageError> {
        let (backend, snapshot, written) = {
            let mut cache = self.cache.lock().await;
            let backend = self
                .ensure_backend(&mut cache)
                .await
                .ok_or_else(|| StorageError::Unavailable("no backend reachable".into()))?;
            let written = std::mem::take(&mut cache.unsynced);
            (backend, cache.doc.clone(), written)
        };

        if let Err(e) = backend.flush(&snapshot).await {
            self.cache.lock().await.unsynced.extend(written);
            return Err(e);
        }
        tracing::debug!("Flushed {} fields to {} backend", snapshot.len(), backend.kind());
        Ok(())
    }

    fn set_state(&self, state: FlushState) {
        self.state.send_replace(state);
    }
}

/// Session-scoped persistence context
pub struct PersistenceManager {
    inner: Arc<Inner>,
    commands: mpsc::UnboundedSender<Command>,
    worker: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl PersistenceManager {
    /// Create a manager with the built-in provider chain
    /// (filesystem, cloud, local storage).
    ///
    /// Must be called from inside a tokio runtime.
    pub fn new(settings: StorageSettings) -> Result<Self, StorageError> {
        Self::build(settings, None)
    }

    /// Create a manager over an explicit provider chain, tried in order.
    pub fn with_providers(
        settings: StorageSettings,
        providers: Vec<Arc<dyn Backend>>,
    ) -> Result<Self, StorageError> {
        Self::build(settings, Some(providers))
    }

    fn build(
        mut settings: StorageSettings,
        providers: Option<Vec<Arc<dyn Backend>>>,
    ) -> Result<Self, StorageError> {
        settings.validate();
        let data_dir = settings.resolve_data_dir()?;
        let (state, _) = watch::channel(FlushState::Idle);
        let inner = Arc::new(Inner {
            cache: Mutex::new(Cache::default()),
            handles: HandleStore::new(&data_dir),
            data_dir,
            settings,
            cloud: std::sync::Mutex::new(None),
            providers,
            state,
        });

        let (commands, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_flush_worker(inner.clone(), rx));

        tracing::info!("Persistence manager started");
        Ok(Self {
            inner,
            commands,
            worker: std::sync::Mutex::new(Some(worker)),
        })
    }

    /// Current value of `field`, or `fallback` if it is absent or no backend
    /// could populate the cache.
    pub async fn load(&self, field: &str, fallback: Value) -> Value {
        let mut cache = self.inner.cache.lock().await;
        if !cache.attempted {
            self.inner.ensure_backend(&mut cache).await;
        }
        cache.doc.get(field).cloned().unwrap_or(fallback)
    }

    /// Set `field` in the cache and schedule a debounced flush.
    pub async fn save(&self, field: &str, value: Value) {
        {
            let mut cache = self.inner.cache.lock().await;
            cache.doc.insert(field.to_string(), value);
            cache.unsynced.insert(field.to_string());
        }
        if self.commands.send(Command::Saved).is_err() {
            tracing::warn!("Flush worker stopped, '{}' kept in memory only", field);
        }
    }

    /// `load` deserialized into `T`; type mismatches log and yield `fallback`.
    pub async fn load_typed<T: DeserializeOwned>(&self, field: &str, fallback: T) -> T {
        let value = self.load(field, Value::Null).await;
        if value.is_null() {
            return fallback;
        }
        match serde_json::from_value(value) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Field '{}' has unexpected shape, using fallback: {}", field, e);
                fallback
            }
        }
    }

    /// `save` of any serializable value; serialization failure is a logged no-op.
    pub async fn save_typed<T: Serialize>(&self, field: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => self.save(field, value).await,
            Err(e) => tracing::error!("Failed to serialize '{}': {}", field, e),
        }
    }

    /// The user picked a storage directory: remember it, switch the session
    /// to the filesystem backend and write the current state there.
    pub async fn choose_directory(&self, dir: &Path) -> Result<(), StorageError> {
        validate_permission(dir).await?;
        self.inner.handles.set(Some(dir)).await?;

        let backend: Arc<dyn Backend> = Arc::new(FilesystemBackend::new(
            self.inner.handles.clone(),
            self.inner.settings.data_file.clone(),
        ));

        {
            let mut cache = self.inner.cache.lock().await;
            if cache.attempted && cache.backend.is_some() {
                // The session already has its state; the new location takes it over.
                cache.backend = Some(backend);
            } else {
                let stored = backend.load().await?;
                cache.adopt(backend, stored);
            }
        }

        tracing::info!("Storage location set to {}", dir.display());
        self.flush_now().await
    }

    /// Attach an authenticated cloud session. Unless the user chose a
    /// directory, the next access re-selects so the cloud store is preferred;
    /// the cloud's contents then replace fields it already flushed elsewhere.
    pub async fn use_cloud(&self, session: CloudSession) {
        if let Ok(mut cloud) = self.inner.cloud.lock() {
            *cloud = Some(session);
        }
        let mut cache = self.inner.cache.lock().await;
        if cache.backend.as_ref().map(|b| b.kind()) != Some(BackendKind::Filesystem) {
            cache.backend = None;
            cache.attempted = false;
        }
    }

    /// Drop the cloud session. The cache is kept; if it was being written to
    /// the cloud, the next flush picks another backend.
    pub async fn sign_out(&self) {
        if let Ok(mut cloud) = self.inner.cloud.lock() {
            *cloud = None;
        }
        let mut cache = self.inner.cache.lock().await;
        if cache.backend.as_ref().map(|b| b.kind()) == Some(BackendKind::Cloud) {
            cache.backend = None;
            let fields: Vec<String> = cache.doc.keys().cloned().collect();
            cache.unsynced.extend(fields);
        }
    }

    /// Flush immediately, bypassing the debounce window.
    pub async fn flush_now(&self) -> Result<(), StorageError> {
        self.inner.try_flush().await
    }

    pub async fn active_backend(&self) -> Option<BackendKind> {
        self.inner.cache.lock().await.backend.as_ref().map(|b| b.kind())
    }

    pub fn state(&self) -> FlushState {
        *self.inner.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<FlushState> {
        self.inner.state.subscribe()
    }

    pub fn debounce(&self) -> Duration {
        self.inner.settings.debounce()
    }

    /// Flush anything pending and stop the worker. Later saves stay in memory.
    pub async fn shutdown(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.commands.send(Command::Shutdown(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
        let worker = self.worker.lock().ok().and_then(|mut w| w.take());
        if let Some(worker) = worker {
            let _ = worker.await;
        }
        tracing::info!("Persistence manager stopped");
    }
}

async fn run_flush_worker(inner: Arc<Inner>, mut rx: mpsc::UnboundedReceiver<Command>) {
    let debounce = inner.settings.debounce();

    while let Some(command) = rx.recv().await {
        if let Command::Shutdown(done) = command {
            let _ = done.send(());
            return;
        }

        inner.set_state(FlushState::Pending);
        let mut shutdown = None;
        loop {
            tokio::select! {
                _ = tokio::time::sleep(debounce) => break,
                next = rx.recv() => match next {
                    Some(Command::Saved) => continue,
                    Some(Command::Shutdown(done)) => {
                        shutdown = Some(done);
                        break;
                    }
                    None => break,
                },
            }
        }

        inner.set_state(FlushState::Writing);
        inner.flush_snapshot().await;
        inner.set_state(FlushState::Idle);

        if let Some(done) = shutdown {
            let _ = done.send(());
            return;
        }
    }

    tracing::debug!("Flush worker exiting");
}
