//! Persistent storage
//!
//! This module handles persistence of the user's Document: the in-memory cache,
//! the debounced flush worker and the three backends it can write to.

pub mod backend;
pub mod cloud;
pub mod filesystem;
pub mod local;
pub mod manager;
pub mod settings;

use std::path::PathBuf;
use thiserror::Error;

pub use backend::{Backend, BackendKind};
pub use manager::{FlushState, PersistenceManager};

/// The whole persisted state of one user, keyed by field name.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Known Document field names
pub mod fields {
    pub const SETTINGS: &str = "aeryth_settings";
    pub const ROUTINES: &str = "aeryth_routines";
    pub const DIARY: &str = "aeryth_diary";
    pub const STICKIES: &str = "aeryth_stickies";
    pub const EVENT_STATUSES: &str = "aeryth_event_statuses";
    pub const NOTIFICATION_CHATS: &str = "aeryth_notification_chats";
    pub const PROFILE_SUMMARY: &str = "aeryth_profile_summary";
}

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("Could not determine data directory")]
    NoDataDir,
}

/// Get the application data directory
pub fn get_data_dir() -> Result<PathBuf, StorageError> {
    directories::ProjectDirs::from("app", "Aeryth", "Aeryth")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or(StorageError::NoDataDir)
}
