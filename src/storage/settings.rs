//! Storage settings
//!
//! Manages the persistence layer's own configuration (debounce window, file
//! names, cloud endpoint). Kept separate from the user's Document.

use crate::storage::{get_data_dir, StorageError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Default quiet period before a flush
pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;

/// Key under which the local-storage backend keeps the Document
pub const DEFAULT_LOCAL_STORAGE_KEY: &str = "aeryth_data";

/// Name of the JSON file inside a user-chosen directory
pub const DEFAULT_DATA_FILE: &str = "aeryth_data.json";

/// Persistence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Quiet period after the last save before flushing (50 - 60000 ms)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// File name used by the filesystem backend
    #[serde(default = "default_data_file")]
    pub data_file: String,
    /// Key used by the local-storage backend
    #[serde(default = "default_local_storage_key")]
    pub local_storage_key: String,
    /// Base URL of the cloud document store (None disables the cloud backend)
    #[serde(default)]
    pub cloud_base_url: Option<String>,
    /// Directory holding handles.json and local_storage.json
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_data_file() -> String {
    DEFAULT_DATA_FILE.to_string()
}

fn default_local_storage_key() -> String {
    DEFAULT_LOCAL_STORAGE_KEY.to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            data_file: default_data_file(),
            local_storage_key: default_local_storage_key(),
            cloud_base_url: None,
            data_dir: None,
        }
    }
}

impl StorageSettings {
    /// Validate settings values
    pub fn validate(&mut self) {
        self.debounce_ms = self.debounce_ms.clamp(50, 60_000);

        let name = self.data_file.trim();
        if name.is_empty() || name.contains('/') || name.contains('\\') {
            self.data_file = default_data_file();
        }

        if self.local_storage_key.trim().is_empty() {
            self.local_storage_key = default_local_storage_key();
        }

        if let Some(url) = &self.cloud_base_url {
            let url = url.trim().trim_end_matches('/');
            if url.is_empty() {
                self.cloud_base_url = None;
            } else {
                self.cloud_base_url = Some(url.to_string());
            }
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Resolved data directory (explicit override or the platform default)
    pub fn resolve_data_dir(&self) -> Result<PathBuf, StorageError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => get_data_dir(),
        }
    }
}

/// Get the settings file path
fn get_settings_path() -> Result<PathBuf, StorageError> {
    Ok(get_data_dir()?.join("settings.json"))
}

/// Load settings from disk
///
/// Returns default settings if the file doesn't exist or is corrupted
pub fn load_settings() -> StorageSettings {
    match get_settings_path().and_then(|path| load_settings_from(&path)) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("Failed to load storage settings, using defaults: {}", e);
            StorageSettings::default()
        }
    }
}

/// Load settings from a specific file
pub fn load_settings_from(path: &std::path::Path) -> Result<StorageSettings, StorageError> {
    if !path.exists() {
        tracing::info!("Settings file not found, using defaults");
        return Ok(StorageSettings::default());
    }

    let json = fs::read_to_string(path)?;
    let mut settings: StorageSettings = serde_json::from_str(&json)?;
    settings.validate();

    tracing::debug!("Loaded storage settings from {}", path.display());
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = StorageSettings::default();
        assert_eq!(settings.debounce_ms, 1000);
        assert_eq!(settings.data_file, "aeryth_data.json");
        assert_eq!(settings.local_storage_key, "aeryth_data");
        assert!(settings.cloud_base_url.is_none());
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = StorageSettings::default();

        settings.debounce_ms = 0;
        settings.validate();
        assert_eq!(settings.debounce_ms, 50);

        settings.debounce_ms = 1_000_000;
        settings.validate();
        assert_eq!(settings.debounce_ms, 60_000);

        settings.data_file = "../escape.json".to_string();
        settings.validate();
        assert_eq!(settings.data_file, "aeryth_data.json");

        settings.cloud_base_url = Some("https://store.example/api/".to_string());
        settings.validate();
        assert_eq!(
            settings.cloud_base_url.as_deref(),
            Some("https://store.example/api")
        );

        settings.cloud_base_url = Some("   ".to_string());
        settings.validate();
        assert!(settings.cloud_base_url.is_none());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"debounce_ms": 250}"#).unwrap();

        let settings = load_settings_from(&path).unwrap();
        assert_eq!(settings.debounce_ms, 250);
        assert_eq!(settings.local_storage_key, "aeryth_data");
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(settings.debounce_ms, DEFAULT_DEBOUNCE_MS);
    }

    #[test]
    fn test_corrupted_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_settings_from(&path), Err(StorageError::Json(_))));
    }
}
