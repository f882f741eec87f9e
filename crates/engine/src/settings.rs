//! Durable storage for [`NotificationSettings`].
//!
//! The engine loads settings once at build time and saves the full settings
//! after every user toggle. Storage is a seam ([`SettingsStore`]) so hosts
//! can keep settings wherever they like; [`JsonFileSettingsStore`] is the
//! default on-disk implementation.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use reelwatch_core::NotificationSettings;

/// Errors from a settings store.
#[derive(Debug, thiserror::Error)]
pub enum SettingsStoreError {
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Durable key-value persistence for notification settings.
#[async_trait::async_trait]
pub trait SettingsStore: Send + Sync {
    /// Load the stored settings, or the defaults when nothing is stored.
    async fn load(&self) -> Result<NotificationSettings, SettingsStoreError>;

    async fn save(&self, settings: &NotificationSettings) -> Result<(), SettingsStoreError>;
}

// ---------------------------------------------------------------------------
// JSON file
// ---------------------------------------------------------------------------

/// Stores settings as a pretty-printed JSON object in a single file.
///
/// Writes go to a sibling temp file which is then renamed over the target,
/// so a crash mid-write never leaves a truncated settings file behind.
#[derive(Debug, Clone)]
pub struct JsonFileSettingsStore {
    path: PathBuf,
}

impl JsonFileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait::async_trait]
impl SettingsStore for JsonFileSettingsStore {
    async fn load(&self) -> Result<NotificationSettings, SettingsStoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No settings file, using defaults");
                return Ok(NotificationSettings::default());
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&raw) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Settings file is corrupt, using defaults",
                );
                Ok(NotificationSettings::default())
            }
        }
    }

    async fn save(&self, settings: &NotificationSettings) -> Result<(), SettingsStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let body = serde_json::to_vec_pretty(settings)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, body).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Process-local store, for tests and hosts without durable storage.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: Mutex<Option<NotificationSettings>>,
    saves: AtomicUsize,
}

impl MemorySettingsStore {
    pub fn new(initial: NotificationSettings) -> Self {
        Self {
            settings: Mutex::new(Some(initial)),
            saves: AtomicUsize::new(0),
        }
    }

    /// The last saved (or initial) settings, if any.
    pub fn stored(&self) -> Option<NotificationSettings> {
        *self.settings.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self) -> Result<NotificationSettings, SettingsStoreError> {
        Ok(self.stored().unwrap_or_default())
    }

    async fn save(&self, settings: &NotificationSettings) -> Result<(), SettingsStoreError> {
        *self.settings.lock().unwrap_or_else(|e| e.into_inner()) = Some(*settings);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
