//! Persisted reading speed.
//!
//! The only durable preference is `speed_wpm`, stored as a small JSON file.
//! Both directions fail soft: a bad read yields [`DEFAULT_WPM`], a bad write
//! is logged and dropped.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_WPM: u32 = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub speed_wpm: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            speed_wpm: DEFAULT_WPM,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings file is malformed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("stored speed must be positive")]
    ZeroSpeed,
}

pub trait SettingsStore {
    /// Stored speed, or [`DEFAULT_WPM`] on any failure.
    fn load(&self) -> u32;
    /// Persist the speed. Never fails from the caller's point of view.
    fn save(&mut self, speed_wpm: u32);
}

#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    fn try_load(&self) -> Result<Settings, SettingsError> {
        let bytes = fs::read(&self.path)?;
        let settings: Settings = serde_json::from_slice(&bytes)?;
        if settings.speed_wpm == 0 {
            return Err(SettingsError::ZeroSpeed);
        }
        Ok(settings)
    }

    fn try_save(&self, settings: &Settings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(settings)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> u32 {
        match self.try_load() {
            Ok(settings) => {
                debug!("Loaded speed {} wpm from {}", settings.speed_wpm, self.path.display());
                settings.speed_wpm
            }
            Err(SettingsError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No settings at {}, using {DEFAULT_WPM} wpm", self.path.display());
                DEFAULT_WPM
            }
            Err(e) => {
                warn!("{e} ({}), using {DEFAULT_WPM} wpm", self.path.display());
                DEFAULT_WPM
            }
        }
    }

    fn save(&mut self, speed_wpm: u32) {
        if speed_wpm == 0 {
            warn!("Refusing to persist a zero speed");
            return;
        }
        match self.try_save(&Settings { speed_wpm }) {
            Ok(()) => debug!("Saved speed {speed_wpm} wpm to {}", self.path.display()),
            Err(e) => warn!("Failed to save settings to {}: {e}", self.path.display()),
        }
    }
}

/// In-memory store, used when no file should be touched.
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    stored: Option<u32>,
}

impl MemorySettingsStore {
    pub fn with_speed(speed_wpm: u32) -> Self {
        Self {
            stored: Some(speed_wpm),
        }
    }

    pub fn stored(&self) -> Option<u32> {
        self.stored
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> u32 {
        self.stored.filter(|&wpm| wpm > 0).unwrap_or(DEFAULT_WPM)
    }

    fn save(&mut self, speed_wpm: u32) {
        if speed_wpm > 0 {
            self.stored = Some(speed_wpm);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempdir().unwrap();
        let mut store = FileSettingsStore::with_path(dir.path().join("settings.json"));
        store.save(600);
        assert_eq!(store.load(), 600);
    }

    #[test]
    fn save_creates_missing_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("settings.json");
        let mut store = FileSettingsStore::with_path(&path);
        store.save(275);
        assert!(path.exists());
        assert_eq!(FileSettingsStore::with_path(&path).load(), 275);
    }

    #[test]
    fn file_format_is_plain_speed_object() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut store = FileSettingsStore::with_path(&path);
        store.save(480);
        let raw: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({ "speed_wpm": 480 }));
    }

    #[test]
    fn missing_file_loads_default() {
        let dir = tempdir().unwrap();
        let store = FileSettingsStore::with_path(dir.path().join("nope.json"));
        assert_eq!(store.load(), DEFAULT_WPM);
    }

    #[test]
    fn corrupt_file_loads_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, b"{ speed_wpm: ").unwrap();
        assert_eq!(FileSettingsStore::with_path(&path).load(), DEFAULT_WPM);

        fs::write(&path, br#"{"speed_wpm": -5}"#).unwrap();
        assert_eq!(FileSettingsStore::with_path(&path).load(), DEFAULT_WPM);

        fs::write(&path, br#"{"speed_wpm": 0}"#).unwrap();
        assert_eq!(FileSettingsStore::with_path(&path).load(), DEFAULT_WPM);
    }

    #[test]
    fn unwritable_location_does_not_panic() {
        let dir = tempdir().unwrap();
        // A regular file where the parent directory should be.
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();
        let mut store = FileSettingsStore::with_path(blocker.join("settings.json"));
        store.save(500);
        assert_eq!(store.load(), DEFAULT_WPM);
    }

    #[test]
    fn memory_store_defaults_and_roundtrips() {
        let mut store = MemorySettingsStore::default();
        assert_eq!(store.load(), DEFAULT_WPM);
        store.save(600);
        assert_eq!(store.load(), 600);
        store.save(0);
        assert_eq!(store.stored(), Some(600));
    }
}
