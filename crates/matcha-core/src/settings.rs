//! User settings persistence.
//!
//! Settings are a single JSON record on disk. Loading never fails: a missing
//! file yields the defaults and a malformed file yields the defaults plus a
//! corruption flag the caller is expected to surface as a warning. Saving
//! replaces the file atomically so a concurrent load never observes a
//! truncated record.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Version recorded before anything has been installed.
pub const DEFAULT_VERSION: &str = "0.0";

/// Errors that can occur while persisting settings.
///
/// Loading is infallible by design and does not use this type.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Filesystem failure while writing or deleting the record.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Failed to encode the record as JSON.
    #[error("failed to encode settings: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

/// The durable user preferences record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Launch the installed app automatically after startup.
    pub auto_launch: bool,
    /// Run an update check automatically on startup.
    pub auto_update: bool,
    /// Version token of the currently installed package.
    pub version: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_launch: true,
            auto_update: true,
            version: DEFAULT_VERSION.to_string(),
        }
    }
}

/// Settings as returned by [`SettingsStore::load`].
#[derive(Debug, Clone)]
pub struct LoadedSettings {
    pub settings: Settings,
    /// True when the on-disk record existed but could not be parsed.
    /// The caller should warn the user; defaults were substituted.
    pub corrupted: bool,
}

/// Owns the persisted settings record for the process lifetime.
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Creates a store backed by the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted record.
    ///
    /// Missing file: defaults. Unreadable or malformed file: defaults with
    /// `corrupted` set. This never returns an error.
    pub fn load(&self) -> LoadedSettings {
        match fs::read_to_string(&self.path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(settings) => LoadedSettings {
                    settings,
                    corrupted: false,
                },
                Err(err) => {
                    warn!(path = %self.path.display(), %err, "settings file malformed, using defaults");
                    LoadedSettings {
                        settings: Settings::default(),
                        corrupted: true,
                    }
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no settings file, using defaults");
                LoadedSettings {
                    settings: Settings::default(),
                    corrupted: false,
                }
            }
            Err(err) => {
                warn!(path = %self.path.display(), %err, "settings file unreadable, using defaults");
                LoadedSettings {
                    settings: Settings::default(),
                    corrupted: true,
                }
            }
        }
    }

    /// Writes the full record, all-or-nothing.
    ///
    /// The record is written to a temporary file in the same directory and
    /// renamed over the destination, so a reader sees either the old or the
    /// new record, never a partial one.
    pub fn save(&self, settings: &Settings) -> Result<()> {
        let json = serde_json::to_string_pretty(settings)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), version = %settings.version, "settings saved");
        Ok(())
    }

    /// Deletes the persisted record so the next load yields defaults.
    ///
    /// A record that never existed is not an error.
    pub fn reset(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
