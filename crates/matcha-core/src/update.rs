//! Update orchestration.
//!
//! [`UpdateController`] ties the version checker, the installer, and the
//! settings store into one user-facing "check and update" transaction. At
//! most one transaction runs at a time; the recorded version only advances
//! after an install has fully committed.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::LauncherConfig;
use crate::frontend::Frontend;
use crate::installer::{InstallError, Installer};
use crate::settings::{Settings, SettingsError, SettingsStore};
use crate::version::{self, VersionChecker, VersionError};

/// Errors surfaced by update operations.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The remote check could not complete.
    #[error("update check failed: {0}")]
    CheckFailed(#[from] VersionError),

    /// The install transaction failed; the tree is absent, not corrupt.
    #[error("update failed: {0}")]
    InstallFailed(#[from] InstallError),

    /// The new version could not be recorded after a successful install.
    #[error("failed to persist settings: {0}")]
    Settings(#[from] SettingsError),

    /// Another update transaction is already in flight.
    #[error("an update is already in progress")]
    Busy,
}

/// Result type for update operations.
pub type Result<T> = std::result::Result<T, UpdateError>;

/// Outcome of a completed check-and-offer transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The stored version matches the remote manifest.
    UpToDate,
    /// A new version was offered, confirmed, and installed.
    Installed { version: String },
    /// A new version was offered and the user declined.
    Declined { version: String },
}

/// Orchestrates check, confirm, install, and record.
pub struct UpdateController {
    checker: VersionChecker,
    installer: Installer,
    store: SettingsStore,
    package_url: String,
    frontend: Arc<dyn Frontend>,
    /// Guards the install tree and the settings record; a second
    /// transaction is rejected, never interleaved.
    transaction: Mutex<()>,
}

impl UpdateController {
    /// Creates a controller over the configured endpoints and paths.
    pub fn new(config: &LauncherConfig, frontend: Arc<dyn Frontend>) -> Result<Self> {
        Ok(Self {
            checker: VersionChecker::new(&config.manifest_url)?,
            installer: Installer::new(&config.install_root)?,
            store: SettingsStore::new(&config.settings_path),
            package_url: config.package_url.clone(),
            frontend,
            transaction: Mutex::new(()),
        })
    }

    /// Fetches the remote manifest and, when it differs from the stored
    /// version, offers the update to the user.
    ///
    /// The controller never installs without an explicit confirmation from
    /// the frontend. On success the stored version advances to the remote
    /// one; on any failure a single message reaches the frontend and the
    /// stored version is left alone.
    pub async fn check_and_offer_update(&self) -> Result<UpdateOutcome> {
        let Ok(_txn) = self.transaction.try_lock() else {
            return Err(UpdateError::Busy);
        };

        let outcome = self.check_inner().await;
        match &outcome {
            Ok(UpdateOutcome::UpToDate) => self.frontend.report_info("Already up-to-date."),
            Ok(UpdateOutcome::Installed { version }) => self
                .frontend
                .report_info(&format!("Update {version} installed successfully!")),
            Ok(UpdateOutcome::Declined { version }) => {
                info!(%version, "update declined by user");
            }
            Err(err) => self.frontend.report_error(&err.to_string()),
        }
        outcome
    }

    async fn check_inner(&self) -> Result<UpdateOutcome> {
        let manifest = self.checker.fetch_remote().await?;
        let mut settings = self.store.load().settings;

        if !version::needs_update(&settings.version, &manifest.version) {
            return Ok(UpdateOutcome::UpToDate);
        }

        let changelog = manifest
            .changelog
            .as_deref()
            .unwrap_or("No changelog provided.");
        let message = format!(
            "New version {} found.\n\nChangelog:\n{}\n\nInstall now?",
            manifest.version, changelog
        );
        if !self.frontend.confirm(&message) {
            return Ok(UpdateOutcome::Declined {
                version: manifest.version,
            });
        }

        self.installer
            .install(&self.package_url, self.frontend.as_ref())
            .await?;

        // Only a fully committed install advances the recorded version.
        settings.version = manifest.version.clone();
        self.store.save(&settings)?;

        Ok(UpdateOutcome::Installed {
            version: manifest.version,
        })
    }

    /// Wipes the settings record and reinstalls the configured package
    /// unconditionally, without a prior version comparison.
    ///
    /// The recorded version falls back to the default, so the next check
    /// re-offers whatever the manifest advertises.
    pub async fn reinstall(&self) -> Result<()> {
        let Ok(_txn) = self.transaction.try_lock() else {
            return Err(UpdateError::Busy);
        };

        self.store.reset()?;

        match self
            .installer
            .install(&self.package_url, self.frontend.as_ref())
            .await
        {
            Ok(()) => {
                self.frontend.report_info("Reinstall complete.");
                Ok(())
            }
            Err(err) => {
                let err = UpdateError::from(err);
                self.frontend.report_error(&err.to_string());
                Err(err)
            }
        }
    }

    /// Runs the startup auto-check as a background task when enabled.
    ///
    /// Returns `None` when `auto_update` is off. The join handle is the
    /// completion signal; the caller may await it or let it run detached.
    pub fn spawn_startup_check(self: &Arc<Self>) -> Option<JoinHandle<Result<UpdateOutcome>>> {
        let loaded = self.store.load();
        if loaded.corrupted {
            warn!("settings were corrupted, startup check uses defaults");
        }
        if !loaded.settings.auto_update {
            return None;
        }

        let controller = Arc::clone(self);
        Some(tokio::spawn(async move {
            controller.check_and_offer_update().await
        }))
    }

    /// The settings store this controller persists through.
    pub fn settings_store(&self) -> &SettingsStore {
        &self.store
    }

    /// Currently recorded settings (defaults when absent or corrupt).
    pub fn current_settings(&self) -> Settings {
        self.store.load().settings
    }
}
