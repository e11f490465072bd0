//! Matcha Launcher core - settings persistence, update checking, atomic
//! install transactions, and launch dispatch.
//!
//! This crate contains everything below the presentation layer. A frontend
//! (GUI, tray, or console) drives the launcher exclusively through
//! [`UpdateController`] and [`LaunchDispatcher`] and receives progress and
//! messages back through the [`Frontend`] trait.

pub mod config;
pub mod frontend;
pub mod installer;
pub mod launch;
pub mod settings;
pub mod update;
pub mod version;

pub use config::LauncherConfig;
pub use frontend::Frontend;
pub use installer::{InstallError, Installer};
pub use launch::{LaunchDispatcher, LaunchError, LaunchMode};
pub use settings::{LoadedSettings, Settings, SettingsStore};
pub use update::{UpdateController, UpdateError, UpdateOutcome};
pub use version::{needs_update, RemoteManifest, VersionChecker, VersionError};
