//! Fixed launcher configuration.
//!
//! The install root, the relative executable locations inside it, and the
//! remote endpoints are supplied out of band and are not user-editable at
//! runtime. Tests construct a [`LauncherConfig`] directly with temporary
//! paths and local URLs.

use std::path::PathBuf;

use directories::ProjectDirs;

/// Endpoint serving the version manifest JSON.
pub const DEFAULT_MANIFEST_URL: &str = "https://releases.matcha.app/version.json";

/// Endpoint serving the full release package.
pub const DEFAULT_PACKAGE_URL: &str = "https://releases.matcha.app/matcha.zip";

#[cfg(windows)]
const USER_EXE: &str = "usermode/app.exe";
#[cfg(windows)]
const KERNEL_EXE: &str = "app.exe";

#[cfg(not(windows))]
const USER_EXE: &str = "usermode/app";
#[cfg(not(windows))]
const KERNEL_EXE: &str = "app";

/// Externally supplied constants the core operates against.
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    /// Root of the installed application tree.
    pub install_root: PathBuf,
    /// User-mode executable, relative to `install_root`.
    pub user_exe: PathBuf,
    /// Kernel-mode executable, relative to `install_root`.
    pub kernel_exe: PathBuf,
    /// URL of the remote version manifest.
    pub manifest_url: String,
    /// URL of the release package archive.
    pub package_url: String,
    /// Location of the persisted settings file.
    pub settings_path: PathBuf,
}

impl LauncherConfig {
    /// Builds the compiled-in default configuration.
    ///
    /// Returns `None` when the platform cannot provide a home directory.
    pub fn from_defaults() -> Option<Self> {
        let dirs = ProjectDirs::from("com", "matcha", "Matcha")?;

        Some(Self {
            install_root: default_install_root(&dirs),
            user_exe: PathBuf::from(USER_EXE),
            kernel_exe: PathBuf::from(KERNEL_EXE),
            manifest_url: DEFAULT_MANIFEST_URL.to_string(),
            package_url: DEFAULT_PACKAGE_URL.to_string(),
            settings_path: dirs.config_dir().join("settings.json"),
        })
    }

    /// Absolute path of the user-mode executable.
    pub fn user_exe_path(&self) -> PathBuf {
        self.install_root.join(&self.user_exe)
    }

    /// Absolute path of the kernel-mode executable.
    pub fn kernel_exe_path(&self) -> PathBuf {
        self.install_root.join(&self.kernel_exe)
    }
}

#[cfg(windows)]
fn default_install_root(_dirs: &ProjectDirs) -> PathBuf {
    PathBuf::from(r"C:\matcha\app")
}

#[cfg(not(windows))]
fn default_install_root(dirs: &ProjectDirs) -> PathBuf {
    dirs.data_dir().join("app")
}
