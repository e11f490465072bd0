//! Launch dispatch for the installed application.
//!
//! Two entry points exist inside the install tree: a user-mode binary and a
//! kernel-mode binary that requires the launcher itself to run elevated.
//! Dispatch only reads the filesystem; it never mutates the install tree,
//! and it never waits on the child it spawns.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::info;

use crate::config::LauncherConfig;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Errors that can occur when launching the installed app.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The requested binary is not present under the install root.
    #[error("app is not installed")]
    NotInstalled,

    /// Kernel mode was requested from a non-elevated launcher process.
    #[error("kernel mode requires the launcher to run elevated")]
    PrivilegeRequired,

    /// The binary exists but could not be started.
    #[error("failed to start {path}: {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for launch operations.
pub type Result<T> = std::result::Result<T, LaunchError>;

/// The two mutually exclusive execution modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    User,
    Kernel,
}

impl LaunchMode {
    /// Human-readable mode name for messages.
    pub fn label(self) -> &'static str {
        match self {
            LaunchMode::User => "user mode",
            LaunchMode::Kernel => "kernel mode",
        }
    }
}

/// Resolves and starts the installed executable in a selected mode.
///
/// Stateless: every call is independent and spawns a fresh process. Nothing
/// prevents multiple running instances.
pub struct LaunchDispatcher {
    install_root: PathBuf,
    user_exe: PathBuf,
    kernel_exe: PathBuf,
}

impl LaunchDispatcher {
    /// Creates a dispatcher over the configured install layout.
    pub fn new(config: &LauncherConfig) -> Self {
        Self {
            install_root: config.install_root.clone(),
            user_exe: config.user_exe.clone(),
            kernel_exe: config.kernel_exe.clone(),
        }
    }

    /// Absolute path of the binary for `mode`.
    pub fn binary_path(&self, mode: LaunchMode) -> PathBuf {
        match mode {
            LaunchMode::User => self.install_root.join(&self.user_exe),
            LaunchMode::Kernel => self.install_root.join(&self.kernel_exe),
        }
    }

    /// Whether the binary for `mode` is present.
    pub fn is_installed(&self, mode: LaunchMode) -> bool {
        self.binary_path(mode).is_file()
    }

    /// Starts the installed app in `mode`, fire-and-forget.
    ///
    /// Kernel mode checks elevation before looking at the install tree at
    /// all; the two failures carry different user-facing messages and the
    /// privilege one wins. A launch during an in-progress install may
    /// observe a transiently absent tree and fails with `NotInstalled`.
    pub fn launch(&self, mode: LaunchMode) -> Result<()> {
        if mode == LaunchMode::Kernel && !is_elevated() {
            return Err(LaunchError::PrivilegeRequired);
        }

        let exe = self.binary_path(mode);
        if !exe.is_file() {
            return Err(LaunchError::NotInstalled);
        }

        self.spawn_detached(&exe, mode)
    }

    fn spawn_detached(&self, exe: &Path, mode: LaunchMode) -> Result<()> {
        let mut command = Command::new(exe);
        command
            .current_dir(&self.install_root)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // New process group so the child outlives the launcher.
            command.process_group(0);
        }

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            command.creation_flags(CREATE_NO_WINDOW);
        }

        let child = command.spawn().map_err(|source| LaunchError::Spawn {
            path: exe.display().to_string(),
            source,
        })?;

        info!(pid = child.id(), mode = mode.label(), path = %exe.display(), "launched");
        // Fire-and-forget: the launcher does not own the child's exit.
        drop(child);
        Ok(())
    }
}

/// Whether the current process holds elevated privilege.
#[cfg(windows)]
pub fn is_elevated() -> bool {
    // SAFETY: IsUserAnAdmin takes no arguments and only reads the process token.
    unsafe { windows_sys::Win32::UI::Shell::IsUserAnAdmin() != 0 }
}

/// Whether the current process holds elevated privilege.
#[cfg(unix)]
pub fn is_elevated() -> bool {
    // SAFETY: geteuid cannot fail.
    unsafe { libc::geteuid() == 0 }
}
