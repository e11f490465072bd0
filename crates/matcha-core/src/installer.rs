//! The install transaction: download, wipe, extract.
//!
//! The transaction is atomic-ish with a fail-safe-absent policy. The live
//! install tree is untouched until the package has fully downloaded; once
//! the destructive wipe begins, any later failure leaves the tree absent
//! rather than half-old/half-new. The frontend sees exactly one
//! begin/end progress pair per transaction via a scoped guard.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use thiserror::Error;
use tracing::{info, warn};
use zip::ZipArchive;

use crate::frontend::Frontend;

/// Bound on establishing the download connection. The transfer itself is
/// not bounded; large packages on slow links are expected.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur during an install transaction.
#[derive(Debug, Error)]
pub enum InstallError {
    /// Connection failure or transfer interruption.
    #[error("network error: {0}")]
    Network(String),

    /// The body ended before the advertised length was received.
    #[error("download incomplete: got {got} of {expected} bytes")]
    DownloadIncomplete { got: u64, expected: u64 },

    /// The downloaded package could not be read as an archive.
    #[error("archive error: {0}")]
    Archive(String),

    /// Filesystem failure while replacing the install tree.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for install operations.
pub type Result<T> = std::result::Result<T, InstallError>;

/// Notifies the frontend on construction and exactly once more on drop,
/// whichever way the transaction exits.
struct ProgressGuard<'a> {
    frontend: &'a dyn Frontend,
}

impl<'a> ProgressGuard<'a> {
    fn begin(frontend: &'a dyn Frontend) -> Self {
        frontend.update_in_progress(true);
        Self { frontend }
    }
}

impl Drop for ProgressGuard<'_> {
    fn drop(&mut self) {
        self.frontend.update_in_progress(false);
    }
}

/// Owns the install-directory tree for the duration of a transaction.
pub struct Installer {
    client: reqwest::Client,
    install_root: PathBuf,
}

impl Installer {
    /// Creates an installer targeting the given install root.
    pub fn new(install_root: impl Into<PathBuf>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("MatchaLauncher/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|err| InstallError::Network(err.to_string()))?;

        Ok(Self {
            client,
            install_root: install_root.into(),
        })
    }

    /// Root of the installed application tree.
    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    /// Runs the full install transaction against `package_url`.
    ///
    /// Download failures leave the existing tree untouched (the partial
    /// temporary file stays behind for a later transaction to overwrite).
    /// Failures after the wipe leave the tree absent.
    pub async fn install(&self, package_url: &str, frontend: &dyn Frontend) -> Result<()> {
        let _progress = ProgressGuard::begin(frontend);

        let archive_path = self.download(package_url).await?;
        let result = self.replace_tree(&archive_path);

        if let Err(err) = fs::remove_file(&archive_path) {
            warn!(path = %archive_path.display(), %err, "failed to remove downloaded archive");
        }

        if result.is_ok() {
            info!(root = %self.install_root.display(), "install transaction committed");
        }
        result
    }

    /// Streams the package to a temporary file next to the install root.
    async fn download(&self, url: &str) -> Result<PathBuf> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|err| InstallError::Network(err.to_string()))?;

        let expected = response.content_length();

        let parent = self
            .install_root
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&parent)?;
        let archive_path = parent.join(format!("matcha-update-{}.zip.part", std::process::id()));

        let mut file = File::create(&archive_path)?;
        let mut stream = response.bytes_stream();
        let mut got: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| InstallError::Network(err.to_string()))?;
            file.write_all(&chunk)?;
            got += chunk.len() as u64;
        }
        file.sync_all()?;
        verify_complete(got, expected)?;

        info!(bytes = got, "downloaded update package");
        Ok(archive_path)
    }

    /// Wipes the install root and extracts the archive into it.
    ///
    /// This is the destructive step: once the old tree is gone, an
    /// extraction failure wipes whatever was partially written so the root
    /// ends up absent, never partially populated.
    fn replace_tree(&self, archive_path: &Path) -> Result<()> {
        if self.install_root.exists() {
            fs::remove_dir_all(&self.install_root)?;
        }
        fs::create_dir_all(&self.install_root)?;

        match self.extract(archive_path) {
            Ok(()) => Ok(()),
            Err(err) => {
                if let Err(wipe_err) = fs::remove_dir_all(&self.install_root) {
                    warn!(
                        root = %self.install_root.display(),
                        %wipe_err,
                        "failed to clear install root after extraction failure"
                    );
                }
                Err(err)
            }
        }
    }

    fn extract(&self, archive_path: &Path) -> Result<()> {
        let file = File::open(archive_path)?;
        let mut archive =
            ZipArchive::new(file).map_err(|err| InstallError::Archive(err.to_string()))?;

        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|err| InstallError::Archive(err.to_string()))?;

            // Reject entries that would escape the install root.
            let Some(relative) = entry.enclosed_name() else {
                return Err(InstallError::Archive(format!(
                    "unsafe entry path: {}",
                    entry.name()
                )));
            };
            let dest = self.install_root.join(relative);

            if entry.is_dir() {
                fs::create_dir_all(&dest)?;
            } else {
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)?;
                }
                let mut out = File::create(&dest)?;
                io::copy(&mut entry, &mut out)?;
            }
        }

        Ok(())
    }
}

/// The body must match the advertised Content-Length when the server sent
/// one. The transport usually reports a truncated body as a stream error
/// first; this is the backstop for a cleanly ended short body.
fn verify_complete(got: u64, expected: Option<u64>) -> Result<()> {
    match expected {
        Some(expected) if got != expected => Err(InstallError::DownloadIncomplete { got, expected }),
        _ => Ok(()),
    }
}
