//! Remote version manifest fetching and comparison.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Hard ceiling on the manifest fetch. Never block indefinitely.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur while checking for updates.
#[derive(Debug, Error)]
pub enum VersionError {
    /// Timeout or connection failure before a response arrived.
    #[error("network error: {0}")]
    Network(String),

    /// Non-success status or a malformed manifest payload.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Result type for version check operations.
pub type Result<T> = std::result::Result<T, VersionError>;

/// The remote version manifest. Fetched per check, never persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteManifest {
    /// Version token of the latest release.
    pub version: String,
    /// Human-readable release notes. Older manifests use the key `Update`.
    #[serde(default, alias = "Update")]
    pub changelog: Option<String>,
}

/// Fetches version metadata from the fixed manifest endpoint.
pub struct VersionChecker {
    client: reqwest::Client,
    manifest_url: String,
}

impl VersionChecker {
    /// Creates a checker against the given manifest URL.
    pub fn new(manifest_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("MatchaLauncher/", env!("CARGO_PKG_VERSION")))
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|err| VersionError::Network(err.to_string()))?;

        Ok(Self {
            client,
            manifest_url: manifest_url.into(),
        })
    }

    /// Performs the manifest GET.
    pub async fn fetch_remote(&self) -> Result<RemoteManifest> {
        let response = self
            .client
            .get(&self.manifest_url)
            .send()
            .await
            .map_err(|err| VersionError::Network(err.to_string()))?;

        let response = response
            .error_for_status()
            .map_err(|err| VersionError::Protocol(err.to_string()))?;

        let manifest: RemoteManifest = response
            .json()
            .await
            .map_err(|err| VersionError::Protocol(err.to_string()))?;

        debug!(version = %manifest.version, "fetched remote manifest");
        Ok(manifest)
    }
}

/// An update is needed iff the version tokens differ as strings.
///
/// There is deliberately no semantic ordering: a remote token older than the
/// installed one still triggers an update offer. Known limitation, kept for
/// compatibility with the deployed manifest format.
pub fn needs_update(current: &str, remote: &str) -> bool {
    current != remote
}
