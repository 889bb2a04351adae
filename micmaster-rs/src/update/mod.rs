//! Self-update: release check, download, and the replace-and-relaunch
//! protocol run by the updater instance.

pub mod apply;
pub mod coordinator;
pub mod feed;
pub mod version;

pub use apply::{replace_and_relaunch, ApplyOptions, Launcher, ProcessLauncher};
pub use coordinator::{UpdateCheck, UpdateCoordinator, UpdateSession};
pub use feed::{Download, GithubReleases, ReleaseFeed, ReleaseInfo, DEFAULT_RELEASES_URL};
pub use version::is_newer;

use crate::process::ProcessError;
use std::path::PathBuf;
use thiserror::Error;

/// Update error types.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("Network error while checking for updates: {0}")]
    Network(String),

    #[error("No releases found")]
    NoReleases,

    #[error("Malformed release information: {0}")]
    MalformedResponse(String),

    #[error("Invalid version '{0}'")]
    Parse(String),

    #[error("Failed to download the update: {0}")]
    Download(String),

    #[error("No downloaded update is ready to install")]
    NothingToApply,

    #[error("{name} is still running after {attempts} checks")]
    ExitTimeout { name: String, attempts: u32 },

    #[error("Update file operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to start {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Process(#[from] ProcessError),
}
