//! Check, download and hand-off of application updates.
//!
//! The running instance never replaces itself. After a download it copies
//! its own executable next to the artifact and launches that copy with
//! `--update <artifact> <target>`, then exits; the copy performs the
//! replacement (see [`super::apply`]).

use super::apply::Launcher;
use super::feed::{Download, ReleaseFeed};
use super::version::is_newer;
use super::UpdateError;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

const CHUNK_SIZE: usize = 4096;

/// Result of an update check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateCheck {
    UpToDate { latest: String },
    Available {
        version: String,
        download_url: Option<String>,
    },
}

/// State of one check -> download -> apply sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSession {
    pub remote_version: String,
    pub download_url: Option<String>,
    /// Set once the artifact is fully downloaded
    pub artifact_path: Option<PathBuf>,
    pub target_executable_path: PathBuf,
}

pub struct UpdateCoordinator {
    feed: Box<dyn ReleaseFeed>,
    current_version: String,
    artifact_path: PathBuf,
    updater_path: PathBuf,
    target_executable: PathBuf,
    session: Option<UpdateSession>,
}

impl UpdateCoordinator {
    pub fn new(
        feed: Box<dyn ReleaseFeed>,
        current_version: impl Into<String>,
        artifact_path: PathBuf,
        updater_path: PathBuf,
        target_executable: PathBuf,
    ) -> Self {
        Self {
            feed,
            current_version: current_version.into(),
            artifact_path,
            updater_path,
            target_executable,
            session: None,
        }
    }

    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    pub fn session(&self) -> Option<&UpdateSession> {
        self.session.as_ref()
    }

    /// Ask the feed for the latest release and compare versions.
    ///
    /// An unparseable version is logged and treated as "no update".
    pub fn check_for_update(&mut self) -> Result<UpdateCheck, UpdateError> {
        let release = self.feed.latest()?;

        let newer = match is_newer(&release.version, &self.current_version) {
            Ok(newer) => newer,
            Err(e) => {
                error!(error = %e, latest = %release.version, "Invalid version format");
                false
            }
        };

        if !newer {
            info!(latest = %release.version, current = %self.current_version, "No update available");
            self.session = None;
            return Ok(UpdateCheck::UpToDate {
                latest: release.version,
            });
        }

        info!(latest = %release.version, current = %self.current_version, "Update available");
        self.session = Some(UpdateSession {
            remote_version: release.version.clone(),
            download_url: release.download_url.clone(),
            artifact_path: None,
            target_executable_path: self.target_executable.clone(),
        });
        Ok(UpdateCheck::Available {
            version: release.version,
            download_url: release.download_url,
        })
    }

    /// Download `url` to the artifact path.
    ///
    /// `progress` receives integer percentages when the size is known. On
    /// failure the partial artifact is removed.
    pub fn download_update(
        &mut self,
        url: &str,
        progress: &mut dyn FnMut(u8),
    ) -> Result<PathBuf, UpdateError> {
        remove_if_exists(&self.artifact_path)
            .map_err(|e| UpdateError::Download(format!("cannot remove stale artifact: {e}")))?;

        let result = self
            .feed
            .open(url)
            .and_then(|download| {
                write_artifact(download, &self.artifact_path, progress)
                    .map_err(|e| UpdateError::Download(e.to_string()))
            });

        match result {
            Ok(bytes) => {
                info!(path = %self.artifact_path.display(), bytes, "Update downloaded");
                if let Some(session) = self.session.as_mut() {
                    session.artifact_path = Some(self.artifact_path.clone());
                }
                Ok(self.artifact_path.clone())
            }
            Err(e) => {
                error!(error = %e, "Failed to download update");
                if let Err(cleanup) = remove_if_exists(&self.artifact_path) {
                    warn!(error = %cleanup, "Failed to remove partial update");
                }
                Err(match e {
                    UpdateError::Download(_) => e,
                    other => UpdateError::Download(other.to_string()),
                })
            }
        }
    }

    /// Delete the updater copy left by a finished update.
    pub fn remove_staged_updater(&self) {
        if self.updater_path == self.target_executable {
            return;
        }
        match remove_if_exists(&self.updater_path) {
            Ok(()) => debug!(updater = %self.updater_path.display(), "Updater copy removed"),
            Err(e) => warn!(error = %e, "Failed to remove updater copy"),
        }
    }

    /// Stage the updater copy and launch it. The caller should exit next.
    pub fn apply_update(&self, launcher: &dyn Launcher) -> Result<(), UpdateError> {
        let artifact = self
            .session
            .as_ref()
            .and_then(|s| s.artifact_path.clone())
            .ok_or(UpdateError::NothingToApply)?;

        fs::copy(&self.target_executable, &self.updater_path)?;
        let args: Vec<OsString> = vec![
            "--update".into(),
            artifact.into_os_string(),
            self.target_executable.clone().into_os_string(),
        ];

        launcher
            .launch(&self.updater_path, &args)
            .map_err(|source| UpdateError::Spawn {
                path: self.updater_path.clone(),
                source,
            })?;
        info!(updater = %self.updater_path.display(), "Updater launched");
        Ok(())
    }
}

/// Stream `download` into `path`. Returns the number of bytes written.
pub fn write_artifact(
    mut download: Download,
    path: &Path,
    progress: &mut dyn FnMut(u8),
) -> io::Result<u64> {
    let mut file = fs::File::create(path)?;

    let written = match download.length.filter(|len| *len > 0) {
        Some(total) => {
            let mut buf = [0u8; CHUNK_SIZE];
            let mut done: u64 = 0;
            let mut last = None;
            loop {
                let n = download.reader.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                file.write_all(&buf[..n])?;
                done += n as u64;

                let percent = (done.saturating_mul(100) / total).min(100) as u8;
                if last != Some(percent) {
                    progress(percent);
                    last = Some(percent);
                }
            }
            if done != total {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("expected {total} bytes, received {done}"),
                ));
            }
            done
        }
        None => {
            let mut body = Vec::new();
            download.reader.read_to_end(&mut body)?;
            file.write_all(&body)?;
            body.len() as u64
        }
    };

    file.sync_all()?;
    Ok(written)
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
