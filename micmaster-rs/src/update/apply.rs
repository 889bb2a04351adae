//! Replace-and-relaunch, run by the updater instance.
//!
//! Waits for every other process named like the target executable to exit,
//! moves the downloaded artifact over the target and starts it.

use super::UpdateError;
use crate::process::ProcessSource;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::Path;
use std::process::Command;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// Polling schedule for the wait on the old instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOptions {
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_attempts: 30,
        }
    }
}

/// Starts detached processes.
pub trait Launcher {
    fn launch(&self, program: &Path, args: &[OsString]) -> io::Result<()>;
}

/// Launcher backed by `std::process::Command`.
#[derive(Debug, Default)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    fn launch(&self, program: &Path, args: &[OsString]) -> io::Result<()> {
        Command::new(program).args(args).spawn().map(|_| ())
    }
}

/// Replace `target` with `artifact` once the old instance has exited, then
/// launch it.
///
/// On [`UpdateError::ExitTimeout`] neither file has been touched.
pub fn replace_and_relaunch(
    artifact: &Path,
    target: &Path,
    processes: &mut dyn ProcessSource,
    launcher: &dyn Launcher,
    options: &ApplyOptions,
) -> Result<(), UpdateError> {
    if !artifact.is_file() {
        return Err(UpdateError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("update artifact {} not found", artifact.display()),
        )));
    }

    let exe_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    wait_for_exit(&exe_name, processes, options)?;

    replace_file(artifact, target)?;
    info!(target = %target.display(), "Replaced executable");

    launcher
        .launch(target, &[])
        .map_err(|source| UpdateError::Spawn {
            path: target.to_path_buf(),
            source,
        })?;
    info!(target = %target.display(), "Relaunched updated application");
    Ok(())
}

fn wait_for_exit(
    exe_name: &str,
    processes: &mut dyn ProcessSource,
    options: &ApplyOptions,
) -> Result<(), UpdateError> {
    let own_pid = std::process::id();
    for attempt in 1..=options.max_attempts {
        let snapshot = processes.snapshot()?;
        if !snapshot.is_running_except(exe_name, own_pid) {
            info!(exe = exe_name, attempt, "Application has exited");
            return Ok(());
        }
        info!(exe = exe_name, attempt, "Waiting for application to exit");
        if attempt < options.max_attempts {
            thread::sleep(options.poll_interval);
        }
    }

    Err(UpdateError::ExitTimeout {
        name: exe_name.to_string(),
        attempts: options.max_attempts,
    })
}

/// Move `from` over `to`, copying when a rename is not possible.
fn replace_file(from: &Path, to: &Path) -> Result<(), UpdateError> {
    if let Err(e) = fs::rename(from, to) {
        warn!(error = %e, "Rename failed; copying update instead");
        fs::copy(from, to)?;
        if let Err(e) = fs::remove_file(from) {
            warn!(error = %e, "Failed to remove update artifact");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeProcesses, RecordingLauncher};
    use tempfile::tempdir;

    fn fast() -> ApplyOptions {
        ApplyOptions {
            poll_interval: Duration::from_millis(1),
            max_attempts: 30,
        }
    }

    #[test]
    fn test_replaces_after_old_instance_exits() {
        let dir = tempdir().unwrap();
        let artifact = dir.path().join("MicMaster_update.exe");
        let target = dir.path().join("MicMaster.exe");
        fs::write(&artifact, b"new build").unwrap();
        fs::write(&target, b"old build").unwrap();

        let processes = FakeProcesses::with(&["MicMaster.exe", "explorer.exe"]);
        processes.clear_after(3);
        let launcher = RecordingLauncher::default();

        replace_and_relaunch(&artifact, &target, &mut processes.clone(), &launcher, &fast()).unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"new build");
        assert!(!artifact.exists());
        assert_eq!(launcher.launches(), vec![(target.clone(), Vec::new())]);
        assert!(processes.snapshots() >= 4);
    }

    #[test]
    fn test_timeout_leaves_files_untouched() {
        let dir = tempdir().unwrap();
        let artifact = dir.path().join("MicMaster_update.exe");
        let target = dir.path().join("MicMaster.exe");
        fs::write(&artifact, b"new build").unwrap();
        fs::write(&target, b"old build").unwrap();

        let mut processes = FakeProcesses::with(&["micmaster.exe"]);
        let launcher = RecordingLauncher::default();

        let err = replace_and_relaunch(&artifact, &target, &mut processes, &launcher, &fast())
            .unwrap_err();
        assert!(matches!(err, UpdateError::ExitTimeout { attempts: 30, .. }));
        assert_eq!(fs::read(&target).unwrap(), b"old build");
        assert_eq!(fs::read(&artifact).unwrap(), b"new build");
        assert!(launcher.launches().is_empty());
        assert_eq!(processes.snapshots(), 30);
    }

    #[test]
    fn test_timeout_does_not_sleep_after_last_check() {
        let dir = tempdir().unwrap();
        let artifact = dir.path().join("MicMaster_update.exe");
        fs::write(&artifact, b"new build").unwrap();
        let mut processes = FakeProcesses::with(&["MicMaster.exe"]);
        let options = ApplyOptions {
            poll_interval: Duration::from_secs(30),
            max_attempts: 1,
        };

        let started = std::time::Instant::now();
        let err = replace_and_relaunch(
            &artifact,
            &dir.path().join("MicMaster.exe"),
            &mut processes,
            &RecordingLauncher::default(),
            &options,
        )
        .unwrap_err();
        assert!(matches!(err, UpdateError::ExitTimeout { attempts: 1, .. }));
        assert_eq!(processes.snapshots(), 1);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_missing_artifact_fails_before_waiting() {
        let dir = tempdir().unwrap();
        let mut processes = FakeProcesses::with(&[]);
        let launcher = RecordingLauncher::default();

        let err = replace_and_relaunch(
            &dir.path().join("missing.exe"),
            &dir.path().join("MicMaster.exe"),
            &mut processes,
            &launcher,
            &fast(),
        )
        .unwrap_err();
        assert!(matches!(err, UpdateError::Io(_)));
        assert_eq!(processes.snapshots(), 0);
    }
}
