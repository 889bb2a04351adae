//! MicMaster entry point.
//!
//! `micmaster-rs` runs the app on the console. `micmaster-rs --update
//! <artifact> [<target>]` is the updater instance: it replaces the target
//! executable once the old instance has exited and relaunches it.

use anyhow::{Context, Result};
use micmaster_rs::app::{App, Services};
use micmaster_rs::audio::{NoAudioBackend, SystemNotifier};
use micmaster_rs::config::Config;
use micmaster_rs::console::{self, ConsolePresenter};
use micmaster_rs::events::{event_channel, AppEvent, Command};
use micmaster_rs::logging::{self, LogControl};
use micmaster_rs::process::SystemProcesses;
use micmaster_rs::settings::{ProfileManager, SettingsStore};
use micmaster_rs::update::{replace_and_relaunch, GithubReleases, ProcessLauncher};
use micmaster_rs::{hotkey, platform};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

fn main() -> ExitCode {
    let args: Vec<OsString> = std::env::args_os().skip(1).collect();

    if args.first().is_some_and(|arg| arg == "--update") {
        return match apply_update(&args[1..]) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!(error = ?e, "Update failed");
                eprintln!("Update failed: {e:#}");
                ExitCode::FAILURE
            }
        };
    }

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "MicMaster failed");
            eprintln!("MicMaster failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Updater instance. Always logs to the file.
fn apply_update(args: &[OsString]) -> Result<()> {
    let config = Config::load()?;
    config.ensure_dirs()?;
    let _log = logging::init(&config.log_path, true)?;

    let artifact = PathBuf::from(args.first().context("missing update artifact path")?);
    let target = match args.get(1) {
        Some(target) => PathBuf::from(target),
        None => std::env::current_exe().context("cannot locate the running executable")?,
    };
    info!(
        artifact = %artifact.display(),
        target = %target.display(),
        "Applying update"
    );

    let mut processes = SystemProcesses::new();
    replace_and_relaunch(&artifact, &target, &mut processes, &ProcessLauncher, &config.apply)?;
    Ok(())
}

fn run() -> Result<()> {
    let config = Config::load()?;
    config.ensure_dirs()?;

    // The file layer follows the active profile once it is applied.
    let log = match logging::init(&config.log_path, false) {
        Ok(control) => control,
        Err(e) => {
            eprintln!("Logging unavailable: {e}");
            LogControl::detached(&config.log_path)
        }
    };
    info!(version = %config.current_version, data_dir = %config.data_dir.display(), "Starting MicMaster");

    let (profiles, save_error) = ProfileManager::load(SettingsStore::new(&config.settings_path));
    if let Some(e) = save_error {
        warn!(error = %e, "Settings could not be written back");
    }

    #[cfg(windows)]
    let _com = micmaster_rs::audio::ComGuard::new()?;

    let (sink, events) = event_channel();
    let services = Services {
        notifier: Box::new(SystemNotifier),
        hotkeys: hotkey::platform_backend(),
        auto_mute_processes: Box::new(SystemProcesses::new()),
        listing_processes: Box::new(SystemProcesses::new()),
        feed: Box::new(GithubReleases::new(
            config.releases_url.clone(),
            config.http_timeout,
        )),
        launcher: Box::new(ProcessLauncher),
        startup: platform::startup_registration(),
        presenter: Box::new(ConsolePresenter::new()),
        target_executable: std::env::current_exe()
            .context("cannot locate the running executable")?,
    };
    let mut app = App::new(config, profiles, services, log, sink.clone());

    #[cfg(windows)]
    {
        use micmaster_rs::audio::{DefaultMeter, DeviceEnumerator, LevelSampler, LevelSource};

        match DeviceEnumerator::new() {
            Ok(enumerator) => app.start(&enumerator),
            Err(e) => {
                warn!(error = %e, "Audio device enumeration unavailable");
                app.start(&NoAudioBackend);
            }
        }

        let open = || -> Result<Box<dyn LevelSource>, micmaster_rs::AudioError> {
            Ok(Box::new(DefaultMeter::open()?))
        };
        match LevelSampler::spawn(open, sink.clone()) {
            Ok(sampler) => app.attach_sampler(sampler),
            Err(e) => warn!(error = %e, "Input level sampling unavailable"),
        }
    }
    #[cfg(not(windows))]
    app.start(&NoAudioBackend);

    console::spawn_reader(sink.clone()).context("cannot start the console reader")?;
    println!("Type 'help' for a list of commands.");

    let _ = sink.send(AppEvent::Command(Command::CheckForUpdate));
    drop(sink);

    let reason = app.run(&events);
    app.shutdown();
    info!(?reason, "Exiting");
    Ok(())
}
