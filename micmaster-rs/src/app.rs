//! Application state and lifecycle management.
//!
//! [`App`] lives on the control thread. It owns every component, drains the
//! event queue, runs the auto-mute schedule and turns errors into messages
//! for the [`Presenter`].

use crate::audio::{
    EndpointProvider, LevelSampler, MuteController, NotificationMode, NotificationPolicy,
    Notifier,
};
use crate::automute::AutoMuteMonitor;
use crate::config::Config;
use crate::error::AppError;
use crate::events::{AppEvent, Command, EventSender};
use crate::hotkey::{HotkeyBackend, HotkeyBinding, HotkeyCaptureService, HotkeyError};
use crate::logging::LogControl;
use crate::platform::StartupRegistration;
use crate::process::ProcessSource;
use crate::settings::{
    reapply, Profile, ProfileManager, ProfileTargets, SettingsError, StepFailure, Theme,
};
use crate::update::{Launcher, ReleaseFeed, UpdateCheck, UpdateCoordinator, UpdateError};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Where the control thread sends everything the user should see.
pub trait Presenter {
    fn status(&mut self, text: &str);

    fn error(&mut self, title: &str, message: &str);

    fn hotkey_label(&mut self, text: &str);

    fn audio_level(&mut self, level: u8);

    fn list(&mut self, title: &str, items: &[String]);

    /// Theme and tray flag of the active profile.
    fn presentation(&mut self, theme: Theme, tray_enabled: bool);
}

/// Why the control loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Quit,
    /// The updater instance was launched and this one must exit.
    Updating,
}

/// Platform services the app is built from.
pub struct Services {
    pub notifier: Box<dyn Notifier>,
    pub hotkeys: Box<dyn HotkeyBackend>,
    /// Process source polled by auto-mute
    pub auto_mute_processes: Box<dyn ProcessSource>,
    /// Process source for the application listing
    pub listing_processes: Box<dyn ProcessSource>,
    pub feed: Box<dyn ReleaseFeed>,
    pub launcher: Box<dyn Launcher>,
    pub startup: Box<dyn StartupRegistration>,
    pub presenter: Box<dyn Presenter>,
    /// Executable an update replaces
    pub target_executable: PathBuf,
}

/// Components a profile is applied to.
struct Runtime {
    mute: MuteController,
    hotkeys: HotkeyCaptureService,
    auto_mute: AutoMuteMonitor,
    log: LogControl,
    theme: Theme,
    tray_enabled: bool,
    presenter: Box<dyn Presenter>,
}

impl ProfileTargets for Runtime {
    fn apply_volume(&mut self, percent: u8) -> Result<(), AppError> {
        self.mute.set_volume_percent(i32::from(percent))?;
        Ok(())
    }

    fn apply_presentation(&mut self, theme: Theme, tray_enabled: bool) -> Result<(), AppError> {
        self.theme = theme;
        self.tray_enabled = tray_enabled;
        self.presenter.presentation(theme, tray_enabled);
        Ok(())
    }

    fn apply_logging(&mut self, enabled: bool) -> Result<(), AppError> {
        self.log.set_file_logging(enabled)?;
        Ok(())
    }

    fn apply_notifications(&mut self, policy: NotificationPolicy) -> Result<(), AppError> {
        self.mute.set_notification_policy(policy);
        Ok(())
    }

    fn apply_hotkey(&mut self, binding: Option<&HotkeyBinding>) -> Result<(), AppError> {
        let result = self.hotkeys.load_from_profile(binding);
        self.presenter.hotkey_label(&self.hotkeys.label());
        result?;
        Ok(())
    }

    fn apply_auto_mute(&mut self, enabled: bool, watchlist: &[String]) -> Result<(), AppError> {
        self.auto_mute.configure(enabled, watchlist);
        Ok(())
    }
}

/// Main application state.
pub struct App {
    profiles: ProfileManager,
    rt: Runtime,
    updates: UpdateCoordinator,
    processes: Box<dyn ProcessSource>,
    launcher: Box<dyn Launcher>,
    startup: Box<dyn StartupRegistration>,
    sampler: Option<LevelSampler>,
    config: Config,
    exit: Option<ExitReason>,
}

impl App {
    pub fn new(
        config: Config,
        profiles: ProfileManager,
        services: Services,
        log: LogControl,
        sink: EventSender,
    ) -> Self {
        let updates = UpdateCoordinator::new(
            services.feed,
            config.current_version.clone(),
            config.update_artifact_path.clone(),
            config.updater_path.clone(),
            services.target_executable,
        );
        let profile = profiles.active_profile();
        let rt = Runtime {
            mute: MuteController::new(services.notifier),
            hotkeys: HotkeyCaptureService::new(services.hotkeys, sink),
            auto_mute: AutoMuteMonitor::new(services.auto_mute_processes, config.auto_mute_period),
            log,
            theme: profile.theme,
            tray_enabled: profile.tray_enabled,
            presenter: services.presenter,
        };
        Self {
            profiles,
            rt,
            updates,
            processes: services.listing_processes,
            launcher: services.launcher,
            startup: services.startup,
            sampler: None,
            config,
            exit: None,
        }
    }

    /// Bind the default microphone and apply the active profile.
    pub fn start(&mut self, provider: &dyn EndpointProvider) {
        if let Err(e) = self.rt.mute.bind(provider) {
            self.report(e.into());
        }
        self.apply_active_profile();
        self.updates.remove_staged_updater();
        info!(profile = %self.profiles.active_name(), "MicMaster started");
        self.show_status();
    }

    /// Keep the level sampler alive until shutdown.
    pub fn attach_sampler(&mut self, sampler: LevelSampler) {
        self.sampler = Some(sampler);
    }

    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.exit
    }

    pub fn should_exit(&self) -> bool {
        self.exit.is_some()
    }

    pub fn is_muted(&self) -> bool {
        self.rt.mute.is_muted()
    }

    pub fn profiles(&self) -> &ProfileManager {
        &self.profiles
    }

    /// Process events until a quit or update hand-off is requested, or
    /// every sender is gone.
    pub fn run(&mut self, events: &Receiver<AppEvent>) -> ExitReason {
        while !self.should_exit() {
            match events.recv_timeout(self.config.drain_interval) {
                Ok(event) => {
                    self.handle_event(event);
                    while !self.should_exit() {
                        match events.try_recv() {
                            Ok(event) => self.handle_event(event),
                            Err(_) => break,
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    info!("Event queue closed");
                    self.exit = Some(ExitReason::Quit);
                }
            }
            self.tick(Instant::now());
        }
        self.exit.unwrap_or(ExitReason::Quit)
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::HotkeyTriggered => {
                debug!("Hotkey pressed");
                self.dispatch(Command::ToggleMute);
            }
            AppEvent::KeyDown(token) => {
                if self.rt.hotkeys.record_key(&token) {
                    let label = self.rt.hotkeys.label();
                    self.rt.presenter.hotkey_label(&label);
                }
                // Modifiers first, then the key: the chord is finished on its first non-modifier.
                if self.rt.hotkeys.is_complete() {
                    self.dispatch(Command::StopRecording);
                }
            }
            AppEvent::AudioLevel(level) => self.rt.presenter.audio_level(level),
            AppEvent::Command(command) => self.dispatch(command),
        }
    }

    /// Run the auto-mute schedule.
    pub fn tick(&mut self, now: Instant) {
        match self.rt.auto_mute.poll(now, &mut self.rt.mute) {
            Ok(Some(outcome)) if outcome.changed => self.show_status(),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Auto-mute could not change the microphone"),
        }
    }

    /// Stop background threads and release the hotkey.
    pub fn shutdown(&mut self) {
        if let Some(mut sampler) = self.sampler.take() {
            sampler.stop();
        }
        self.rt.hotkeys.shutdown();
        info!("MicMaster stopped");
    }

    fn dispatch(&mut self, command: Command) {
        debug!(?command, "Handling command");
        if let Err(e) = self.execute(command) {
            self.report(e);
        }
    }

    pub fn execute(&mut self, command: Command) -> Result<(), AppError> {
        match command {
            Command::ToggleMute => {
                self.rt.mute.toggle()?;
                self.show_status();
            }
            Command::SetMute(muted) => {
                self.rt.mute.set_mute(muted)?;
                self.show_status();
            }
            Command::SetVolume(percent) => {
                let applied = self.rt.mute.set_volume_percent(percent)?;
                self.profiles
                    .update_active_profile(|p| p.volume = applied)?;
                self.show_status();
            }

            Command::StartRecording => {
                self.rt.hotkeys.start_recording()?;
                self.show_hotkey();
            }
            Command::StopRecording => {
                let result = self.rt.hotkeys.stop_recording(&mut self.profiles);
                self.show_hotkey();
                match result {
                    Ok(binding) => info!(hotkey = %binding, "Hotkey saved"),
                    // Already finished by its own keystrokes.
                    Err(HotkeyError::NotRecording) => debug!("No recording to stop"),
                    Err(e) => return Err(e.into()),
                }
            }

            Command::ListProfiles => {
                let active = self.profiles.active_index();
                let items: Vec<String> = self
                    .profiles
                    .names()
                    .into_iter()
                    .enumerate()
                    .map(|(i, name)| {
                        let marker = if i == active { "*" } else { " " };
                        format!("{marker} {i}: {name}")
                    })
                    .collect();
                self.rt.presenter.list("Profiles", &items);
            }
            Command::SwitchProfile(index) => self.switch_profile(index),
            Command::CreateProfile(name) => {
                self.profiles.create_profile(&name)?;
                self.rt
                    .presenter
                    .status(&format!("Profile '{}' created", name.trim()));
            }
            Command::RenameProfile { from, to } => {
                self.profiles.rename_profile(&from, &to)?;
                self.rt
                    .presenter
                    .status(&format!("Profile '{from}' renamed to '{}'", to.trim()));
            }
            Command::DeleteProfile(name) => {
                let was_active = self.profiles.delete_profile(&name)?;
                self.rt
                    .presenter
                    .status(&format!("Profile '{name}' deleted"));
                if was_active {
                    self.apply_active_profile();
                    self.show_status();
                }
            }

            // Edits below take effect even when saving them fails; the save error is reported after.
            Command::WatchApp(name) => {
                let mut added = false;
                let saved = self.edit_profile(|p| added = p.add_watched_app(&name));
                if !added {
                    self.rt
                        .presenter
                        .status(&format!("'{}' is already watched", name.trim()));
                }
                self.configure_auto_mute();
                saved?;
            }
            Command::UnwatchApp(name) => {
                let saved = self.edit_profile(|p| {
                    p.remove_watched_app(&name);
                });
                self.configure_auto_mute();
                saved?;
            }
            Command::SetAutoMute(enabled) => {
                let saved = self.edit_profile(|p| p.auto_mute_enabled = enabled);
                self.configure_auto_mute();
                saved?;
            }
            Command::SetNotifications(mode) => {
                let policy = NotificationPolicy::from_mode(mode);
                let saved = self.edit_profile(|p| p.set_notification_policy(policy));
                self.rt.mute.set_notification_policy(policy);
                if mode == NotificationMode::Off {
                    info!("Notifications disabled");
                }
                saved?;
            }
            Command::SetTheme(theme) => {
                let saved = self.edit_profile(|p| p.theme = theme);
                let tray = self.rt.tray_enabled;
                self.rt.apply_presentation(theme, tray)?;
                saved?;
            }
            Command::SetTray(enabled) => {
                let saved = self.edit_profile(|p| p.tray_enabled = enabled);
                let theme = self.rt.theme;
                self.rt.apply_presentation(theme, enabled)?;
                saved?;
            }
            Command::SetLogging(enabled) => {
                let saved = self.edit_profile(|p| p.logging_enabled = enabled);
                self.rt.apply_logging(enabled)?;
                saved?;
            }
            Command::SetStartup(enabled) => {
                self.startup.set_enabled(enabled)?;
                self.edit_profile(|p| p.startup_enabled = enabled)?;
                self.rt.presenter.status(if enabled {
                    "MicMaster will start at login"
                } else {
                    "MicMaster will not start at login"
                });
            }
            Command::ResetProfile => {
                let saved = self.profiles.reset_active_profile();
                self.apply_active_profile();
                self.disable_startup_entry();
                self.rt.presenter.status(&format!(
                    "Profile '{}' reset to defaults",
                    self.profiles.active_name()
                ));
                saved?;
            }

            Command::ListProcesses => {
                let names = self.processes.snapshot()?.sorted_names();
                self.rt.presenter.list("Running applications", &names);
            }
            Command::CheckForUpdate => self.check_for_update()?,
            Command::InstallUpdate => self.install_update()?,
            Command::Status => self.show_status(),
            Command::Quit => {
                info!("Quit requested");
                self.exit = Some(ExitReason::Quit);
            }
        }
        Ok(())
    }

    fn check_for_update(&mut self) -> Result<(), AppError> {
        let message = match self.updates.check_for_update()? {
            UpdateCheck::UpToDate { .. } => "You are using the latest version.".to_string(),
            UpdateCheck::Available {
                version,
                download_url: Some(_),
            } => format!("A new version ({version}) is available. Type 'install' to update."),
            UpdateCheck::Available {
                version,
                download_url: None,
            } => format!("A new version ({version}) is available, but it has no download."),
        };
        self.rt.presenter.status(&message);
        Ok(())
    }

    fn install_update(&mut self) -> Result<(), AppError> {
        let url = self
            .updates
            .session()
            .and_then(|s| s.download_url.clone())
            .ok_or(UpdateError::NothingToApply)?;

        let presenter = &mut self.rt.presenter;
        self.updates.download_update(&url, &mut |percent| {
            presenter.status(&format!("Downloading update: {percent}%"));
        })?;
        self.updates.apply_update(self.launcher.as_ref())?;

        self.rt
            .presenter
            .status("Installing the update. MicMaster will restart.");
        self.exit = Some(ExitReason::Updating);
        Ok(())
    }

    fn switch_profile(&mut self, index: usize) {
        let report = self.profiles.switch_active_profile(index, &mut self.rt);
        if let Some(rejected) = report.rejected {
            self.report(rejected.into());
        }
        if let Some(e) = report.save_error {
            self.report(e.into());
        }
        self.report_failures(report.failures);
        self.rt
            .presenter
            .status(&format!("Switched to profile '{}'", report.name));
        self.show_status();
    }

    fn apply_active_profile(&mut self) {
        let failures = reapply(self.profiles.active_profile(), &mut self.rt);
        self.report_failures(failures);
    }

    /// Edit and persist the active profile.
    fn edit_profile<F>(&mut self, edit: F) -> Result<(), SettingsError>
    where
        F: FnOnce(&mut Profile),
    {
        self.profiles.update_active_profile(edit)
    }

    /// Remove the login entry left behind by a profile that was reset.
    fn disable_startup_entry(&mut self) {
        match self.startup.is_enabled() {
            Ok(true) => {
                if let Err(e) = self.startup.set_enabled(false) {
                    self.report(e.into());
                }
            }
            Ok(false) => {}
            Err(e) => warn!(error = %e, "Could not read the launch-at-login entry"),
        }
    }

    fn configure_auto_mute(&mut self) {
        let profile = self.profiles.active_profile();
        self.rt
            .auto_mute
            .configure(profile.auto_mute_enabled, &profile.auto_mute_watchlist);
        let summary = if profile.auto_mute_watchlist.is_empty() {
            "none".to_string()
        } else {
            profile.auto_mute_watchlist.join(", ")
        };
        let state = if profile.auto_mute_enabled { "on" } else { "off" };
        self.rt
            .presenter
            .status(&format!("Auto-mute {state}, watching: {summary}"));
    }

    fn report_failures(&mut self, failures: Vec<StepFailure>) {
        for failure in failures {
            // Without a device every volume step fails; that was reported once at start.
            if matches!(failure.error, AppError::Audio(_)) && !self.rt.mute.is_bound() {
                continue;
            }
            self.report(failure.error);
        }
    }

    fn report(&mut self, err: AppError) {
        error!(error = %err, "{}", err.title());
        self.rt.presenter.error(err.title(), &err.user_message());
    }

    fn show_hotkey(&mut self) {
        let label = self.rt.hotkeys.label();
        self.rt.presenter.hotkey_label(&label);
    }

    fn show_status(&mut self) {
        let profile = self.profiles.active_name().to_string();
        let text = match self.rt.mute.device_name() {
            Some(device) => {
                let state = self.rt.mute.state();
                format!(
                    "{device}: {} | Volume {}% | Profile '{profile}'",
                    state.label(),
                    state.volume_percent()
                )
            }
            None => format!("No microphone | Profile '{profile}'"),
        };
        self.rt.presenter.status(&text);
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Some(mut sampler) = self.sampler.take() {
            sampler.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::NoAudioBackend;
    use crate::events::event_channel;
    use crate::platform::NoStartupRegistration;
    use std::fs;
    use crate::settings::SettingsStore;
    use crate::testing::{
        CountingNotifier, FakeDevice, FakeFeed, FakeHotkeys, FakeProcesses, FakeProvider,
        FakeStartup, RecordingLauncher, RecordingPresenter,
    };
    use std::rc::Rc;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Harness {
        app: App,
        device: Rc<FakeDevice>,
        hotkeys: FakeHotkeys,
        processes: FakeProcesses,
        feed: FakeFeed,
        launcher: RecordingLauncher,
        presenter: RecordingPresenter,
        dir: TempDir,
    }

    fn harness() -> Harness {
        harness_with(Box::new(NoStartupRegistration))
    }

    fn harness_with(startup: Box<dyn StartupRegistration>) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::with_data_dir(dir.path());
        let (profiles, save_error) =
            ProfileManager::load(SettingsStore::new(&config.settings_path));
        assert!(save_error.is_none());

        let hotkeys = FakeHotkeys::default();
        let processes = FakeProcesses::default();
        let feed = FakeFeed::new("1.0.5", Some("https://example.invalid/MicMaster.exe"));
        let launcher = RecordingLauncher::default();
        let presenter = RecordingPresenter::default();
        let (sink, _events) = event_channel();

        let services = Services {
            notifier: Box::new(CountingNotifier::default()),
            hotkeys: Box::new(hotkeys.clone()),
            auto_mute_processes: Box::new(processes.clone()),
            listing_processes: Box::new(processes.clone()),
            feed: Box::new(feed.clone()),
            launcher: Box::new(launcher.clone()),
            startup,
            presenter: Box::new(presenter.clone()),
            target_executable: dir.path().join("MicMaster.exe"),
        };
        let log = LogControl::detached(&config.log_path);
        let app = App::new(config, profiles, services, log, sink);

        Harness {
            app,
            device: FakeDevice::new(false, 0.5),
            hotkeys,
            processes,
            feed,
            launcher,
            presenter,
            dir,
        }
    }

    fn started() -> Harness {
        let mut h = harness();
        h.app.start(&FakeProvider::with(h.device.clone()));
        h
    }

    fn command(h: &mut Harness, command: Command) {
        h.app.handle_event(AppEvent::Command(command));
    }

    #[test]
    fn test_start_applies_active_profile() {
        let h = started();
        // Default profile volume is 100
        assert_eq!(h.device.volume.get(), 1.0);
        assert!(h.presenter.contains("status: Fake Microphone: Unmuted | Volume 100%"));
        assert!(h.presenter.contains("hotkey: No hotkey set"));
    }

    #[test]
    fn test_start_without_device_reports_once() {
        let mut h = harness();
        h.app.start(&NoAudioBackend);
        let errors: Vec<_> = h
            .presenter
            .lines()
            .into_iter()
            .filter(|l| l.starts_with("error:"))
            .collect();
        assert_eq!(errors, vec!["error: Microphone: No microphone device found."]);
        assert!(h.presenter.contains("No microphone | Profile 'Default'"));

        command(&mut h, Command::ToggleMute);
        assert!(h.presenter.contains("Failed to control the microphone."));
    }

    #[test]
    fn test_hotkey_event_toggles_mute() {
        let mut h = started();
        h.app.handle_event(AppEvent::HotkeyTriggered);
        assert!(h.device.muted.get());
        assert!(h.app.is_muted());
        h.app.handle_event(AppEvent::HotkeyTriggered);
        assert!(!h.device.muted.get());
    }

    #[test]
    fn test_record_hotkey_flow() {
        let mut h = started();
        command(&mut h, Command::StartRecording);
        assert!(h.hotkeys.hook_installed());
        h.app.handle_event(AppEvent::KeyDown("ctrl".into()));
        assert!(h.hotkeys.hook_installed());
        h.app.handle_event(AppEvent::KeyDown("m".into()));
        assert!(h.presenter.contains("hotkey: Recording hotkey: ctrl + m"));

        // Finished by the first non-modifier key
        assert!(!h.hotkeys.hook_installed());
        assert_eq!(h.hotkeys.registered().unwrap().as_str(), "ctrl+m");
        assert_eq!(
            h.app.profiles().active_profile().hotkey.as_ref().unwrap().as_str(),
            "ctrl+m"
        );
        assert!(h.presenter.contains("hotkey: Recorded Hotkey: ctrl+m"));
    }

    #[test]
    fn test_typed_stop_after_recording_keeps_hotkey() {
        let mut h = started();
        command(&mut h, Command::StartRecording);
        // The keystrokes of the typed "stop" line reach the hook too
        for key in ["ctrl", "m", "s", "t", "o", "p", "enter"] {
            h.app.handle_event(AppEvent::KeyDown(key.into()));
        }
        command(&mut h, Command::StopRecording);

        assert_eq!(h.hotkeys.registered().unwrap().as_str(), "ctrl+m");
        assert_eq!(
            h.app.profiles().active_profile().hotkey.as_ref().unwrap().as_str(),
            "ctrl+m"
        );
        assert!(!h.presenter.lines().iter().any(|l| l.starts_with("error:")));
        assert!(h.presenter.contains("hotkey: Recorded Hotkey: ctrl+m"));

        h.app.handle_event(AppEvent::HotkeyTriggered);
        assert!(h.device.muted.get());
    }

    #[test]
    fn test_stop_without_keys_is_reported() {
        let mut h = started();
        command(&mut h, Command::StartRecording);
        command(&mut h, Command::StopRecording);
        assert!(h.presenter.contains("Error: No keys were recorded."));
        assert!(h.app.profiles().active_profile().hotkey.is_none());
    }

    #[test]
    fn test_volume_is_clamped_and_persisted() {
        let mut h = started();
        command(&mut h, Command::SetVolume(150));
        assert_eq!(h.device.volume.get(), 1.0);
        command(&mut h, Command::SetVolume(40));
        assert!((h.device.volume.get() - 0.4).abs() < 1e-6);
        assert_eq!(h.app.profiles().active_profile().volume, 40);

        let (reloaded, _) =
            ProfileManager::load(SettingsStore::new(h.dir.path().join("settings.json")));
        assert_eq!(reloaded.active_profile().volume, 40);
    }

    #[test]
    fn test_switch_profile_reapplies_settings() {
        let mut h = started();
        command(&mut h, Command::CreateProfile("Work".into()));
        command(&mut h, Command::SwitchProfile(1));
        command(&mut h, Command::SetVolume(30));
        command(&mut h, Command::WatchApp("Teams.exe".into()));
        command(&mut h, Command::SetAutoMute(true));

        command(&mut h, Command::SwitchProfile(0));
        assert_eq!(h.device.volume.get(), 1.0);

        command(&mut h, Command::SwitchProfile(1));
        assert!((h.device.volume.get() - 0.3).abs() < 1e-6);
        assert_eq!(h.app.profiles().active_name(), "Work");
        assert!(h.presenter.contains("Switched to profile 'Work'"));
    }

    #[test]
    fn test_switch_out_of_range_falls_back() {
        let mut h = started();
        command(&mut h, Command::SwitchProfile(9));
        assert_eq!(h.app.profiles().active_index(), 0);
        assert!(h
            .presenter
            .contains("Selected profile does not exist. Reverting to the default profile."));
    }

    #[test]
    fn test_auto_mute_follows_watched_process() {
        let mut h = started();
        command(&mut h, Command::CreateProfile("Work".into()));
        command(&mut h, Command::SwitchProfile(1));
        command(&mut h, Command::WatchApp("teams.exe".into()));
        command(&mut h, Command::SetAutoMute(true));

        let start = Instant::now();
        h.processes.set(&["explorer.exe", "Teams.exe"]);
        h.app.tick(start);
        assert!(h.device.muted.get());

        h.processes.set(&["explorer.exe"]);
        h.app.tick(start + Duration::from_secs(1));
        assert!(h.device.muted.get(), "polled before the period elapsed");
        h.app.tick(start + Duration::from_secs(5));
        assert!(!h.device.muted.get());
    }

    #[test]
    fn test_edits_apply_when_saving_fails() {
        let mut h = started();
        command(&mut h, Command::CreateProfile("Work".into()));
        command(&mut h, Command::SwitchProfile(1));

        let settings = Config::with_data_dir(h.dir.path()).settings_path;
        fs::remove_file(&settings).unwrap();
        fs::create_dir(&settings).unwrap();
        h.presenter.clear();

        command(&mut h, Command::WatchApp("teams.exe".into()));
        command(&mut h, Command::SetAutoMute(true));
        command(&mut h, Command::SetTheme(Theme::Light));
        assert!(h.presenter.contains("error: Settings: Failed to save settings."));
        assert!(h.presenter.contains("status: Auto-mute on, watching: teams.exe"));
        assert!(h.presenter.contains("theme: Light tray: false"));

        h.processes.set(&["Teams.exe"]);
        h.app.tick(Instant::now());
        assert!(h.device.muted.get());
    }

    #[test]
    fn test_deleting_active_profile_reapplies_default() {
        let mut h = started();
        command(&mut h, Command::CreateProfile("Work".into()));
        command(&mut h, Command::SwitchProfile(1));
        command(&mut h, Command::SetVolume(20));
        command(&mut h, Command::DeleteProfile("Work".into()));
        assert_eq!(h.app.profiles().active_name(), "Default");
        assert_eq!(h.device.volume.get(), 1.0);

        command(&mut h, Command::DeleteProfile("Default".into()));
        assert!(h
            .presenter
            .contains("The 'Default' profile cannot be deleted or renamed."));
    }

    #[test]
    fn test_list_processes() {
        let mut h = started();
        h.processes.set(&["zoom.exe", "Teams.exe", "zoom.exe"]);
        command(&mut h, Command::ListProcesses);
        assert!(h
            .presenter
            .contains("list: Running applications: Teams.exe, zoom.exe"));
    }

    #[test]
    fn test_update_check_and_install() {
        let mut h = started();
        command(&mut h, Command::CheckForUpdate);
        assert!(h.presenter.contains("You are using the latest version."));

        command(&mut h, Command::InstallUpdate);
        assert!(h.presenter.contains("No update has been downloaded."));
        assert!(!h.app.should_exit());

        h.feed.set_version("1.1.0");
        command(&mut h, Command::CheckForUpdate);
        assert!(h.presenter.contains("A new version (1.1.0) is available."));
        std::fs::write(h.dir.path().join("MicMaster.exe"), b"old").unwrap();
        command(&mut h, Command::InstallUpdate);

        assert_eq!(h.launcher.launches().len(), 1);
        assert!(h.presenter.contains("Downloading update: 100%"));
        assert_eq!(h.app.exit_reason(), Some(ExitReason::Updating));
    }

    #[test]
    fn test_start_removes_updater_copy() {
        let mut h = harness();
        let updater = Config::with_data_dir(h.dir.path()).updater_path;
        fs::write(&updater, b"old build").unwrap();
        h.app.start(&FakeProvider::with(h.device.clone()));
        assert!(!updater.exists());
    }

    #[test]
    fn test_update_network_error_is_reported() {
        let mut h = started();
        h.feed
            .fail_with(|| UpdateError::Network("connection refused".into()));
        command(&mut h, Command::CheckForUpdate);
        assert!(h
            .presenter
            .contains("Error checking for updates. Check your internet connection."));
    }

    #[test]
    fn test_run_drains_queue_until_quit() {
        let mut h = started();
        let (tx, rx) = event_channel();
        tx.send(AppEvent::HotkeyTriggered).unwrap();
        tx.send(AppEvent::AudioLevel(42)).unwrap();
        tx.send(AppEvent::Command(Command::Quit)).unwrap();
        tx.send(AppEvent::HotkeyTriggered).unwrap();

        assert_eq!(h.app.run(&rx), ExitReason::Quit);
        // Events after Quit are not handled
        assert!(h.device.muted.get());
        assert!(h.presenter.contains("level: 42"));
    }

    #[test]
    fn test_run_ends_when_senders_drop() {
        let mut h = started();
        let (tx, rx) = event_channel();
        drop(tx);
        assert_eq!(h.app.run(&rx), ExitReason::Quit);
    }

    #[test]
    fn test_reset_profile_restores_defaults() {
        let mut h = started();
        command(&mut h, Command::SetVolume(10));
        command(&mut h, Command::SetTheme(Theme::Light));
        h.presenter.clear();
        command(&mut h, Command::ResetProfile);
        assert_eq!(h.app.profiles().active_profile().theme, Theme::Dark);
        assert_eq!(h.device.volume.get(), 1.0);
        assert!(h.presenter.contains("theme: Dark tray: false"));
    }

    #[test]
    fn test_reset_profile_removes_login_entry() {
        let startup = FakeStartup::default();
        let mut h = harness_with(Box::new(startup.clone()));
        h.app.start(&FakeProvider::with(h.device.clone()));
        command(&mut h, Command::SetStartup(true));
        assert!(startup.enabled());
        assert!(h.app.profiles().active_profile().startup_enabled);

        command(&mut h, Command::ResetProfile);
        assert!(!startup.enabled());
        assert!(!h.app.profiles().active_profile().startup_enabled);
    }

    #[test]
    fn test_startup_unsupported_is_reported() {
        let mut h = started();
        command(&mut h, Command::SetStartup(true));
        assert!(h
            .presenter
            .contains("Launch at login is not supported on this system."));
        assert!(!h.app.profiles().active_profile().startup_enabled);
    }
}
