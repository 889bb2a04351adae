//! Events delivered to the control thread.
//!
//! Every background thread (hotkey listener, recording hook, level sampler,
//! console reader) talks to the control thread only by sending an
//! [`AppEvent`] through the single-consumer queue created here.

use crate::audio::NotificationMode;
use crate::settings::Theme;
use std::sync::mpsc::{self, Receiver, Sender};

/// Producer half of the control-thread queue.
pub type EventSender = Sender<AppEvent>;

/// An event for the control thread.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The registered global hotkey was pressed
    HotkeyTriggered,

    /// A key went down while a hotkey recording is in progress
    KeyDown(String),

    /// Input level sample (0-100)
    AudioLevel(u8),

    /// A user command from the front end
    Command(Command),
}

/// User commands issued by the front end.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ToggleMute,
    SetMute(bool),
    SetVolume(i32),
    StartRecording,
    StopRecording,
    ListProfiles,
    SwitchProfile(usize),
    CreateProfile(String),
    RenameProfile { from: String, to: String },
    DeleteProfile(String),
    WatchApp(String),
    UnwatchApp(String),
    SetAutoMute(bool),
    SetNotifications(NotificationMode),
    SetTheme(Theme),
    SetTray(bool),
    SetLogging(bool),
    SetStartup(bool),
    ResetProfile,
    ListProcesses,
    CheckForUpdate,
    InstallUpdate,
    Status,
    Quit,
}

/// Create the control-thread event channel.
pub fn event_channel() -> (EventSender, Receiver<AppEvent>) {
    mpsc::channel()
}
