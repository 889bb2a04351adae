//! Mute-change notifications.
//!
//! Decides which notification channel a profile enables and delivers the
//! cue. Rendering a desktop toast is left to the front end; the system
//! notifier records it in the log and the status line picks it up.

use tracing::{info, warn};

/// Notification channel for a mute change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationChannel {
    Desktop,
    Sound,
}

/// Notification choice as offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationMode {
    Off,
    Desktop,
    Sound,
}

/// Notification flags taken from the active profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NotificationPolicy {
    pub desktop: bool,
    pub sound: bool,
}

impl NotificationPolicy {
    /// Channel to use for a mute change. Sound wins over desktop.
    pub fn channel(&self) -> Option<NotificationChannel> {
        if self.sound {
            Some(NotificationChannel::Sound)
        } else if self.desktop {
            Some(NotificationChannel::Desktop)
        } else {
            None
        }
    }

    pub fn from_mode(mode: NotificationMode) -> Self {
        match mode {
            NotificationMode::Off => Self::default(),
            NotificationMode::Desktop => Self {
                desktop: true,
                sound: false,
            },
            NotificationMode::Sound => Self {
                desktop: false,
                sound: true,
            },
        }
    }
}

/// Delivers a mute-change cue.
pub trait Notifier {
    fn notify(&self, channel: NotificationChannel, muted: bool);
}

/// Notifier backed by the operating system.
#[derive(Debug, Default)]
pub struct SystemNotifier;

impl Notifier for SystemNotifier {
    fn notify(&self, channel: NotificationChannel, muted: bool) {
        let state = if muted { "muted" } else { "unmuted" };
        match channel {
            NotificationChannel::Sound => play_cue(muted),
            NotificationChannel::Desktop => {
                info!(target: "notification", "Microphone is now {}", state);
            }
        }
    }
}

#[cfg(windows)]
fn play_cue(muted: bool) {
    use windows::Win32::UI::WindowsAndMessaging::{MessageBeep, MB_ICONASTERISK, MB_ICONHAND};

    let style = if muted { MB_ICONHAND } else { MB_ICONASTERISK };
    unsafe {
        if let Err(e) = MessageBeep(style) {
            warn!(error = %e, "Failed to play notification sound");
        }
    }
}

#[cfg(not(windows))]
fn play_cue(_muted: bool) {
    use std::io::Write;

    let mut out = std::io::stdout();
    if let Err(e) = out.write_all(b"\x07").and_then(|_| out.flush()) {
        warn!(error = %e, "Failed to play notification sound");
    }
}
