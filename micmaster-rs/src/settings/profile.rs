//! Profile data model.

use crate::audio::NotificationPolicy;
use crate::hotkey::HotkeyBinding;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of the profile that always exists.
pub const DEFAULT_PROFILE: &str = "Default";

/// Window theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "Dark",
            Theme::Light => "Light",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(format!("unknown theme '{other}'")),
        }
    }
}

/// One named set of settings.
///
/// Field names on disk follow the settings file format, which predates
/// these Rust names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Target microphone volume (0-100)
    pub volume: u8,

    #[serde(rename = "startup")]
    pub startup_enabled: bool,

    #[serde(rename = "notifications")]
    pub notifications_enabled: bool,

    #[serde(rename = "sound_notifications")]
    pub sound_notifications_enabled: bool,

    pub theme: Theme,

    #[serde(rename = "enable_auto_mute")]
    pub auto_mute_enabled: bool,

    /// Process names that trigger auto-mute, in display order
    #[serde(rename = "auto_mute_apps")]
    pub auto_mute_watchlist: Vec<String>,

    pub tray_enabled: bool,

    #[serde(rename = "create_desktop_shortcut")]
    pub desktop_shortcut_enabled: bool,

    #[serde(rename = "enable_logging")]
    pub logging_enabled: bool,

    pub hotkey: Option<HotkeyBinding>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            volume: 100,
            startup_enabled: false,
            notifications_enabled: false,
            sound_notifications_enabled: false,
            theme: Theme::Dark,
            auto_mute_enabled: false,
            auto_mute_watchlist: Vec::new(),
            tray_enabled: false,
            desktop_shortcut_enabled: false,
            logging_enabled: true,
            hotkey: None,
        }
    }
}

impl Profile {
    pub fn notification_policy(&self) -> NotificationPolicy {
        NotificationPolicy {
            desktop: self.notifications_enabled,
            sound: self.sound_notifications_enabled,
        }
    }

    pub fn set_notification_policy(&mut self, policy: NotificationPolicy) {
        self.notifications_enabled = policy.desktop;
        self.sound_notifications_enabled = policy.sound;
    }

    /// True if `name` is on the watch-list, ignoring case.
    pub fn watches(&self, name: &str) -> bool {
        let wanted = name.to_lowercase();
        self.auto_mute_watchlist
            .iter()
            .any(|app| app.to_lowercase() == wanted)
    }

    /// Add a process name to the watch-list. Returns false if it was
    /// blank or already present.
    pub fn add_watched_app(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.watches(name) {
            return false;
        }
        self.auto_mute_watchlist.push(name.to_string());
        true
    }

    /// Remove a process name from the watch-list, ignoring case.
    pub fn remove_watched_app(&mut self, name: &str) -> bool {
        let wanted = name.trim().to_lowercase();
        let before = self.auto_mute_watchlist.len();
        self.auto_mute_watchlist
            .retain(|app| app.to_lowercase() != wanted);
        self.auto_mute_watchlist.len() != before
    }

    /// Clamp the volume and drop duplicate or blank watch-list entries.
    /// Returns true if anything changed.
    pub fn normalize(&mut self) -> bool {
        let mut changed = false;
        if self.volume > 100 {
            self.volume = 100;
            changed = true;
        }

        let previous = std::mem::take(&mut self.auto_mute_watchlist);
        let count = previous.len();
        for app in previous {
            self.add_watched_app(&app);
        }
        changed || self.auto_mute_watchlist.len() != count
    }
}
