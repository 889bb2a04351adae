//! MicMaster - Library
//!
//! Keeps the default microphone muted or unmuted from a global hotkey,
//! per-profile settings and a watch-list of applications.
//!
//! ## Features
//!
//! - Toggle mute with a recorded global hotkey
//! - Named profiles for volume, notifications, theme and auto-mute
//! - Auto-mute while selected applications are running
//! - Live input level sampling
//! - Self-update from GitHub releases
//! - Start with Windows option

pub mod app;
pub mod audio;
pub mod automute;
pub mod config;
pub mod console;
pub mod error;
pub mod events;
pub mod hotkey;
pub mod logging;
pub mod platform;
pub mod process;
pub mod settings;
pub mod update;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use app::{App, ExitReason, Presenter, Services};
pub use audio::{AudioError, MuteController, MuteState};
pub use config::Config;
pub use error::{AppError, ValidationError};
pub use events::{AppEvent, Command};
pub use settings::{Profile, ProfileManager, SettingsStore};
