//! Global hotkey recording and registration.
//!
//! Recording installs a low-level keyboard hook that forwards key-downs to
//! the control thread. A recorded binding is registered on a dedicated
//! listener thread that only enqueues `HotkeyTriggered`.

pub mod binding;
pub mod keys;
pub mod service;

#[cfg(windows)]
pub mod win32;

pub use binding::{HotkeyBinding, KeyRecorder};
pub use service::{CaptureState, HotkeyBackend, HotkeyCaptureService, UnsupportedHotkeys};

use crate::error::ValidationError;
use crate::settings::SettingsError;
use thiserror::Error;

/// Hotkey service error types.
#[derive(Debug, Error)]
pub enum HotkeyError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("No hotkey recording is in progress")]
    NotRecording,

    #[error("Hotkey '{0}' is not registered")]
    NotFound(String),

    #[error("Hotkey '{binding}' cannot be registered: {reason}")]
    InvalidBinding { binding: String, reason: String },

    #[error("Failed to register hotkey '{binding}': {detail}")]
    Registration { binding: String, detail: String },

    #[error("Failed to install keyboard hook: {0}")]
    Hook(String),

    #[error("Global hotkeys are not supported on this platform")]
    Unsupported,

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// The hotkey backend for the current platform.
pub fn platform_backend() -> Box<dyn HotkeyBackend> {
    #[cfg(windows)]
    {
        Box::new(win32::Win32Hotkeys::new())
    }
    #[cfg(not(windows))]
    {
        Box::new(UnsupportedHotkeys)
    }
}
