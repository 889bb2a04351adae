//! Application-wide error types.
//!
//! Each component has its own error enum; [`AppError`] wraps them all and
//! is the one place where errors become user-facing text.

use crate::audio::AudioError;
use crate::hotkey::HotkeyError;
use crate::logging::LoggingError;
use crate::platform::PreferencesError;
use crate::process::ProcessError;
use crate::settings::SettingsError;
use crate::update::UpdateError;
use thiserror::Error;

/// Rejected user input. Nothing is changed when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("A profile named '{0}' already exists")]
    DuplicateName(String),

    #[error("No keys were recorded")]
    EmptyBinding,

    #[error("Profile index {index} is out of range ({len} profiles)")]
    InvalidIndex { index: usize, len: usize },

    #[error("The '{0}' profile cannot be deleted or renamed")]
    ProtectedProfile(String),

    #[error("No profile named '{0}'")]
    UnknownProfile(String),

    #[error("Profile name cannot be empty")]
    EmptyName,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Hotkey(#[from] HotkeyError),

    #[error(transparent)]
    Update(#[from] UpdateError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error(transparent)]
    Preferences(#[from] PreferencesError),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Settings(SettingsError::Validation(err))
    }
}

impl AppError {
    /// Short title for an error dialog.
    pub fn title(&self) -> &'static str {
        match self {
            AppError::Audio(_) => "Microphone",
            AppError::Settings(SettingsError::Validation(_)) => "Invalid input",
            AppError::Settings(_) => "Settings",
            AppError::Hotkey(_) => "Hotkey",
            AppError::Update(_) => "Update",
            AppError::Process(_) => "Applications",
            AppError::Logging(_) => "Logging",
            AppError::Preferences(_) => "Startup",
        }
    }

    /// Message shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Audio(AudioError::DeviceUnavailable) => {
                "No microphone device found.".to_string()
            }
            AppError::Audio(_) => "Failed to control the microphone.".to_string(),

            AppError::Settings(SettingsError::Validation(v))
            | AppError::Hotkey(HotkeyError::Validation(v)) => validation_message(v),
            AppError::Settings(_) | AppError::Hotkey(HotkeyError::Settings(_)) => {
                "Failed to save settings. Changes will be saved again on the next edit."
                    .to_string()
            }

            AppError::Hotkey(HotkeyError::InvalidBinding { binding, .. }) => format!(
                "'{binding}' cannot be used as a hotkey. Use modifiers plus exactly one key."
            ),
            AppError::Hotkey(HotkeyError::Registration { binding, .. }) => {
                format!("Failed to register hotkey '{binding}'. It may be in use by another application.")
            }
            AppError::Hotkey(HotkeyError::NotRecording) => {
                "No hotkey recording is in progress.".to_string()
            }
            AppError::Hotkey(HotkeyError::Unsupported) => {
                "Global hotkeys are not supported on this system.".to_string()
            }
            AppError::Hotkey(e) => format!("Hotkey error: {e}"),

            AppError::Update(UpdateError::NoReleases) => "No releases found.".to_string(),
            AppError::Update(UpdateError::Network(_)) => {
                "Error checking for updates. Check your internet connection.".to_string()
            }
            AppError::Update(UpdateError::MalformedResponse(_))
            | AppError::Update(UpdateError::Parse(_)) => {
                "Failed to retrieve latest version.".to_string()
            }
            AppError::Update(UpdateError::Download(_)) => {
                "Failed to download the update.".to_string()
            }
            AppError::Update(UpdateError::NothingToApply) => {
                "No update has been downloaded.".to_string()
            }
            AppError::Update(UpdateError::ExitTimeout { .. }) => {
                "Failed to update the application because it is still running.".to_string()
            }
            AppError::Update(e) => format!("Failed to update the application: {e}"),

            AppError::Process(_) => "Failed to list running applications.".to_string(),
            AppError::Logging(e) => format!("Failed to configure logging: {e}"),
            AppError::Preferences(PreferencesError::Unsupported) => {
                "Launch at login is not supported on this system.".to_string()
            }
            AppError::Preferences(_) => "Failed to update launch at login.".to_string(),
        }
    }
}

fn validation_message(err: &ValidationError) -> String {
    match err {
        ValidationError::DuplicateName(_) => "A profile with this name already exists.".to_string(),
        ValidationError::EmptyBinding => "Error: No keys were recorded.".to_string(),
        ValidationError::InvalidIndex { .. } => {
            "Selected profile does not exist. Reverting to the default profile.".to_string()
        }
        ValidationError::ProtectedProfile(name) => {
            format!("The '{name}' profile cannot be deleted or renamed.")
        }
        ValidationError::UnknownProfile(name) => format!("Profile '{name}' does not exist."),
        ValidationError::EmptyName => "Profile name cannot be empty.".to_string(),
    }
}
