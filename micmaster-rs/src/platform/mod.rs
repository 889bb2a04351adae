//! Platform integration.
//!
//! Launch-at-login registration. The Windows implementation writes the
//! per-user `Run` registry key.

#[cfg(windows)]
pub mod registry;

#[cfg(windows)]
pub use registry::RegistryStartup;

use thiserror::Error;

/// Preferences service error types.
#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("Failed to access registry: {0}")]
    RegistryAccess(String),

    #[error("Failed to write preference: {key}")]
    WriteFailed { key: String },

    #[error("Launch at login is not supported on this platform")]
    Unsupported,
}

/// Launch-at-login registration for the running executable.
pub trait StartupRegistration {
    fn is_enabled(&self) -> Result<bool, PreferencesError>;

    fn set_enabled(&self, enabled: bool) -> Result<(), PreferencesError>;
}

/// Registration for platforms without a supported mechanism.
pub struct NoStartupRegistration;

impl StartupRegistration for NoStartupRegistration {
    fn is_enabled(&self) -> Result<bool, PreferencesError> {
        Ok(false)
    }

    fn set_enabled(&self, _enabled: bool) -> Result<(), PreferencesError> {
        Err(PreferencesError::Unsupported)
    }
}

/// The startup registration for the current platform.
pub fn startup_registration() -> Box<dyn StartupRegistration> {
    #[cfg(windows)]
    {
        Box::new(RegistryStartup::new())
    }
    #[cfg(not(windows))]
    {
        Box::new(NoStartupRegistration)
    }
}
