//! Profiles and their persistence.

pub mod manager;
pub mod profile;
pub mod store;

pub use manager::{reapply, ProfileManager, ProfileTargets, ReapplyStep, StepFailure, SwitchReport};
pub use profile::{Profile, Theme, DEFAULT_PROFILE};
pub use store::{LoadOrigin, Loaded, SettingsDocument, SettingsStore};

use crate::error::ValidationError;
use std::path::PathBuf;
use thiserror::Error;

/// Settings error types.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to save settings to {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
