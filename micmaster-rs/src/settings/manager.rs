//! Profile CRUD, active-profile selection and reapplication.
//!
//! Every mutation is persisted immediately. Validation failures leave the
//! document untouched; a failed save leaves the in-memory change in place
//! and it is written again by the next mutation.

use super::profile::{Profile, Theme, DEFAULT_PROFILE};
use super::store::{SettingsDocument, SettingsStore};
use super::SettingsError;
use crate::audio::NotificationPolicy;
use crate::error::{AppError, ValidationError};
use crate::hotkey::HotkeyBinding;
use std::fmt;
use tracing::{info, warn};

/// Components a profile is applied to.
pub trait ProfileTargets {
    fn apply_volume(&mut self, percent: u8) -> Result<(), AppError>;

    fn apply_presentation(&mut self, theme: Theme, tray_enabled: bool) -> Result<(), AppError>;

    fn apply_logging(&mut self, enabled: bool) -> Result<(), AppError>;

    fn apply_notifications(&mut self, policy: NotificationPolicy) -> Result<(), AppError>;

    fn apply_hotkey(&mut self, binding: Option<&HotkeyBinding>) -> Result<(), AppError>;

    fn apply_auto_mute(&mut self, enabled: bool, watchlist: &[String]) -> Result<(), AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReapplyStep {
    Volume,
    Presentation,
    Logging,
    Notifications,
    Hotkey,
    AutoMute,
}

impl fmt::Display for ReapplyStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReapplyStep::Volume => "volume",
            ReapplyStep::Presentation => "theme",
            ReapplyStep::Logging => "logging",
            ReapplyStep::Notifications => "notifications",
            ReapplyStep::Hotkey => "hotkey",
            ReapplyStep::AutoMute => "auto-mute",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct StepFailure {
    pub step: ReapplyStep,
    pub error: AppError,
}

/// Push every field of `profile` into `targets`.
///
/// Steps are independent: a failing step is recorded and the rest still run.
pub fn reapply(profile: &Profile, targets: &mut dyn ProfileTargets) -> Vec<StepFailure> {
    let mut failures = Vec::new();
    let mut record = |step: ReapplyStep, result: Result<(), AppError>| {
        if let Err(error) = result {
            warn!(step = %step, error = %error, "Failed to apply profile setting");
            failures.push(StepFailure { step, error });
        }
    };

    record(ReapplyStep::Volume, targets.apply_volume(profile.volume));
    record(
        ReapplyStep::Presentation,
        targets.apply_presentation(profile.theme, profile.tray_enabled),
    );
    record(
        ReapplyStep::Logging,
        targets.apply_logging(profile.logging_enabled),
    );
    record(
        ReapplyStep::Notifications,
        targets.apply_notifications(profile.notification_policy()),
    );
    record(
        ReapplyStep::Hotkey,
        targets.apply_hotkey(profile.hotkey.as_ref()),
    );
    record(
        ReapplyStep::AutoMute,
        targets.apply_auto_mute(profile.auto_mute_enabled, &profile.auto_mute_watchlist),
    );
    failures
}

/// Outcome of a profile switch.
#[derive(Debug)]
pub struct SwitchReport {
    /// Index that became active
    pub index: usize,
    pub name: String,
    /// Why the requested index was not used, if it wasn't
    pub rejected: Option<ValidationError>,
    pub save_error: Option<SettingsError>,
    pub failures: Vec<StepFailure>,
}

/// Owns the settings document and the store it is persisted to.
pub struct ProfileManager {
    store: SettingsStore,
    document: SettingsDocument,
}

impl ProfileManager {
    /// Load the document from `store`. The second value is set when a
    /// freshly created or repaired document could not be written back.
    pub fn load(store: SettingsStore) -> (Self, Option<SettingsError>) {
        let loaded = store.load();
        (
            Self {
                store,
                document: loaded.document,
            },
            loaded.save_error,
        )
    }

    pub fn document(&self) -> &SettingsDocument {
        &self.document
    }

    pub fn names(&self) -> Vec<String> {
        self.document.names()
    }

    pub fn active_index(&self) -> usize {
        self.document.active_index()
    }

    pub fn active_name(&self) -> &str {
        self.document.active_name()
    }

    pub fn active_profile(&self) -> &Profile {
        self.document.active_profile()
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        self.store.save(&self.document)
    }

    pub fn create_profile(&mut self, name: &str) -> Result<(), SettingsError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if self.document.position(name).is_some() {
            return Err(ValidationError::DuplicateName(name.to_string()).into());
        }

        self.document.push(name.to_string(), Profile::default());
        info!(profile = name, "Created profile");
        self.save()
    }

    pub fn rename_profile(&mut self, old: &str, new: &str) -> Result<(), SettingsError> {
        let new = new.trim();
        if new.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if old == DEFAULT_PROFILE {
            return Err(ValidationError::ProtectedProfile(old.to_string()).into());
        }
        let index = self
            .document
            .position(old)
            .ok_or_else(|| ValidationError::UnknownProfile(old.to_string()))?;
        if old == new {
            return Ok(());
        }
        if self.document.position(new).is_some() {
            return Err(ValidationError::DuplicateName(new.to_string()).into());
        }

        self.document.rename_at(index, new.to_string());
        info!(from = old, to = new, "Renamed profile");
        self.save()
    }

    /// Delete a profile. Returns true if it was the active one, in which
    /// case the first profile is now active and must be reapplied.
    pub fn delete_profile(&mut self, name: &str) -> Result<bool, SettingsError> {
        if name == DEFAULT_PROFILE {
            return Err(ValidationError::ProtectedProfile(name.to_string()).into());
        }
        let index = self
            .document
            .position(name)
            .ok_or_else(|| ValidationError::UnknownProfile(name.to_string()))?;

        let was_active = self.document.remove_at(index);
        info!(profile = name, was_active, "Deleted profile");
        self.save()?;
        Ok(was_active)
    }

    /// Make profile `index` active and reapply it.
    ///
    /// An out-of-range index falls back to the first profile; the switch
    /// and reapplication still happen and the rejection is reported.
    pub fn switch_active_profile(
        &mut self,
        index: usize,
        targets: &mut dyn ProfileTargets,
    ) -> SwitchReport {
        let len = self.document.len();
        let (target, rejected) = if index < len {
            (index, None)
        } else {
            warn!(index, len, "Selected profile does not exist; reverting to the first profile");
            (0, Some(ValidationError::InvalidIndex { index, len }))
        };

        self.document.set_active_index(target);
        let save_error = self.save().err();
        info!(profile = self.document.active_name(), "Switched profile");

        let failures = reapply(self.document.active_profile(), targets);
        SwitchReport {
            index: self.document.active_index(),
            name: self.document.active_name().to_string(),
            rejected,
            save_error,
            failures,
        }
    }

    /// Edit the active profile, normalize it and persist.
    pub fn update_active_profile<F>(&mut self, edit: F) -> Result<(), SettingsError>
    where
        F: FnOnce(&mut Profile),
    {
        let profile = self.document.active_profile_mut();
        edit(profile);
        profile.normalize();
        self.save()
    }

    /// Replace every field of the active profile with its default.
    pub fn reset_active_profile(&mut self) -> Result<(), SettingsError> {
        *self.document.active_profile_mut() = Profile::default();
        info!(profile = self.document.active_name(), "Profile reset to defaults");
        self.save()
    }

    pub fn set_active_hotkey(&mut self, binding: Option<HotkeyBinding>) -> Result<(), SettingsError> {
        self.update_active_profile(|profile| profile.hotkey = binding)
    }
}
