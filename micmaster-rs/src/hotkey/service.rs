//! Hotkey capture state machine.
//!
//! `Idle -> Recording -> Bound`, `Bound -> Recording` to re-record and
//! `Bound -> Bound` when a profile is reloaded. At most one binding is
//! registered with the backend at any time.

use super::binding::{HotkeyBinding, KeyRecorder};
use super::{keys, HotkeyError};
use crate::error::ValidationError;
use crate::events::EventSender;
use crate::settings::ProfileManager;
use tracing::{info, warn};

/// OS side of global hotkeys and key recording.
pub trait HotkeyBackend {
    /// Start forwarding every key-down to `sink` as `AppEvent::KeyDown`.
    fn install_hook(&mut self, sink: EventSender) -> Result<(), HotkeyError>;

    fn remove_hook(&mut self);

    /// Register `binding` globally; presses arrive as `AppEvent::HotkeyTriggered`.
    fn register(&mut self, binding: &HotkeyBinding, sink: EventSender) -> Result<(), HotkeyError>;

    /// Fails with [`HotkeyError::NotFound`] when `binding` is not registered.
    fn unregister(&mut self, binding: &HotkeyBinding) -> Result<(), HotkeyError>;
}

/// Backend for platforms without global hotkey support.
pub struct UnsupportedHotkeys;

impl HotkeyBackend for UnsupportedHotkeys {
    fn install_hook(&mut self, _sink: EventSender) -> Result<(), HotkeyError> {
        Err(HotkeyError::Unsupported)
    }

    fn remove_hook(&mut self) {}

    fn register(&mut self, _binding: &HotkeyBinding, _sink: EventSender) -> Result<(), HotkeyError> {
        Err(HotkeyError::Unsupported)
    }

    fn unregister(&mut self, binding: &HotkeyBinding) -> Result<(), HotkeyError> {
        Err(HotkeyError::NotFound(binding.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
    Bound,
}

pub struct HotkeyCaptureService {
    backend: Box<dyn HotkeyBackend>,
    sink: EventSender,
    state: CaptureState,
    recorder: KeyRecorder,
    current: Option<HotkeyBinding>,
}

impl HotkeyCaptureService {
    pub fn new(backend: Box<dyn HotkeyBackend>, sink: EventSender) -> Self {
        Self {
            backend,
            sink,
            state: CaptureState::Idle,
            recorder: KeyRecorder::default(),
            current: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn current(&self) -> Option<&HotkeyBinding> {
        self.current.as_ref()
    }

    /// Text for the hotkey label.
    pub fn label(&self) -> String {
        match (self.state, &self.current) {
            (CaptureState::Recording, _) if self.recorder.is_empty() => {
                "Recording hotkey... Press the new hotkey.".to_string()
            }
            (CaptureState::Recording, _) => {
                format!("Recording hotkey: {}", self.recorder.label())
            }
            (_, Some(binding)) => format!("Recorded Hotkey: {}", binding),
            (_, None) => "No hotkey set".to_string(),
        }
    }

    /// Begin recording. Does nothing if a recording is already running.
    pub fn start_recording(&mut self) -> Result<(), HotkeyError> {
        if self.state == CaptureState::Recording {
            return Ok(());
        }
        self.recorder.clear();
        self.backend.install_hook(self.sink.clone())?;
        self.state = CaptureState::Recording;
        info!("Started recording hotkey");
        Ok(())
    }

    /// Add a key-down to the recording. Returns true if the label changed.
    pub fn record_key(&mut self, token: &str) -> bool {
        self.state == CaptureState::Recording && self.recorder.press(token)
    }

    /// True once a recording holds a non-modifier key and can be finished.
    pub fn is_complete(&self) -> bool {
        self.state == CaptureState::Recording && self.recorder.has_key()
    }

    /// Finish recording, register the captured binding and persist it into
    /// the active profile.
    ///
    /// If the new binding cannot be registered the previous one is
    /// registered again. When that fails too the service ends up `Idle` and
    /// the profile's hotkey is cleared.
    pub fn stop_recording(
        &mut self,
        profiles: &mut ProfileManager,
    ) -> Result<HotkeyBinding, HotkeyError> {
        if self.state != CaptureState::Recording {
            return Err(HotkeyError::NotRecording);
        }
        self.backend.remove_hook();
        self.state = self.resting_state();

        let binding = match self.recorder.finish() {
            Some(binding) => binding,
            None => {
                warn!("No keys were recorded");
                return Err(ValidationError::EmptyBinding.into());
            }
        };
        keys::chord_for(&binding)?;

        let previous = self.current.clone();
        self.release_current()?;
        self.state = CaptureState::Idle;

        if let Err(e) = self.backend.register(&binding, self.sink.clone()) {
            warn!(hotkey = %binding, error = %e, "Failed to register recorded hotkey");
            self.restore(previous, profiles);
            return Err(e);
        }
        self.current = Some(binding.clone());
        self.state = CaptureState::Bound;
        info!(hotkey = %binding, "Hotkey set");

        profiles.set_active_hotkey(Some(binding.clone()))?;
        Ok(binding)
    }

    /// Re-register `previous` after a failed replacement.
    fn restore(&mut self, previous: Option<HotkeyBinding>, profiles: &mut ProfileManager) {
        let Some(previous) = previous else {
            return;
        };
        match self.backend.register(&previous, self.sink.clone()) {
            Ok(()) => {
                info!(hotkey = %previous, "Previous hotkey restored");
                self.current = Some(previous);
                self.state = CaptureState::Bound;
            }
            Err(e) => {
                warn!(hotkey = %previous, error = %e, "Previous hotkey could not be restored");
                if let Err(e) = profiles.set_active_hotkey(None) {
                    warn!(error = %e, "Failed to clear the profile hotkey");
                }
            }
        }
    }

    /// Replace the registered binding with the one stored in a profile.
    pub fn load_from_profile(&mut self, binding: Option<&HotkeyBinding>) -> Result<(), HotkeyError> {
        if self.state == CaptureState::Recording {
            self.backend.remove_hook();
            self.state = self.resting_state();
        }

        self.release_current()?;
        self.state = CaptureState::Idle;

        if let Some(binding) = binding {
            self.backend.register(binding, self.sink.clone())?;
            self.current = Some(binding.clone());
            self.state = CaptureState::Bound;
            info!(hotkey = %binding, "Hotkey loaded from profile");
        }
        Ok(())
    }

    /// Drop the hook and the registration.
    pub fn shutdown(&mut self) {
        if self.state == CaptureState::Recording {
            self.backend.remove_hook();
        }
        if let Err(e) = self.release_current() {
            warn!(error = %e, "Failed to remove hotkey on shutdown");
        }
        self.state = CaptureState::Idle;
    }

    fn resting_state(&self) -> CaptureState {
        if self.current.is_some() {
            CaptureState::Bound
        } else {
            CaptureState::Idle
        }
    }

    fn release_current(&mut self) -> Result<(), HotkeyError> {
        let Some(old) = self.current.as_ref() else {
            return Ok(());
        };
        match self.backend.unregister(old) {
            Ok(()) => info!(hotkey = %old, "Removed hotkey"),
            Err(HotkeyError::NotFound(_)) => {
                warn!(hotkey = %old, "Hotkey not found when trying to remove")
            }
            Err(e) => return Err(e),
        }
        self.current = None;
        Ok(())
    }
}
