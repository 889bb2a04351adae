//! Audio device data models.
//!
//! Defines the mute/volume state mirrored from the default capture endpoint
//! and the seams the controller talks to the device through.

use thiserror::Error;

/// Mute and volume state of the bound capture endpoint.
///
/// Mirrored from the device at bind time and kept in sync by every
/// successful write. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MuteState {
    /// Current mute flag
    pub is_muted: bool,

    /// Volume level as scalar (0.0 to 1.0)
    pub volume_scalar: f32,
}

impl MuteState {
    /// Volume as percentage (0-100).
    pub fn volume_percent(&self) -> u8 {
        scalar_to_percent(self.volume_scalar)
    }

    /// Human-readable state, as shown in the status line.
    pub fn label(&self) -> &'static str {
        if self.is_muted {
            "Muted"
        } else {
            "Unmuted"
        }
    }
}

impl Default for MuteState {
    fn default() -> Self {
        Self {
            is_muted: false,
            volume_scalar: 1.0,
        }
    }
}

/// Convert an endpoint scalar into a rounded percentage.
pub fn scalar_to_percent(scalar: f32) -> u8 {
    (scalar.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// A capture endpoint exposing mute and master volume.
///
/// Implemented by the Windows endpoint-volume wrapper and by test fakes.
pub trait CaptureEndpoint {
    /// Friendly name of the device, for logs and status text.
    fn name(&self) -> String;

    fn get_mute(&self) -> Result<bool, AudioError>;

    fn set_mute(&self, muted: bool) -> Result<(), AudioError>;

    /// Master volume scalar (0.0 to 1.0).
    fn get_volume(&self) -> Result<f32, AudioError>;

    fn set_volume(&self, level: f32) -> Result<(), AudioError>;
}

/// Resolves the system's default capture endpoint.
pub trait EndpointProvider {
    fn default_capture(&self) -> Result<Box<dyn CaptureEndpoint>, AudioError>;
}

/// Provider used where no audio backend exists.
pub struct NoAudioBackend;

impl EndpointProvider for NoAudioBackend {
    fn default_capture(&self) -> Result<Box<dyn CaptureEndpoint>, AudioError> {
        Err(AudioError::DeviceUnavailable)
    }
}

/// Audio service error types.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("No default capture device available")]
    DeviceUnavailable,

    #[error("Device error during {op}: {detail}")]
    Device { op: &'static str, detail: String },

    #[error("COM initialization failed: {0}")]
    ComInitFailed(String),

    #[error("Level meter not available for device")]
    MeterNotAvailable,
}

impl AudioError {
    pub(crate) fn device(op: &'static str, err: impl std::fmt::Display) -> Self {
        AudioError::Device {
            op,
            detail: err.to_string(),
        }
    }

    pub(crate) fn not_bound(op: &'static str) -> Self {
        AudioError::Device {
            op,
            detail: "no microphone is bound".to_string(),
        }
    }
}
