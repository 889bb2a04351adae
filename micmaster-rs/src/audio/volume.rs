//! Volume control using IAudioEndpointVolume.
//!
//! Provides volume and mute control for the bound capture endpoint.

use super::device::{AudioError, CaptureEndpoint};
use windows::Win32::Media::Audio::{Endpoints::IAudioEndpointVolume, IMMDevice};
use windows::Win32::System::Com::CLSCTX_ALL;

/// Volume controller for a specific device.
pub struct VolumeController {
    endpoint_volume: IAudioEndpointVolume,
    name: String,
}

impl VolumeController {
    /// Create a new VolumeController for the given device.
    pub fn new(device: &IMMDevice, name: String) -> Result<Self, AudioError> {
        unsafe {
            let endpoint_volume: IAudioEndpointVolume = device
                .Activate(CLSCTX_ALL, None)
                .map_err(|e| AudioError::device("activate endpoint volume", e))?;

            Ok(Self {
                endpoint_volume,
                name,
            })
        }
    }
}

impl CaptureEndpoint for VolumeController {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn get_mute(&self) -> Result<bool, AudioError> {
        unsafe {
            let muted = self
                .endpoint_volume
                .GetMute()
                .map_err(|e| AudioError::device("get mute", e))?;
            Ok(muted.as_bool())
        }
    }

    fn set_mute(&self, muted: bool) -> Result<(), AudioError> {
        unsafe {
            self.endpoint_volume
                .SetMute(muted, std::ptr::null())
                .map_err(|e| AudioError::device("set mute", e))?;
            Ok(())
        }
    }

    fn get_volume(&self) -> Result<f32, AudioError> {
        unsafe {
            let level = self
                .endpoint_volume
                .GetMasterVolumeLevelScalar()
                .map_err(|e| AudioError::device("get volume", e))?;
            Ok(level)
        }
    }

    fn set_volume(&self, level: f32) -> Result<(), AudioError> {
        let level = level.clamp(0.0, 1.0);
        unsafe {
            self.endpoint_volume
                .SetMasterVolumeLevelScalar(level, std::ptr::null())
                .map_err(|e| AudioError::device("set volume", e))?;
            Ok(())
        }
    }
}
