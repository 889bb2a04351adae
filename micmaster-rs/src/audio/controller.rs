//! Mute/volume state machine for the default capture endpoint.

use super::device::{scalar_to_percent, AudioError, CaptureEndpoint, EndpointProvider, MuteState};
use super::notifications::{NotificationPolicy, Notifier};
use tracing::{debug, info, warn};

/// Owns the bound endpoint and the mirrored [`MuteState`].
///
/// Lives on the control thread. Until [`bind`](Self::bind) succeeds every
/// device operation fails with [`AudioError::Device`] and nothing is touched.
pub struct MuteController {
    endpoint: Option<Box<dyn CaptureEndpoint>>,
    state: MuteState,
    notifier: Box<dyn Notifier>,
    policy: NotificationPolicy,
}

impl MuteController {
    pub fn new(notifier: Box<dyn Notifier>) -> Self {
        Self {
            endpoint: None,
            state: MuteState::default(),
            notifier,
            policy: NotificationPolicy::default(),
        }
    }

    /// Acquire the default capture endpoint and mirror its state.
    pub fn bind(&mut self, provider: &dyn EndpointProvider) -> Result<(), AudioError> {
        let endpoint = provider.default_capture()?;
        let is_muted = endpoint.get_mute()?;
        let volume_scalar = endpoint.get_volume()?.clamp(0.0, 1.0);

        self.state = MuteState {
            is_muted,
            volume_scalar,
        };
        info!(
            device = %endpoint.name(),
            muted = is_muted,
            volume = scalar_to_percent(volume_scalar),
            "Microphone bound"
        );
        self.endpoint = Some(endpoint);
        Ok(())
    }

    pub fn is_bound(&self) -> bool {
        self.endpoint.is_some()
    }

    pub fn device_name(&self) -> Option<String> {
        self.endpoint.as_ref().map(|e| e.name())
    }

    pub fn state(&self) -> MuteState {
        self.state
    }

    pub fn is_muted(&self) -> bool {
        self.state.is_muted
    }

    pub fn set_notification_policy(&mut self, policy: NotificationPolicy) {
        self.policy = policy;
    }

    fn endpoint(&self, op: &'static str) -> Result<&dyn CaptureEndpoint, AudioError> {
        self.endpoint
            .as_deref()
            .ok_or_else(|| AudioError::not_bound(op))
    }

    /// Read the endpoint volume as a percentage.
    pub fn volume_percent(&mut self) -> Result<u8, AudioError> {
        let level = self.endpoint("get volume")?.get_volume()?;
        self.state.volume_scalar = level.clamp(0.0, 1.0);
        Ok(self.state.volume_percent())
    }

    /// Clamp `percent` to 0-100 and write it. Returns the value written.
    pub fn set_volume_percent(&mut self, percent: i32) -> Result<u8, AudioError> {
        let percent = percent.clamp(0, 100) as u8;
        let scalar = f32::from(percent) / 100.0;

        if let Err(e) = self.endpoint("set volume")?.set_volume(scalar) {
            warn!(error = %e, volume = percent, "Failed to set microphone volume");
            return Err(e);
        }
        self.state.volume_scalar = scalar;
        info!(volume = percent, "Microphone volume set");
        Ok(percent)
    }

    /// Flip the mute state. Returns the new state.
    pub fn toggle(&mut self) -> Result<bool, AudioError> {
        let target = !self.state.is_muted;
        self.apply_mute(target)?;
        Ok(target)
    }

    /// Drive the mute state to `target`. Returns whether anything changed.
    ///
    /// When the state already matches, neither the device nor the notifier
    /// is touched.
    pub fn set_mute(&mut self, target: bool) -> Result<bool, AudioError> {
        self.endpoint("set mute")?;
        if self.state.is_muted == target {
            debug!(muted = target, "Mute state unchanged");
            return Ok(false);
        }
        self.apply_mute(target)?;
        Ok(true)
    }

    fn apply_mute(&mut self, target: bool) -> Result<(), AudioError> {
        if let Err(e) = self.endpoint("set mute")?.set_mute(target) {
            warn!(error = %e, muted = target, "Failed to change microphone mute state");
            return Err(e);
        }
        self.state.is_muted = target;
        info!("Microphone {}", self.state.label().to_lowercase());

        if let Some(channel) = self.policy.channel() {
            self.notifier.notify(channel, target);
        }
        Ok(())
    }
}
