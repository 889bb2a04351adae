//! Audio module for the default microphone.
//!
//! This module provides the mute/volume controller, level sampling and
//! mute-change notifications. Windows Core Audio backends live behind the
//! [`EndpointProvider`] and [`LevelSource`] seams.

pub mod capture;
pub mod controller;
pub mod device;
pub mod notifications;

#[cfg(windows)]
pub mod enumerator;
#[cfg(windows)]
pub mod volume;

pub use capture::{LevelSampler, LevelSource};
pub use controller::MuteController;
pub use device::{AudioError, CaptureEndpoint, EndpointProvider, MuteState, NoAudioBackend};
pub use notifications::{
    NotificationChannel, NotificationMode, NotificationPolicy, Notifier, SystemNotifier,
};

#[cfg(windows)]
pub use capture::DefaultMeter;
#[cfg(windows)]
pub use enumerator::{ComGuard, DeviceEnumerator};
