//! Audio capture and level metering.
//!
//! Provides input level sampling on a background thread. Levels are posted
//! to the control thread as [`AppEvent::AudioLevel`] and never touch the
//! device state.

use super::device::AudioError;
use crate::events::{AppEvent, EventSender};
use crate::worker::Worker;
use std::sync::atomic::Ordering;
use tracing::{error, info};

/// A blocking source of input levels (0-100).
pub trait LevelSource {
    /// Wait for the next sample and return it.
    fn read_level(&mut self) -> Result<u8, AudioError>;
}

/// Background thread forwarding input levels to the control thread.
pub struct LevelSampler {
    worker: Worker,
}

impl LevelSampler {
    /// Start sampling.
    ///
    /// `open` runs on the sampling thread so that thread-affine device
    /// handles are created where they are used.
    pub fn spawn<F>(open: F, sink: EventSender) -> Result<Self, AudioError>
    where
        F: FnOnce() -> Result<Box<dyn LevelSource>, AudioError> + Send + 'static,
    {
        let worker = Worker::spawn("level-sampler", move |running| {
            let mut source = match open() {
                Ok(source) => source,
                Err(e) => {
                    error!(error = %e, "Failed to open level meter");
                    return;
                }
            };
            info!("Level sampling started");

            while running.load(Ordering::SeqCst) {
                match source.read_level() {
                    Ok(level) => {
                        if sink.send(AppEvent::AudioLevel(level)).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Error reading audio level");
                        break;
                    }
                }
            }
        })
        .map_err(|e| AudioError::device("spawn level sampler", e))?;

        Ok(Self { worker })
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    /// Stop sampling and join the thread.
    pub fn stop(&mut self) {
        self.worker.stop();
    }
}

#[cfg(windows)]
pub use self::meter::{DefaultMeter, LevelMeter};

#[cfg(windows)]
mod meter {
    use super::LevelSource;
    use crate::audio::device::{scalar_to_percent, AudioError};
    use crate::audio::enumerator::{ComGuard, DeviceEnumerator};
    use std::time::Duration;
    use windows::Win32::Media::Audio::{Endpoints::IAudioMeterInformation, IMMDevice};
    use windows::Win32::System::Com::CLSCTX_ALL;

    const SAMPLE_INTERVAL: Duration = Duration::from_millis(50);

    /// Level meter for a specific device.
    pub struct LevelMeter {
        meter_info: IAudioMeterInformation,
    }

    impl LevelMeter {
        /// Create a new LevelMeter for the given device.
        pub fn new(device: &IMMDevice) -> Result<Self, AudioError> {
            unsafe {
                let meter_info: IAudioMeterInformation = device
                    .Activate(CLSCTX_ALL, None)
                    .map_err(|_| AudioError::MeterNotAvailable)?;

                Ok(Self { meter_info })
            }
        }

        /// Get the current peak level (0.0 to 1.0).
        pub fn get_peak_level(&self) -> Result<f32, AudioError> {
            unsafe {
                self.meter_info
                    .GetPeakValue()
                    .map_err(|e| AudioError::device("get peak value", e))
            }
        }
    }

    impl LevelSource for LevelMeter {
        fn read_level(&mut self) -> Result<u8, AudioError> {
            std::thread::sleep(SAMPLE_INTERVAL);
            Ok(scalar_to_percent(self.get_peak_level()?))
        }
    }

    /// Meter on the default microphone for the sampling thread. Holds that
    /// thread's COM initialization; the meter is released first.
    pub struct DefaultMeter {
        meter: LevelMeter,
        _com: ComGuard,
    }

    impl DefaultMeter {
        pub fn open() -> Result<Self, AudioError> {
            let com = ComGuard::new()?;
            let meter = DeviceEnumerator::new()?.default_meter()?;
            Ok(Self { meter, _com: com })
        }
    }

    impl LevelSource for DefaultMeter {
        fn read_level(&mut self) -> Result<u8, AudioError> {
            self.meter.read_level()
        }
    }
}
