//! Logical heart-rate devices.
//!
//! A [`LogicalDevice`] is what callers get back from
//! [`ConnectionManager::open_heartrate_device`](crate::ConnectionManager::open_heartrate_device):
//! a readable [`SampleChannel`] plus whatever keeps it fed, either a decoder
//! channel on real hardware or a simulated source.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use antpulse_types::DeviceKey;

use crate::backend::DecoderChannel;
use crate::callback::HrmCallback;
use crate::channel::SampleChannel;
use crate::simulator::SimulatorHandle;

/// What produces samples for a logical device.
#[derive(Debug)]
pub enum DeviceSource {
    /// A decoder channel on a running ANT node.
    Hardware {
        /// Callback the decoder reports into.
        callback: Arc<HrmCallback>,
        /// The decoder's per-channel object. Taken and dropped on close.
        decoder_channel: Mutex<Option<Box<dyn DecoderChannel>>>,
    },
    /// A background simulator task.
    Simulated(SimulatorHandle),
}

/// An opened heart-rate sensor.
#[derive(Debug)]
pub struct LogicalDevice {
    key: DeviceKey,
    channel: Arc<SampleChannel>,
    source: DeviceSource,
}

/// Type alias for a shared logical device.
///
/// The registry and every caller that opened the same key hold clones of one
/// `Arc`; the registry's copy is authoritative.
pub type SharedDevice = Arc<LogicalDevice>;

impl LogicalDevice {
    /// Create a hardware-backed device.
    pub fn hardware(
        key: DeviceKey,
        channel: Arc<SampleChannel>,
        callback: Arc<HrmCallback>,
        decoder_channel: Box<dyn DecoderChannel>,
    ) -> Self {
        Self {
            key,
            channel,
            source: DeviceSource::Hardware {
                callback,
                decoder_channel: Mutex::new(Some(decoder_channel)),
            },
        }
    }

    /// Create a simulator-backed device.
    pub fn simulated(key: DeviceKey, channel: Arc<SampleChannel>, handle: SimulatorHandle) -> Self {
        Self {
            key,
            channel,
            source: DeviceSource::Simulated(handle),
        }
    }

    /// The key this device was opened with.
    pub fn key(&self) -> DeviceKey {
        self.key
    }

    /// The channel to read samples from.
    pub fn channel(&self) -> &SampleChannel {
        &self.channel
    }

    /// A shared handle to the channel, for handing to another task.
    pub fn channel_arc(&self) -> Arc<SampleChannel> {
        Arc::clone(&self.channel)
    }

    /// What produces samples for this device.
    pub fn source(&self) -> &DeviceSource {
        &self.source
    }

    /// Whether samples come from a simulator.
    pub fn is_simulated(&self) -> bool {
        matches!(self.source, DeviceSource::Simulated(_))
    }

    /// Whether the device can still produce samples.
    pub fn is_open(&self) -> bool {
        match &self.source {
            DeviceSource::Hardware {
                decoder_channel, ..
            } => decoder_channel
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_some(),
            DeviceSource::Simulated(handle) => !handle.is_cancelled(),
        }
    }

    /// Stop feeding this device.
    ///
    /// Closes the decoder channel or cancels the simulator. Samples already
    /// in the channel stay readable. Returns `false` if it was already closed.
    pub fn close(&self) -> bool {
        match &self.source {
            DeviceSource::Hardware {
                decoder_channel, ..
            } => {
                let taken = decoder_channel
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                match taken {
                    Some(decoder_channel) => {
                        debug!("Closing decoder channel for {}", self.key);
                        drop(decoder_channel);
                        true
                    }
                    None => false,
                }
            }
            DeviceSource::Simulated(handle) => {
                let was_open = !handle.is_cancelled();
                handle.stop();
                was_open
            }
        }
    }

    /// The simulator handle, for simulator-backed devices.
    pub fn simulator(&self) -> Option<&SimulatorHandle> {
        match &self.source {
            DeviceSource::Simulated(handle) => Some(handle),
            DeviceSource::Hardware { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::simulator::{SimulatedSource, SimulatorOptions};

    #[derive(Debug)]
    struct FixedChannel(DeviceKey);

    impl DecoderChannel for FixedChannel {
        fn key(&self) -> DeviceKey {
            self.0
        }
    }

    #[test]
    fn test_close_hardware_device() {
        let key = DeviceKey::new(9, 1);
        let channel = Arc::new(SampleChannel::new());
        let callback = Arc::new(HrmCallback::new(key, Arc::clone(&channel)));
        let device =
            LogicalDevice::hardware(key, channel, callback, Box::new(FixedChannel(key)));

        assert!(device.is_open());
        assert!(device.close());
        assert!(!device.is_open());
        assert!(!device.close());
    }

    #[tokio::test]
    async fn test_close_simulated_device() {
        let key = DeviceKey::new(0, 0);
        let channel = Arc::new(SampleChannel::new());
        let handle = SimulatedSource::spawn(
            Arc::clone(&channel),
            CancellationToken::new(),
            SimulatorOptions::default(),
        );
        let device = LogicalDevice::simulated(key, channel, handle);

        assert!(device.close());
        assert!(device.simulator().unwrap().is_cancelled());
        assert!(!device.is_open());
    }
}
