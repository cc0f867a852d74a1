//! Adapter from decoder callbacks to a sample channel.

use std::sync::Arc;

use tracing::{trace, warn};

use antpulse_types::{DeviceKey, HeartRateSample};

use crate::backend::HeartRateCallback;
use crate::channel::SampleChannel;
use crate::events::{EventDispatcher, ManagerEvent};

/// Forwards decoded heart-rate events into a [`SampleChannel`].
///
/// Runs on the decoder's delivery thread. Every method returns immediately:
/// a full channel means the sample is dropped and a warning is logged.
#[derive(Debug)]
pub struct HrmCallback {
    key: DeviceKey,
    channel: Arc<SampleChannel>,
    events: Option<EventDispatcher>,
}

impl HrmCallback {
    /// Create a callback feeding `channel`.
    pub fn new(key: DeviceKey, channel: Arc<SampleChannel>) -> Self {
        Self {
            key,
            channel,
            events: None,
        }
    }

    /// Also publish [`ManagerEvent::SampleDropped`] on `events` when a sample is dropped.
    pub fn with_events(mut self, events: EventDispatcher) -> Self {
        self.events = Some(events);
        self
    }

    /// The sensor this callback serves.
    pub fn key(&self) -> DeviceKey {
        self.key
    }

    /// The channel samples are delivered into.
    pub fn channel(&self) -> &Arc<SampleChannel> {
        &self.channel
    }
}

impl HeartRateCallback for HrmCallback {
    fn device_found(&self, device_number: u16, transmission_type: u8) {
        // Reserved for pairing confirmation.
        trace!(
            "Device found for {}: #{}/{}",
            self.key, device_number, transmission_type
        );
    }

    fn heartrate_data(&self, bpm: u8, event_time_s: f64, rr_interval_ms: u16) {
        let sample = HeartRateSample::new(bpm, event_time_s, rr_interval_ms);
        if !self.channel.try_put(sample) {
            warn!("Consumer not reading heart-rate samples for {}, dropping", self.key);
            if let Some(events) = &self.events {
                events.send(ManagerEvent::SampleDropped { key: self.key });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartrate_data_reaches_channel() {
        let channel = Arc::new(SampleChannel::new());
        let callback = HrmCallback::new(DeviceKey::new(1, 1), Arc::clone(&channel));

        callback.heartrate_data(75, 12.25, 800);

        let sample = channel.take().unwrap();
        assert_eq!(sample, HeartRateSample::new(75, 12.25, 800));
    }

    #[test]
    fn test_full_channel_drops_and_keeps_first() {
        let channel = Arc::new(SampleChannel::new());
        let callback = HrmCallback::new(DeviceKey::new(1, 1), Arc::clone(&channel));

        callback.heartrate_data(75, 1.0, 800);
        callback.heartrate_data(76, 2.0, 810);

        assert_eq!(channel.take().map(|s| s.bpm), Some(75));
        assert_eq!(channel.stats().dropped, 1);
    }

    #[test]
    fn test_device_found_is_noop() {
        let channel = Arc::new(SampleChannel::new());
        let callback = HrmCallback::new(DeviceKey::new(0, 0), Arc::clone(&channel));

        callback.device_found(4321, 1);

        assert!(channel.is_empty());
        assert_eq!(channel.stats().offered(), 0);
    }

    #[tokio::test]
    async fn test_drop_publishes_event() {
        let events = EventDispatcher::new(8);
        let mut rx = events.subscribe();
        let key = DeviceKey::new(9, 1);
        let callback =
            HrmCallback::new(key, Arc::new(SampleChannel::new())).with_events(events.clone());

        callback.heartrate_data(100, 1.0, 600);
        callback.heartrate_data(101, 2.0, 600);

        assert_eq!(rx.recv().await.unwrap(), ManagerEvent::SampleDropped { key });
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_usable_as_trait_object() {
        let channel = Arc::new(SampleChannel::new());
        let callback: Arc<dyn HeartRateCallback> =
            Arc::new(HrmCallback::new(DeviceKey::new(2, 1), Arc::clone(&channel)));

        callback.heartrate_data(64, 3.0, 950);
        assert!(!channel.is_empty());
    }
}
