//! Single-slot, drop-on-full sample delivery.
//!
//! A [`SampleChannel`] carries decoded samples from a producer (the ANT
//! decoder's delivery path or a simulator task) to one consumer. It holds at
//! most one pending sample. A put while the slot is occupied never blocks and
//! never evicts the pending sample: the new sample is discarded instead, so
//! the consumer always sees the oldest undelivered sample first.
//!
//! The channel is backed by a `tokio::sync::mpsc` channel of capacity one,
//! whose `try_send` gives the required non-blocking put.
//!
//! # Example
//!
//! ```
//! use antpulse_core::SampleChannel;
//! use antpulse_types::HeartRateSample;
//!
//! let channel = SampleChannel::new();
//! assert!(channel.try_put(HeartRateSample::new(70, 1.0, 850)));
//! assert!(!channel.try_put(HeartRateSample::new(71, 2.0, 845)));
//!
//! let sample = channel.take().unwrap();
//! assert_eq!(sample.bpm, 70);
//! assert!(channel.take().is_none());
//! ```

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tracing::{debug, trace};

use antpulse_types::HeartRateSample;

use crate::metrics::{ChannelCounters, ChannelStats};

/// Number of samples a channel can hold.
pub const CHANNEL_CAPACITY: usize = 1;

/// A capacity-one sample queue with drop-on-full semantics.
pub struct SampleChannel {
    sender: mpsc::Sender<HeartRateSample>,
    receiver: Mutex<mpsc::Receiver<HeartRateSample>>,
    counters: ChannelCounters,
}

impl std::fmt::Debug for SampleChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleChannel")
            .field("pending", &!self.is_empty())
            .field("stats", &self.stats())
            .finish()
    }
}

impl SampleChannel {
    /// Create an empty channel.
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            receiver: Mutex::new(receiver),
            counters: ChannelCounters::new(),
        }
    }

    /// Store `sample` if the slot is empty.
    ///
    /// Returns `false` and discards `sample` if a sample is already pending.
    /// Never blocks, so it is safe to call from a decoder delivery thread.
    pub fn try_put(&self, sample: HeartRateSample) -> bool {
        match self.sender.try_send(sample) {
            Ok(()) => {
                self.counters.record_accepted();
                trace!("Stored sample: {}", sample);
                true
            }
            Err(TrySendError::Full(dropped)) => {
                let total = self.counters.record_dropped();
                debug!("Slot occupied, dropped sample {} ({} dropped so far)", dropped, total);
                false
            }
            // The receiver lives as long as the channel, so this is unreachable
            // in practice; treat it like a drop.
            Err(TrySendError::Closed(_)) => {
                self.counters.record_dropped();
                false
            }
        }
    }

    /// Remove the pending sample without waiting.
    ///
    /// Returns `None` if nothing is pending, or if another task is currently
    /// waiting in [`recv`](Self::recv).
    pub fn take(&self) -> Option<HeartRateSample> {
        let mut receiver = self.receiver.try_lock().ok()?;
        match receiver.try_recv() {
            Ok(sample) => {
                self.counters.record_delivered();
                Some(sample)
            }
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Wait until a sample is pending and remove it.
    ///
    /// The channel owns its own sender, so this only returns `None` if the
    /// channel is being torn down.
    pub async fn recv(&self) -> Option<HeartRateSample> {
        let sample = self.receiver.lock().await.recv().await;
        if sample.is_some() {
            self.counters.record_delivered();
        }
        sample
    }

    /// Wait up to `timeout` for a sample.
    pub async fn recv_timeout(&self, timeout: Duration) -> Option<HeartRateSample> {
        tokio::time::timeout(timeout, self.recv()).await.ok().flatten()
    }

    /// Whether no sample is pending.
    pub fn is_empty(&self) -> bool {
        self.sender.capacity() == CHANNEL_CAPACITY
    }

    /// Number of samples the channel can hold (always one).
    pub fn capacity(&self) -> usize {
        CHANNEL_CAPACITY
    }

    /// Snapshot of the accepted/dropped/delivered counters.
    pub fn stats(&self) -> ChannelStats {
        self.counters.snapshot()
    }
}

impl Default for SampleChannel {
    fn default() -> Self {
        Self::new()
    }
}
