//! Sample delivery counters.
//!
//! Each [`SampleChannel`](crate::SampleChannel) keeps a [`ChannelCounters`]
//! that is updated lock-free on the producer and consumer paths. A
//! [`ChannelStats`] snapshot can be taken at any time.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time snapshot of a channel's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStats {
    /// Samples stored into the slot.
    pub accepted: u64,
    /// Samples discarded because the slot was occupied.
    pub dropped: u64,
    /// Samples handed to the consumer.
    pub delivered: u64,
}

impl ChannelStats {
    /// Total number of put attempts.
    pub fn offered(&self) -> u64 {
        self.accepted + self.dropped
    }

    /// Fraction of offered samples that were dropped (0.0 when nothing was offered).
    pub fn drop_rate(&self) -> f64 {
        let offered = self.offered();
        if offered == 0 {
            0.0
        } else {
            self.dropped as f64 / offered as f64
        }
    }
}

/// Thread-safe atomic counters behind [`ChannelStats`].
#[derive(Debug, Default)]
pub struct ChannelCounters {
    accepted: AtomicU64,
    dropped: AtomicU64,
    delivered: AtomicU64,
}

impl ChannelCounters {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful put.
    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dropped put. Returns the new dropped total.
    pub fn record_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record a sample handed to the consumer.
    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot.
    pub fn snapshot(&self) -> ChannelStats {
        ChannelStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_snapshot() {
        let counters = ChannelCounters::new();
        counters.record_accepted();
        counters.record_accepted();
        assert_eq!(counters.record_dropped(), 1);
        counters.record_delivered();

        let stats = counters.snapshot();
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.offered(), 3);
    }

    #[test]
    fn test_drop_rate() {
        assert_eq!(ChannelStats::default().drop_rate(), 0.0);

        let stats = ChannelStats {
            accepted: 1,
            dropped: 3,
            delivered: 1,
        };
        assert!((stats.drop_rate() - 0.75).abs() < f64::EPSILON);
    }
}
