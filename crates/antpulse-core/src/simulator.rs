//! Synthetic heart-rate source.
//!
//! [`SimulatedSource`] stands in for a real sensor when no hardware is
//! configured. It runs as a background task that produces one random sample
//! per tick and offers it to a [`SampleChannel`], ignoring drops exactly like
//! a real sensor would.
//!
//! The task supports graceful shutdown through a cancellation token, checked
//! at every tick boundary.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use antpulse_core::{SampleChannel, SimulatedSource, SimulatorOptions};
//! use tokio_util::sync::CancellationToken;
//!
//! let channel = Arc::new(SampleChannel::new());
//! let handle = SimulatedSource::spawn(
//!     Arc::clone(&channel),
//!     CancellationToken::new(),
//!     SimulatorOptions::default(),
//! );
//!
//! let sample = channel.recv().await;
//! handle.stop();
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use antpulse_types::HeartRateSample;

use crate::channel::SampleChannel;
use crate::error::{Error, Result};

/// Options for the simulated source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorOptions {
    /// Time between samples, in milliseconds. Default: 1000.
    pub tick_ms: u64,
    /// Lowest generated heart rate. Default: 60.
    pub bpm_min: u8,
    /// Highest generated heart rate. Default: 180.
    pub bpm_max: u8,
    /// Shortest generated RR interval. Default: 800.
    pub rr_min_ms: u16,
    /// Longest generated RR interval. Default: 1100.
    pub rr_max_ms: u16,
    /// Fixed RNG seed for reproducible streams.
    pub seed: Option<u64>,
}

impl Default for SimulatorOptions {
    fn default() -> Self {
        Self {
            tick_ms: 1000,
            bpm_min: 60,
            bpm_max: 180,
            rr_min_ms: 800,
            rr_max_ms: 1100,
            seed: None,
        }
    }
}

impl SimulatorOptions {
    /// Interval between samples.
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Use a fixed tick.
    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick_ms = tick.as_millis() as u64;
        self
    }

    /// Use a fixed RNG seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate the options and return an error if invalid.
    ///
    /// Checks that:
    /// - `tick_ms` is > 0
    /// - `bpm_min` <= `bpm_max`
    /// - `rr_min_ms` <= `rr_max_ms`
    pub fn validate(&self) -> Result<()> {
        if self.tick_ms == 0 {
            return Err(Error::invalid_config("simulator.tick_ms must be > 0"));
        }
        if self.bpm_min > self.bpm_max {
            return Err(Error::invalid_config(format!(
                "simulator.bpm_min ({}) exceeds bpm_max ({})",
                self.bpm_min, self.bpm_max
            )));
        }
        if self.rr_min_ms > self.rr_max_ms {
            return Err(Error::invalid_config(format!(
                "simulator.rr_min_ms ({}) exceeds rr_max_ms ({})",
                self.rr_min_ms, self.rr_max_ms
            )));
        }
        Ok(())
    }
}

/// Produces the sample for each simulated tick.
///
/// `event_time_s` starts at zero and advances by 1.0 before every sample,
/// so the first sample carries 1.0. Inverted ranges are reordered.
#[derive(Debug)]
pub struct SampleGenerator {
    rng: StdRng,
    event_time_s: f64,
    bpm: (u8, u8),
    rr: (u16, u16),
}

impl SampleGenerator {
    /// Create a generator for `options`.
    pub fn new(options: &SimulatorOptions) -> Self {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng,
            event_time_s: 0.0,
            bpm: ordered(options.bpm_min, options.bpm_max),
            rr: ordered(options.rr_min_ms, options.rr_max_ms),
        }
    }

    /// Generate the next sample.
    pub fn next_sample(&mut self) -> HeartRateSample {
        let bpm = self.rng.random_range(self.bpm.0..=self.bpm.1);
        let rr_interval_ms = self.rng.random_range(self.rr.0..=self.rr.1);
        self.event_time_s += 1.0;
        HeartRateSample::new(bpm, self.event_time_s, rr_interval_ms)
    }
}

// `random_range` panics on an empty range.
fn ordered<T: Ord>(a: T, b: T) -> (T, T) {
    if a <= b { (a, b) } else { (b, a) }
}

impl Iterator for SampleGenerator {
    type Item = HeartRateSample;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_sample())
    }
}

/// Spawns simulated heart-rate producers.
pub struct SimulatedSource;

impl SimulatedSource {
    /// Spawn a producer feeding `channel` until `cancel` fires.
    ///
    /// The first sample is offered one full tick after spawning. A zero tick
    /// is clamped to one millisecond. Must be called from within a tokio
    /// runtime.
    pub fn spawn(
        channel: Arc<SampleChannel>,
        cancel: CancellationToken,
        options: SimulatorOptions,
    ) -> SimulatorHandle {
        let ticks = Arc::new(AtomicU64::new(0));
        let task_ticks = Arc::clone(&ticks);
        let task_token = cancel.clone();
        // tokio intervals panic on a zero period.
        let period = options.tick().max(Duration::from_millis(1));
        let mut generator = SampleGenerator::new(&options);

        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = task_token.cancelled() => {
                        debug!("Simulated source cancelled, stopping gracefully");
                        break;
                    }
                    _ = interval.tick() => {
                        let sample = generator.next_sample();
                        task_ticks.fetch_add(1, Ordering::Relaxed);
                        if !channel.try_put(sample) {
                            trace!("Simulated sample dropped, consumer is behind");
                        }
                    }
                }
            }
        });

        SimulatorHandle {
            handle,
            cancel_token: cancel,
            ticks,
        }
    }
}

/// Handle to a running simulated source.
#[derive(Debug)]
pub struct SimulatorHandle {
    handle: tokio::task::JoinHandle<()>,
    cancel_token: CancellationToken,
    ticks: Arc<AtomicU64>,
}

impl SimulatorHandle {
    /// Signal the producer to stop at its next tick boundary.
    pub fn stop(&self) {
        self.cancel_token.cancel();
    }

    /// Get the token controlling this producer.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Check if the background task is still running.
    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Check if the producer has been asked to stop.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Number of samples generated so far, dropped ones included.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }
}

impl Drop for SimulatorHandle {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_valid() {
        let options = SimulatorOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.tick(), Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_options() {
        let options = SimulatorOptions {
            tick_ms: 0,
            ..Default::default()
        };
        assert!(options.validate().is_err());

        let options = SimulatorOptions {
            bpm_min: 200,
            bpm_max: 100,
            ..Default::default()
        };
        assert!(matches!(options.validate(), Err(Error::InvalidConfig(_))));

        let options = SimulatorOptions {
            rr_min_ms: 1200,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_generator_first_sample_time() {
        let mut generator = SampleGenerator::new(&SimulatorOptions::default().with_seed(1));
        assert_eq!(generator.next_sample().event_time_s, 1.0);
        assert_eq!(generator.next_sample().event_time_s, 2.0);
    }

    #[test]
    fn test_seeded_generators_agree() {
        let options = SimulatorOptions::default().with_seed(42);
        let a: Vec<_> = SampleGenerator::new(&options).take(20).collect();
        let b: Vec<_> = SampleGenerator::new(&options).take(20).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_degenerate_range() {
        let options = SimulatorOptions {
            bpm_min: 100,
            bpm_max: 100,
            rr_min_ms: 600,
            rr_max_ms: 600,
            ..Default::default()
        };
        let sample = SampleGenerator::new(&options).next_sample();
        assert_eq!(sample.bpm, 100);
        assert_eq!(sample.rr_interval_ms, 600);
    }

    #[test]
    fn test_inverted_ranges_are_reordered() {
        let options = SimulatorOptions {
            bpm_min: 180,
            bpm_max: 60,
            rr_min_ms: 1100,
            rr_max_ms: 800,
            ..Default::default()
        };
        assert!(options.validate().is_err());

        for sample in SampleGenerator::new(&options).take(50) {
            assert!((60..=180).contains(&sample.bpm));
            assert!((800..=1100).contains(&sample.rr_interval_ms));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_sample_after_one_tick() {
        let channel = Arc::new(SampleChannel::new());
        let handle = SimulatedSource::spawn(
            Arc::clone(&channel),
            CancellationToken::new(),
            SimulatorOptions::default(),
        );

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert!(channel.take().is_none());

        let sample = channel.recv_timeout(Duration::from_secs(1)).await.unwrap();
        assert!((60..=180).contains(&sample.bpm));
        assert_eq!(sample.event_time_s, 1.0);
        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_undrained_channel_keeps_first_sample() {
        let channel = Arc::new(SampleChannel::new());
        let handle = SimulatedSource::spawn(
            Arc::clone(&channel),
            CancellationToken::new(),
            SimulatorOptions::default().with_seed(7),
        );

        tokio::time::sleep(Duration::from_millis(5_500)).await;

        assert_eq!(handle.ticks(), 5);
        let sample = channel.take().unwrap();
        assert_eq!(sample.event_time_s, 1.0);
        assert_eq!(channel.stats().dropped, 4);
        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_task() {
        let channel = Arc::new(SampleChannel::new());
        let token = CancellationToken::new();
        let handle = SimulatedSource::spawn(
            Arc::clone(&channel),
            token.child_token(),
            SimulatorOptions::default(),
        );
        assert!(handle.is_active());

        token.cancel();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(handle.is_cancelled());
        assert!(!handle.is_active());
        assert_eq!(handle.ticks(), 0);
    }
}
