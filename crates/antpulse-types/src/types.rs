//! Core types for ANT+ heart-rate data.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Identity of a logical sensor channel.
///
/// An ANT+ sensor is addressed by its 16-bit device number together with
/// its transmission type. Two open requests with equal keys refer to the same
/// physical sensor. A device number of `0` acts as a wildcard during pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceKey {
    /// ANT device number.
    pub device_number: u16,
    /// ANT transmission type.
    pub transmission_type: u8,
}

impl DeviceKey {
    /// Create a new device key.
    #[must_use]
    pub const fn new(device_number: u16, transmission_type: u8) -> Self {
        Self {
            device_number,
            transmission_type,
        }
    }

    /// Whether this key matches any sensor (pairing wildcard).
    #[must_use]
    pub const fn is_wildcard(&self) -> bool {
        self.device_number == 0
    }
}

impl From<(u16, u8)> for DeviceKey {
    fn from((device_number, transmission_type): (u16, u8)) -> Self {
        Self::new(device_number, transmission_type)
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}/{}", self.device_number, self.transmission_type)
    }
}

impl FromStr for DeviceKey {
    type Err = ParseError;

    /// Parse a key written as `number/type`, with an optional leading `#`.
    ///
    /// # Examples
    ///
    /// ```
    /// use antpulse_types::DeviceKey;
    ///
    /// let key: DeviceKey = "#12345/1".parse().unwrap();
    /// assert_eq!(key, DeviceKey::new(12345, 1));
    /// assert!("12345".parse::<DeviceKey>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed.strip_prefix('#').unwrap_or(trimmed);
        let (number, kind) = body
            .split_once('/')
            .ok_or_else(|| ParseError::InvalidFormat(format!("expected number/type, got '{s}'")))?;

        let device_number = number
            .trim()
            .parse::<u16>()
            .map_err(|_| ParseError::InvalidValue {
                field: "device_number",
                value: number.to_string(),
            })?;
        let transmission_type = kind
            .trim()
            .parse::<u8>()
            .map_err(|_| ParseError::InvalidValue {
                field: "transmission_type",
                value: kind.to_string(),
            })?;

        Ok(Self::new(device_number, transmission_type))
    }
}

/// A decoded heart-rate sample.
///
/// Samples are produced either by the ANT+ decoder or by the simulator and
/// consumed exactly once through a sample channel.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HeartRateSample {
    /// Computed heart rate in beats per minute.
    pub bpm: u8,
    /// Sensor event time in seconds. Monotonic per sensor, may wrap on
    /// real hardware.
    pub event_time_s: f64,
    /// Interval between the last two beats, in milliseconds.
    pub rr_interval_ms: u16,
}

impl HeartRateSample {
    /// Create a new sample.
    #[must_use]
    pub const fn new(bpm: u8, event_time_s: f64, rr_interval_ms: u16) -> Self {
        Self {
            bpm,
            event_time_s,
            rr_interval_ms,
        }
    }

    /// Instantaneous heart rate derived from the RR interval, if non-zero.
    #[must_use]
    pub fn rr_bpm(&self) -> Option<f64> {
        if self.rr_interval_ms == 0 {
            None
        } else {
            Some(60_000.0 / f64::from(self.rr_interval_ms))
        }
    }
}

impl fmt::Display for HeartRateSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bpm @ {:.3}s (rr {} ms)",
            self.bpm, self.event_time_s, self.rr_interval_ms
        )
    }
}
