//! Platform-agnostic types for ANT+ heart-rate sensors.
//!
//! This crate provides the value types shared by the connection core and by
//! anything that consumes its samples.
//!
//! # Features
//!
//! - [`HeartRateSample`], the decoded sample delivered to consumers
//! - [`DeviceKey`], the identity of a logical sensor channel
//! - USB identifiers for ANT radio sticks
//! - Error types for parsing keys from text
//!
//! # Example
//!
//! ```
//! use antpulse_types::{DeviceKey, HeartRateSample};
//!
//! let key = DeviceKey::new(12345, 1);
//! let sample = HeartRateSample::new(72, 1.0, 833);
//! assert_eq!(key.to_string(), "#12345/1");
//! assert_eq!(sample.bpm, 72);
//! ```

pub mod error;
pub mod types;
pub mod usb;

pub use error::{ParseError, ParseResult};
pub use types::{DeviceKey, HeartRateSample};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_key_equality_and_hash() {
        use std::collections::HashSet;

        let mut keys = HashSet::new();
        keys.insert(DeviceKey::new(1, 1));
        keys.insert(DeviceKey::new(1, 1));
        keys.insert(DeviceKey::new(1, 5));

        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_device_key_from_tuple() {
        let key: DeviceKey = (54321, 5).into();
        assert_eq!(key.device_number, 54321);
        assert_eq!(key.transmission_type, 5);
    }

    #[test]
    fn test_device_key_display_round_trip() {
        let key = DeviceKey::new(4242, 1);
        let parsed: DeviceKey = key.to_string().parse().unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn test_device_key_parse_errors() {
        assert!(matches!(
            "nope".parse::<DeviceKey>(),
            Err(ParseError::InvalidFormat(_))
        ));
        assert!(matches!(
            "70000/1".parse::<DeviceKey>(),
            Err(ParseError::InvalidValue {
                field: "device_number",
                ..
            })
        ));
        assert!(matches!(
            "1/300".parse::<DeviceKey>(),
            Err(ParseError::InvalidValue {
                field: "transmission_type",
                ..
            })
        ));
    }

    #[test]
    fn test_wildcard_key() {
        assert!(DeviceKey::new(0, 0).is_wildcard());
        assert!(DeviceKey::default().is_wildcard());
        assert!(!DeviceKey::new(1, 0).is_wildcard());
    }

    #[test]
    fn test_sample_rr_bpm() {
        let sample = HeartRateSample::new(60, 3.0, 1000);
        let rr_bpm = sample.rr_bpm().unwrap();
        assert!((rr_bpm - 60.0).abs() < f64::EPSILON);

        let no_rr = HeartRateSample::new(60, 3.0, 0);
        assert!(no_rr.rr_bpm().is_none());
    }

    #[test]
    fn test_sample_display() {
        let sample = HeartRateSample::new(72, 1.5, 833);
        assert_eq!(sample.to_string(), "72 bpm @ 1.500s (rr 833 ms)");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_sample_serializes() {
        let sample = HeartRateSample::new(90, 2.0, 900);
        let json = serde_json::to_string(&sample).unwrap();
        assert!(json.contains("\"bpm\":90"));
        assert!(json.contains("\"rr_interval_ms\":900"));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn device_key_parse_never_panics(s in ".*") {
            let _ = s.parse::<DeviceKey>();
        }

        #[test]
        fn device_key_display_parses_back(number in any::<u16>(), kind in any::<u8>()) {
            let key = DeviceKey::new(number, kind);
            prop_assert_eq!(key.to_string().parse::<DeviceKey>().unwrap(), key);
        }
    }
}
