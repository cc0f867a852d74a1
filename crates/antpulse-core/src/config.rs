//! Connection manager configuration.
//!
//! The only required choice is the [`Mode`]: a simulated sensor, or real
//! hardware on an ANT stick with a given USB product ID. Everything else has
//! defaults.
//!
//! ```toml
//! mode = { hardware = { product_id = 0x1009 } }
//! transport_debug = false
//! event_capacity = 64
//!
//! [simulator]
//! tick_ms = 1000
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use antpulse_types::usb;

use crate::backend::TransportConfig;
use crate::events::DEFAULT_EVENT_CAPACITY;
use crate::simulator::SimulatorOptions;

/// Where heart-rate samples come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Generate random samples; no hardware is touched.
    Simulated,
    /// Use an ANT stick with this USB product ID.
    Hardware {
        /// USB product ID of the stick.
        product_id: u16,
    },
}

impl Mode {
    /// Hardware mode on the given product ID.
    pub fn hardware(product_id: u16) -> Self {
        Self::Hardware { product_id }
    }

    /// Whether this is simulated mode.
    pub fn is_simulated(&self) -> bool {
        matches!(self, Self::Simulated)
    }

    /// The configured product ID, in hardware mode.
    pub fn product_id(&self) -> Option<u16> {
        match self {
            Self::Simulated => None,
            Self::Hardware { product_id } => Some(*product_id),
        }
    }
}

impl Default for Mode {
    fn default() -> Self {
        Self::hardware(usb::DEFAULT_PRODUCT_ID)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simulated => write!(f, "simulated"),
            Self::Hardware { product_id } => write!(f, "0x{:04x}", product_id),
        }
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    /// Parse a mode selector.
    ///
    /// Accepts `fake`, `sim` or `simulated` for simulated mode, and a USB
    /// product ID in hex (`0x1009`) or decimal (`4105`) for hardware mode.
    ///
    /// # Examples
    ///
    /// ```
    /// use antpulse_core::Mode;
    ///
    /// assert_eq!("fake".parse::<Mode>().unwrap(), Mode::Simulated);
    /// assert_eq!("0x1009".parse::<Mode>().unwrap(), Mode::hardware(0x1009));
    /// assert!("stick".parse::<Mode>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_lowercase();
        match value.as_str() {
            "fake" | "sim" | "simulated" => return Ok(Self::Simulated),
            _ => {}
        }

        let parsed = match value.strip_prefix("0x") {
            Some(hex) => u16::from_str_radix(hex, 16),
            None => value.parse::<u16>(),
        };

        parsed.map(Self::hardware).map_err(|_| {
            ConfigError::Validation(vec![ValidationError {
                field: "mode".to_string(),
                message: format!(
                    "invalid mode '{}': expected 'simulated' or a USB product id",
                    s
                ),
            }])
        })
    }
}

/// Connection manager configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sample source selector.
    pub mode: Mode,
    /// Ask the USB driver to log raw traffic.
    pub transport_debug: bool,
    /// Capacity of the lifecycle event channel.
    pub event_capacity: usize,
    /// Simulator settings, used in simulated mode.
    pub simulator: SimulatorOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            transport_debug: false,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            simulator: SimulatorOptions::default(),
        }
    }
}

impl Config {
    /// Configuration for simulated mode with default settings.
    pub fn simulated() -> Self {
        Self {
            mode: Mode::Simulated,
            ..Default::default()
        }
    }

    /// Configuration for hardware mode on `product_id`.
    pub fn hardware(product_id: u16) -> Self {
        Self {
            mode: Mode::hardware(product_id),
            ..Default::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::from("<string>"),
            source: e,
        })
    }

    /// Validate the configuration and return any errors.
    ///
    /// This checks:
    /// - The hardware product ID is non-zero
    /// - The event channel capacity is non-zero
    /// - Simulator tick and ranges are sane
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if let Mode::Hardware { product_id: 0 } = self.mode {
            errors.push(ValidationError {
                field: "mode.hardware.product_id".to_string(),
                message: "product id cannot be 0".to_string(),
            });
        }

        if self.event_capacity == 0 {
            errors.push(ValidationError {
                field: "event_capacity".to_string(),
                message: "event capacity must be > 0".to_string(),
            });
        }

        if let Err(e) = self.simulator.validate() {
            errors.push(ValidationError {
                field: "simulator".to_string(),
                message: e.to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Transport parameters, in hardware mode.
    pub fn transport_config(&self) -> Option<TransportConfig> {
        self.mode.product_id().map(|product_id| TransportConfig {
            product_id,
            debug: self.transport_debug,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field path (e.g., `simulator` or `event_capacity`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.mode, Mode::hardware(0x1009));
        assert!(config.validate().is_ok());
        assert_eq!(
            config.transport_config(),
            Some(TransportConfig {
                product_id: 0x1009,
                debug: false
            })
        );
    }

    #[test]
    fn test_simulated_has_no_transport() {
        let config = Config::simulated();
        assert!(config.mode.is_simulated());
        assert!(config.transport_config().is_none());
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("fake".parse::<Mode>().unwrap(), Mode::Simulated);
        assert_eq!("Simulated".parse::<Mode>().unwrap(), Mode::Simulated);
        assert_eq!("0x1008".parse::<Mode>().unwrap(), Mode::hardware(0x1008));
        assert_eq!("4105".parse::<Mode>().unwrap(), Mode::hardware(0x1009));
        assert!("0xZZZZ".parse::<Mode>().is_err());
        assert!("".parse::<Mode>().is_err());
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(Mode::Simulated.to_string(), "simulated");
        assert_eq!(Mode::hardware(0x1009).to_string(), "0x1009");
    }

    #[test]
    fn test_parse_simulated_toml() {
        let config = Config::from_toml_str(
            r#"
            mode = "simulated"

            [simulator]
            tick_ms = 250
            seed = 9
            "#,
        )
        .unwrap();

        assert_eq!(config.mode, Mode::Simulated);
        assert_eq!(config.simulator.tick_ms, 250);
        assert_eq!(config.simulator.seed, Some(9));
        assert_eq!(config.simulator.bpm_max, 180);
        assert_eq!(config.event_capacity, DEFAULT_EVENT_CAPACITY);
    }

    #[test]
    fn test_parse_hardware_toml() {
        let config = Config::from_toml_str(
            r#"
            mode = { hardware = { product_id = 0x1008 } }
            transport_debug = true
            "#,
        )
        .unwrap();

        assert_eq!(config.mode, Mode::hardware(0x1008));
        assert!(config.transport_config().unwrap().debug);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::hardware(0x1008);
        let text = toml::to_string(&config).unwrap();
        assert_eq!(Config::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_parse_error() {
        let err = Config::from_toml_str("mode = 12").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_validation_collects_errors() {
        let config = Config {
            mode: Mode::hardware(0),
            event_capacity: 0,
            simulator: SimulatorOptions {
                tick_ms: 0,
                ..Default::default()
            },
            ..Default::default()
        };

        match config.validate() {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors.len(), 3);
                assert_eq!(errors[0].field, "mode.hardware.product_id");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/nonexistent/antpulse.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("antpulse.toml"));
    }
}
