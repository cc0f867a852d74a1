//! Connection management for ANT+ heart-rate sensors.
//!
//! This crate owns the lifecycle of an ANT USB stick and the ANT node running
//! on it, and turns decoded heart-rate events into per-sensor sample channels,
//! each read by a single consumer.
//!
//! # Features
//!
//! - **Graceful degradation**: a missing stick or a node that will not start
//!   leaves the manager in a failed state instead of crashing the host
//! - **One channel per sensor**: opening the same sensor twice returns the
//!   same device
//! - **Drop-on-full delivery**: each channel holds one sample; a slow
//!   consumer loses newer samples and the decoder never blocks
//! - **Simulation**: a random sample source for running without hardware
//! - **Lifecycle events**: subscribe to transport, node and device changes
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//! use antpulse_core::{Config, ConnectionManager, ConnectionState};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mode = std::env::var("ANTPULSE_MODE").unwrap_or_else(|_| "fake".into());
//!     let config = Config {
//!         mode: mode.parse().unwrap_or_default(),
//!         ..Default::default()
//!     };
//!
//!     let manager = ConnectionManager::new(config);
//!     if manager.start().await.is_failed() {
//!         eprintln!("no heart-rate hardware available");
//!         return;
//!     }
//!
//!     if let Some(device) = manager.open_heartrate_device(0, 0).await {
//!         if let Some(sample) = device.channel().recv_timeout(Duration::from_secs(2)).await {
//!             println!("{}", sample);
//!         }
//!     }
//!
//!     manager.stop().await;
//!     assert_eq!(manager.state().await, ConnectionState::Stopped);
//! }
//! ```

pub mod backend;
pub mod callback;
pub mod channel;
pub mod config;
pub mod device;
pub mod error;
pub mod events;
pub mod manager;
pub mod metrics;
pub mod mock;
pub mod registry;
pub mod simulator;

// Core exports
pub use backend::{
    DecoderChannel, HeartRateCallback, RadioDriver, Session, Transport, TransportConfig,
    UnavailableDriver,
};
pub use callback::HrmCallback;
pub use channel::SampleChannel;
pub use config::{Config, ConfigError, Mode, ValidationError};
pub use device::{DeviceSource, LogicalDevice, SharedDevice};
pub use error::{Error, Result, SessionError, TransportError};
pub use events::{EventDispatcher, EventReceiver, EventSender, ManagerEvent};
pub use manager::{ConnectionManager, ConnectionState};
pub use metrics::ChannelStats;
pub use mock::{MockDriver, MockLifecycle};
pub use registry::DeviceRegistry;
pub use simulator::{SampleGenerator, SimulatedSource, SimulatorHandle, SimulatorOptions};

// Re-export from antpulse-types
pub use antpulse_types::usb;
pub use antpulse_types::{DeviceKey, HeartRateSample, ParseError};
