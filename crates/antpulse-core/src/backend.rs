//! Trait abstractions for the ANT radio stack.
//!
//! The USB transport and the ANT+ decoder are external collaborators. This
//! module defines the small capability surface the connection manager needs
//! from them:
//!
//! - [`RadioDriver`] opens a [`Transport`] for a USB stick and creates a
//!   [`Session`] (the ANT node) bound to it.
//! - [`Session`] starts/stops the node and opens decoder channels.
//! - The decoder reports into a [`HeartRateCallback`] from its own delivery
//!   thread.
//!
//! [`MockDriver`](crate::mock::MockDriver) implements these traits for
//! tests; [`UnavailableDriver`] is used when no radio stack is linked in.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use antpulse_types::DeviceKey;

use crate::error::{SessionError, TransportError};

/// Parameters for opening the USB transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    /// USB product ID of the stick to open.
    pub product_id: u16,
    /// Ask the driver to log raw USB traffic.
    pub debug: bool,
}

impl TransportConfig {
    /// Create a transport config for a product ID with debugging off.
    pub fn new(product_id: u16) -> Self {
        Self {
            product_id,
            debug: false,
        }
    }
}

/// Receives decoded heart-rate events from the ANT+ decoder.
///
/// Implementations run on the decoder's delivery path and must neither
/// block nor panic: stalling here stalls decoding for every channel.
pub trait HeartRateCallback: Send + Sync {
    /// A sensor matching the channel's search parameters was found.
    fn device_found(&self, device_number: u16, transmission_type: u8);

    /// A heart-rate page was decoded.
    fn heartrate_data(&self, bpm: u8, event_time_s: f64, rr_interval_ms: u16);
}

/// Opaque ownership of the USB link to the radio stick.
///
/// Dropping the transport releases the USB device.
pub trait Transport: Send + Sync + fmt::Debug {
    /// Short description for logs (e.g. bus/address).
    fn describe(&self) -> String;
}

/// Opaque handle to a decoder's per-channel object.
///
/// Dropping it closes the decoder channel.
pub trait DecoderChannel: Send + Sync + fmt::Debug {
    /// The sensor this channel was opened for.
    fn key(&self) -> DeviceKey;
}

/// A protocol session (ANT node) bound to a transport.
#[async_trait]
pub trait Session: Send + Sync + fmt::Debug {
    /// Start the node.
    async fn start(&self) -> Result<(), SessionError>;

    /// Stop the node.
    async fn stop(&self) -> Result<(), SessionError>;

    /// Whether the node is running.
    fn is_running(&self) -> bool;

    /// Open a heart-rate decoder channel for `key`, reporting into `callback`.
    ///
    /// Assumed to be quick and bounded by the decoder library.
    fn open_heartrate_channel(
        &self,
        key: DeviceKey,
        callback: Arc<dyn HeartRateCallback>,
    ) -> Result<Box<dyn DecoderChannel>, SessionError>;
}

/// Entry point into a radio stack.
#[async_trait]
pub trait RadioDriver: Send + Sync {
    /// Open the USB transport described by `config`.
    async fn open_transport(
        &self,
        config: &TransportConfig,
    ) -> Result<Box<dyn Transport>, TransportError>;

    /// Construct a session on top of an open transport. The session is not
    /// started yet.
    async fn create_session(
        &self,
        transport: &dyn Transport,
    ) -> Result<Box<dyn Session>, SessionError>;
}

/// Driver used when no radio stack is available.
///
/// Every transport open fails with [`TransportError::NotFound`], which puts
/// the manager into its degraded "no hardware" state.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableDriver;

#[async_trait]
impl RadioDriver for UnavailableDriver {
    async fn open_transport(
        &self,
        config: &TransportConfig,
    ) -> Result<Box<dyn Transport>, TransportError> {
        Err(TransportError::NotFound {
            product_id: config.product_id,
        })
    }

    async fn create_session(
        &self,
        _transport: &dyn Transport,
    ) -> Result<Box<dyn Session>, SessionError> {
        Err(SessionError::StartFailed("no radio stack available".to_string()))
    }
}
