//! Error types for antpulse-core.
//!
//! Errors are split by the stage that produced them so that a degraded
//! manager can report exactly where the hardware path broke.
//!
//! # Propagation
//!
//! | Error | Raised by | Resulting manager state |
//! |-------|-----------|-------------------------|
//! | [`TransportError`] | opening the USB stick | `TransportFailed` |
//! | [`SessionError::StartFailed`] | creating or starting the ANT node | `SessionFailed` |
//! | [`SessionError::ChannelOpen`] | opening a decoder channel | unchanged, open returns `None` |
//! | [`SessionError::StopFailed`] | stopping the ANT node | `Stopped` (logged only) |
//!
//! None of these cross the consumer-facing API of
//! [`ConnectionManager`](crate::ConnectionManager) as an `Err`: they are
//! logged, recorded as [`last_error`](crate::ConnectionManager::last_error)
//! and turned into "no device available".
//!
//! A consumer that does not drain its channel fast enough is not an error
//! at all. It shows up as a `false` return from
//! [`SampleChannel::try_put`](crate::SampleChannel::try_put), a dropped-sample
//! counter and a warning.

use thiserror::Error;

use antpulse_types::DeviceKey;

/// Errors raised while acquiring the USB transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// No stick with the configured product ID is attached.
    #[error("no ANT stick with product id 0x{product_id:04X} found")]
    NotFound {
        /// The USB product ID that was requested.
        product_id: u16,
    },

    /// The stick is present but could not be claimed.
    #[error("access to ANT stick 0x{product_id:04X} denied")]
    AccessDenied {
        /// The USB product ID that was requested.
        product_id: u16,
    },

    /// Low-level USB I/O failure.
    #[error("USB I/O error: {0}")]
    Io(String),
}

/// Errors raised by the protocol session (the ANT node) or its channels.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// The node could not be created or started.
    #[error("failed to start node: {0}")]
    StartFailed(String),

    /// A decoder channel could not be opened for a sensor.
    #[error("failed to open channel for device {key}: {reason}")]
    ChannelOpen {
        /// The sensor the channel was requested for.
        key: DeviceKey,
        /// Decoder-provided reason.
        reason: String,
    },

    /// An operation required a running node.
    #[error("node not running")]
    NotRunning,

    /// The node reported an error while stopping.
    #[error("failed to stop node: {0}")]
    StopFailed(String),
}

/// Errors that can occur in antpulse-core.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// USB transport could not be acquired.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Protocol session or channel failure.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Operation was cancelled.
    #[error("Operation cancelled")]
    Cancelled,

    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create a channel-open failure for a sensor.
    pub fn channel_open(key: DeviceKey, reason: impl Into<String>) -> Self {
        Self::Session(SessionError::ChannelOpen {
            key,
            reason: reason.into(),
        })
    }

    /// Whether this error came from the hardware path (transport or session).
    pub fn is_hardware(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Session(_))
    }
}

/// Result type alias using antpulse-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
