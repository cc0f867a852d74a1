//! Error types for value parsing in antpulse-types.

use thiserror::Error;

/// Errors that can occur when parsing antpulse values from text.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The input did not have the expected shape.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// A numeric component was out of range or not a number.
    #[error("Invalid value for {field}: {value}")]
    InvalidValue {
        /// Name of the component that failed to parse.
        field: &'static str,
        /// The offending input.
        value: String,
    },
}

/// Result type alias using antpulse-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
