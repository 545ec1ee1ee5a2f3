//! Common error types for firmata-adaptor.
//!
//! This module provides a centralized Error enum using thiserror,
//! with conversions from underlying error types used throughout the crate.

use std::time::Duration;

use thiserror::Error;

/// Main error type for adaptor operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Pin label is not a non-negative base-10 integer
    #[error("Invalid pin label: {label:?}")]
    InvalidPin { label: String },

    /// Pin index is not present in the board's pin table
    #[error("Pin {pin} out of range (board reports {count} pins)")]
    PinOutOfRange { pin: usize, count: usize },

    /// The transport opener could not establish a byte stream
    #[error("Failed to open transport on {port:?}: {source}")]
    TransportOpen {
        port: String,
        #[source]
        source: Box<Error>,
    },

    /// A caller-supplied transport was not handed back by the client, and
    /// the port label cannot be opened in its place
    #[error("Supplied transport for {port:?} is no longer available")]
    TransportUnavailable { port: String },

    /// I/O errors from tokio or std
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors
    #[error("Serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// Failures reported by the protocol client
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// No I2C reply arrived within the configured wait
    #[error("No I2C reply within {0:?}")]
    I2cReplyTimeout(Duration),

    /// The I2C reply subscription was discarded before a reply arrived
    #[error("I2C reply subscription dropped before a reply arrived")]
    I2cReplyDropped,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience type alias for Results using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
