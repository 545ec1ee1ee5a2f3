//! Adaptor for microcontroller boards speaking Firmata over a byte stream.
//!
//! [`FirmataAdaptor`] offers mode-safe digital/analog reads and writes, PWM,
//! servo and I2C on top of a [`ProtocolClient`], which owns the wire format
//! and the board's pin table. The adaptor never parses protocol bytes itself.

pub mod adaptor;
pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod hw_trait;
pub mod pin;
pub mod tracing;
pub mod transport;

pub use adaptor::FirmataAdaptor;
pub use client::ProtocolClient;
pub use config::AdaptorConfig;
pub use error::{Error, Result};
