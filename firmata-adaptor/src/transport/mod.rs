//! Byte-stream transports between the host and a board.
//!
//! A transport is any duplex async byte stream: a serial port in production,
//! an in-memory pipe in tests. It carries no protocol knowledge. The
//! [`TransportOpener`] strategy produces one from a port label when the
//! caller did not hand the adaptor a ready-made stream.

pub mod serial;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;

pub use serial::{SerialOpener, DEFAULT_BAUD_RATE};

/// Duplex byte stream to a board.
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> Transport for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// Owned, type-erased transport handed to a protocol client.
pub type BoxedTransport = Box<dyn Transport>;

/// Strategy for opening a transport given a port label.
pub trait TransportOpener: Send + Sync {
    fn open(&self, port: &str, baud_rate: u32) -> Result<BoxedTransport>;
}

impl<F> TransportOpener for F
where
    F: Fn(&str, u32) -> Result<BoxedTransport> + Send + Sync,
{
    fn open(&self, port: &str, baud_rate: u32) -> Result<BoxedTransport> {
        self(port, baud_rate)
    }
}
