//! Serial-port transport.

use tokio_serial::SerialPortBuilderExt;

use super::{BoxedTransport, TransportOpener};
use crate::error::Result;
use crate::tracing::prelude::*;

/// Standard Firmata link rate.
pub const DEFAULT_BAUD_RATE: u32 = 57600;

/// Opens a native serial port, e.g. `/dev/ttyACM0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialOpener;

impl TransportOpener for SerialOpener {
    fn open(&self, port: &str, baud_rate: u32) -> Result<BoxedTransport> {
        debug!(port, baud_rate, "Opening serial port.");
        let stream = tokio_serial::new(port, baud_rate).open_native_async()?;
        Ok(Box::new(stream))
    }
}
