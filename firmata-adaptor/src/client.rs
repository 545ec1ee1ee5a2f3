//! Capability set required from a Firmata protocol client.
//!
//! The client owns everything below the adaptor: framing on the wire, the
//! board's pin table, and the background task that pumps the transport and
//! publishes events. Implementations must be internally synchronized; the
//! adaptor calls them from whatever tasks its own callers run on and takes
//! no lock around them.

use async_trait::async_trait;

use crate::error::Result;
use crate::event::EventBus;
use crate::pin::{Pin, PinMode, ReportKind};
use crate::transport::BoxedTransport;

#[async_trait]
pub trait ProtocolClient: Send + Sync {
    /// Take ownership of `transport` and start a session on it.
    async fn connect(&self, transport: BoxedTransport) -> Result<()>;

    /// End the session and give back the transport, if one is held.
    ///
    /// Called even when `connect` failed or was never called, in which case
    /// it must release whatever was taken and succeed. A transport dropped
    /// by the caller is closed.
    async fn disconnect(&self) -> Result<Option<BoxedTransport>>;

    /// Snapshot of the pin table, indexed by digital pin number.
    fn pins(&self) -> Vec<Pin>;

    async fn set_pin_mode(&self, pin: usize, mode: PinMode) -> Result<()>;

    async fn digital_write(&self, pin: usize, level: u8) -> Result<()>;

    /// Shared entry point for PWM, servo and other analog-style writes.
    async fn analog_write(&self, pin: usize, value: u16) -> Result<()>;

    /// Enable or disable streaming of `kind` samples for `pin`.
    async fn toggle_reporting(&self, pin: usize, enable: bool, kind: ReportKind) -> Result<()>;

    async fn i2c_config(&self, delay: u16) -> Result<()>;

    async fn i2c_read_request(&self, address: u8, size: usize) -> Result<()>;

    async fn i2c_write_request(&self, address: u8, data: &[u8]) -> Result<()>;

    /// Bus on which the client publishes incoming traffic.
    fn events(&self) -> &EventBus;
}

/// Recording client for unit tests.
#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use crate::error::Error;
    use parking_lot::Mutex;

    /// One observed call on the client.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Connect,
        Disconnect,
        SetPinMode(usize, PinMode),
        DigitalWrite(usize, u8),
        AnalogWrite(usize, u16),
        ToggleReporting(usize, bool, ReportKind),
        I2cConfig(u16),
        I2cReadRequest(u8, usize),
        I2cWriteRequest(u8, Vec<u8>),
    }

    /// Which call kinds should fail.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct Failures {
        pub connect: bool,
        pub disconnect: bool,
        pub set_pin_mode: bool,
        pub write: bool,
        pub toggle_reporting: bool,
        pub i2c: bool,
    }

    /// In-memory board that records calls and keeps a pin table.
    ///
    /// A successful mode change updates the pin table the way a real client
    /// does once the board acknowledges it.
    pub struct FakeClient {
        pins: Mutex<Vec<Pin>>,
        calls: Mutex<Vec<Call>>,
        transport: Mutex<Option<BoxedTransport>>,
        pub failures: Mutex<Failures>,
        events: EventBus,
    }

    impl FakeClient {
        pub fn with_pins(count: usize) -> Self {
            Self {
                pins: Mutex::new(vec![Pin::default(); count]),
                calls: Mutex::new(Vec::new()),
                transport: Mutex::new(None),
                failures: Mutex::new(Failures::default()),
                events: EventBus::new(),
            }
        }

        pub fn set_pin(&self, pin: usize, mode: PinMode, value: i32) {
            self.pins.lock()[pin] = Pin::new(mode, value);
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().clone()
        }

        pub fn clear_calls(&self) {
            self.calls.lock().clear();
        }

        pub fn has_transport(&self) -> bool {
            self.transport.lock().is_some()
        }

        fn record(&self, call: Call, fail: bool) -> Result<()> {
            let what = format!("{call:?}");
            self.calls.lock().push(call);
            if fail {
                Err(Error::Protocol(format!("{what} rejected")))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl ProtocolClient for FakeClient {
        /// Holds on to the transport even when the handshake is rejected.
        async fn connect(&self, transport: BoxedTransport) -> Result<()> {
            *self.transport.lock() = Some(transport);
            self.record(Call::Connect, self.failures.lock().connect)
        }

        async fn disconnect(&self) -> Result<Option<BoxedTransport>> {
            self.record(Call::Disconnect, self.failures.lock().disconnect)?;
            self.events.clear();
            Ok(self.transport.lock().take())
        }

        fn pins(&self) -> Vec<Pin> {
            self.pins.lock().clone()
        }

        async fn set_pin_mode(&self, pin: usize, mode: PinMode) -> Result<()> {
            self.record(Call::SetPinMode(pin, mode), self.failures.lock().set_pin_mode)?;
            self.pins.lock()[pin].mode = mode;
            Ok(())
        }

        async fn digital_write(&self, pin: usize, level: u8) -> Result<()> {
            self.record(Call::DigitalWrite(pin, level), self.failures.lock().write)?;
            self.pins.lock()[pin].value = i32::from(level);
            Ok(())
        }

        async fn analog_write(&self, pin: usize, value: u16) -> Result<()> {
            self.record(Call::AnalogWrite(pin, value), self.failures.lock().write)?;
            self.pins.lock()[pin].value = i32::from(value);
            Ok(())
        }

        async fn toggle_reporting(&self, pin: usize, enable: bool, kind: ReportKind) -> Result<()> {
            let fail = self.failures.lock().toggle_reporting;
            self.record(Call::ToggleReporting(pin, enable, kind), fail)
        }

        async fn i2c_config(&self, delay: u16) -> Result<()> {
            self.record(Call::I2cConfig(delay), self.failures.lock().i2c)
        }

        async fn i2c_read_request(&self, address: u8, size: usize) -> Result<()> {
            self.record(Call::I2cReadRequest(address, size), self.failures.lock().i2c)
        }

        async fn i2c_write_request(&self, address: u8, data: &[u8]) -> Result<()> {
            self.record(Call::I2cWriteRequest(address, data.to_vec()), self.failures.lock().i2c)
        }

        fn events(&self) -> &EventBus {
            &self.events
        }
    }
}
