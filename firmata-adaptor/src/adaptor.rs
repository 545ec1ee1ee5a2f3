//! Mode-aware adaptor for Firmata boards.
//!
//! The adaptor sits between drivers and a [`ProtocolClient`]. It turns pin
//! labels into indices, makes sure a pin is in the mode an operation needs
//! before issuing it, and turns the client's event-driven I2C replies into a
//! plain request/response call.
//!
//! # Pin modes
//!
//! The client's pin table is the only record of a pin's mode. Every
//! operation fetches the current mode fresh and requests a change only when
//! it differs. The check and the change are not atomic: two callers racing on
//! the same pin may both request the change, and nothing prevents a write
//! from another caller landing between the check and the operation.
//!
//! # Reads
//!
//! Digital and analog reads return the value the client's reporting loop
//! last stored. The first read after switching a pin into a reporting mode
//! enables reporting and waits out the settling delay; later reads return
//! immediately with whatever was last reported.
//!
//! # I2C
//!
//! There is one active target address, set by `i2c_start`. Replies carry no
//! correlation token, so `i2c_read` takes the next `I2cReply` event after
//! its request. Reads are serialized per adaptor so at most one request is
//! outstanding at a time.
//!
//! The reply handler is registered only after `i2c_read_request` returns.
//! If the client's reader task runs on another thread and publishes the
//! reply inside that window, the event has no subscriber and is dropped;
//! without a reply timeout the read then waits forever. Hosts on a
//! multi-threaded runtime should configure a reply timeout.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::time;

use crate::client::ProtocolClient;
use crate::config::AdaptorConfig;
use crate::error::{Error, Result};
use crate::event::{EventData, I2C_REPLY};
use crate::hw_trait::{
    Adaptor, AnalogReader, DigitalReader, DigitalWriter, I2c, PwmWriter, ServoWriter,
};
use crate::pin::{parse_analog_pin, parse_pin, Pin, PinMode, ReportKind};
use crate::tracing::prelude::*;
use crate::transport::{BoxedTransport, SerialOpener, Transport, TransportOpener, DEFAULT_BAUD_RATE};

/// Adaptor for a board speaking Firmata through a protocol client `C`.
pub struct FirmataAdaptor<C> {
    name: String,
    port: String,
    client: C,
    /// Caller-supplied transport, parked here between sessions
    transport: Mutex<Option<BoxedTransport>>,
    transport_supplied: bool,
    opener: Box<dyn TransportOpener>,
    baud_rate: u32,
    settle_delay: Duration,
    i2c_reply_timeout: Option<Duration>,
    i2c_address: AtomicU8,
    i2c_read_lock: AsyncMutex<()>,
    connected: AtomicBool,
}

impl<C: ProtocolClient> FirmataAdaptor<C> {
    /// Create an adaptor named `name` driving `client`.
    ///
    /// With no port or transport configured, connecting opens the empty port
    /// label and will normally fail; set one with [`with_port`] or
    /// [`with_transport`].
    ///
    /// [`with_port`]: Self::with_port
    /// [`with_transport`]: Self::with_transport
    pub fn new(name: impl Into<String>, client: C) -> Self {
        let defaults = AdaptorConfig::default();
        Self {
            name: name.into(),
            port: String::new(),
            client,
            transport: Mutex::new(None),
            transport_supplied: false,
            opener: Box::new(SerialOpener),
            baud_rate: DEFAULT_BAUD_RATE,
            settle_delay: defaults.settle_delay(),
            i2c_reply_timeout: defaults.i2c_reply_timeout(),
            i2c_address: AtomicU8::new(0),
            i2c_read_lock: AsyncMutex::new(()),
            connected: AtomicBool::new(false),
        }
    }

    /// Create an adaptor from `config`.
    pub fn from_config(config: &AdaptorConfig, client: C) -> Self {
        Self::new(config.name.clone(), client).with_config(config)
    }

    /// Port label. Used to open the connection unless a transport is
    /// supplied, in which case it is only a display label.
    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = port.into();
        self
    }

    /// Use `transport` for every connect instead of opening the port.
    ///
    /// The client hands the stream back on disconnect and the next connect
    /// reuses it.
    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        *self.transport.lock() = Some(Box::new(transport));
        self.transport_supplied = true;
        self
    }

    /// Replace the strategy used to open the port.
    pub fn with_opener(mut self, opener: impl TransportOpener + 'static) -> Self {
        self.opener = Box::new(opener);
        self
    }

    /// Apply link and timing settings from `config`. The name is left alone.
    pub fn with_config(mut self, config: &AdaptorConfig) -> Self {
        if let Some(port) = &config.port {
            self.port = port.clone();
        }
        self.baud_rate = config.baud_rate;
        self.settle_delay = config.settle_delay();
        self.i2c_reply_timeout = config.i2c_reply_timeout();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Current I2C target address.
    pub fn i2c_address(&self) -> u8 {
        self.i2c_address.load(Ordering::SeqCst)
    }

    /// Start a session with the board.
    ///
    /// Uses the pre-supplied transport if there is one, otherwise opens the
    /// port. Returns the failures encountered; empty on success.
    pub async fn connect(&self) -> Vec<Error> {
        match self.start_session().await {
            Ok(()) => Vec::new(),
            Err(e) => {
                warn!(adaptor = %self.name, port = %self.port, error = %e, "Connect failed.");
                vec![e]
            }
        }
    }

    async fn start_session(&self) -> Result<()> {
        // Take the transport out before awaiting; the guard is not Send.
        let parked = self.transport.lock().take();
        let transport = match parked {
            Some(transport) => transport,
            None if self.transport_supplied => {
                return Err(Error::TransportUnavailable {
                    port: self.port.clone(),
                })
            }
            None => self
                .opener
                .open(&self.port, self.baud_rate)
                .map_err(|e| Error::TransportOpen {
                    port: self.port.clone(),
                    source: Box::new(e),
                })?,
        };

        self.client.connect(transport).await?;
        self.connected.store(true, Ordering::SeqCst);
        debug!(adaptor = %self.name, port = %self.port, "Connected.");
        Ok(())
    }

    /// End the session.
    ///
    /// Always delegates to the client, which may hold the transport even
    /// after a failed connect. A caller-supplied transport is parked for the
    /// next connect; one opened here is dropped, closing it. On failure the
    /// adaptor keeps its connected state so a later call can retry.
    pub async fn disconnect(&self) -> Result<()> {
        let returned = self.client.disconnect().await?;
        if self.transport_supplied {
            if let Some(transport) = returned {
                *self.transport.lock() = Some(transport);
            }
        }
        self.connected.store(false, Ordering::SeqCst);
        debug!(adaptor = %self.name, "Disconnected.");
        Ok(())
    }

    /// Terminal teardown. Safe to call whether or not connect succeeded.
    pub async fn finalize(&self) -> Vec<Error> {
        self.disconnect().await.err().into_iter().collect()
    }

    /// Move the servo on `pin` to `angle` degrees (0-180).
    pub async fn servo_write(&self, pin: &str, angle: u8) -> Result<()> {
        self.analog_style_write(pin, PinMode::Servo, angle).await
    }

    /// Set the PWM duty cycle on `pin` (0-254).
    pub async fn pwm_write(&self, pin: &str, level: u8) -> Result<()> {
        self.analog_style_write(pin, PinMode::Pwm, level).await
    }

    /// Drive `pin` to `level` (0 or 1).
    pub async fn digital_write(&self, pin: &str, level: u8) -> Result<()> {
        let pin = parse_pin(pin)?;
        self.ensure_mode(pin, PinMode::Output).await?;
        self.client.digital_write(pin, level).await
    }

    /// Last reported digital value of `pin`.
    pub async fn digital_read(&self, pin: &str) -> Result<i32> {
        let pin = parse_pin(pin)?;
        self.reporting_read(pin, PinMode::Input, ReportKind::Digital)
            .await
    }

    /// Last reported value of analog pin `pin` (A0 is "0").
    pub async fn analog_read(&self, pin: &str) -> Result<i32> {
        let pin = parse_analog_pin(pin)?;
        self.reporting_read(pin, PinMode::Analog, ReportKind::Analog)
            .await
    }

    /// Target `address` with subsequent I2C operations.
    ///
    /// Replaces any previous target; requests already issued are unaffected.
    pub async fn i2c_start(&self, address: u8) -> Result<()> {
        self.i2c_address.store(address, Ordering::SeqCst);
        trace!(adaptor = %self.name, address, "I2C target set.");
        self.client.i2c_config(0).await
    }

    /// Read `size` bytes from the current I2C target.
    ///
    /// Waits for the board's reply with no deadline unless a reply timeout
    /// is configured. On timeout the reply handler is withdrawn, so a late
    /// reply is not delivered to a read that has already given up.
    pub async fn i2c_read(&self, size: usize) -> Result<Vec<u8>> {
        let _outstanding = self.i2c_read_lock.lock().await;
        let address = self.i2c_address();

        trace!(address, size, "I2C read request.");
        self.client.i2c_read_request(address, size).await?;

        let (reply_tx, reply_rx) = oneshot::channel();
        let events = self.client.events();
        let subscription = events.once(I2C_REPLY, move |data| {
            if let EventData::I2cReply(reply) = data {
                let _ = reply_tx.send(reply.data.clone());
            }
        });

        let reply = match self.i2c_reply_timeout {
            Some(limit) => match time::timeout(limit, reply_rx).await {
                Ok(reply) => reply,
                Err(_) => {
                    events.cancel(I2C_REPLY, subscription);
                    return Err(Error::I2cReplyTimeout(limit));
                }
            },
            None => reply_rx.await,
        };
        let data = reply.map_err(|_| Error::I2cReplyDropped)?;
        trace!(address, len = data.len(), "I2C reply.");
        Ok(data.to_vec())
    }

    /// Write `data` to the current I2C target.
    pub async fn i2c_write(&self, data: &[u8]) -> Result<()> {
        self.client
            .i2c_write_request(self.i2c_address(), data)
            .await
    }

    async fn analog_style_write(&self, pin: &str, mode: PinMode, value: u8) -> Result<()> {
        let pin = parse_pin(pin)?;
        self.ensure_mode(pin, mode).await?;
        self.client.analog_write(pin, u16::from(value)).await
    }

    async fn reporting_read(&self, pin: usize, mode: PinMode, kind: ReportKind) -> Result<i32> {
        if self.ensure_mode(pin, mode).await? {
            self.client.toggle_reporting(pin, true, kind).await?;
            time::sleep(self.settle_delay).await;
        }
        Ok(self.pin(pin)?.value)
    }

    /// Put `pin` into `mode` unless it already is. Returns whether a change
    /// was requested.
    async fn ensure_mode(&self, pin: usize, mode: PinMode) -> Result<bool> {
        let current = self.pin(pin)?.mode;
        if current == mode {
            return Ok(false);
        }
        trace!(pin, from = %current, to = %mode, "Changing pin mode.");
        self.client.set_pin_mode(pin, mode).await?;
        Ok(true)
    }

    fn pin(&self, pin: usize) -> Result<Pin> {
        let pins = self.client.pins();
        pins.get(pin).copied().ok_or(Error::PinOutOfRange {
            pin,
            count: pins.len(),
        })
    }
}

impl<C> std::fmt::Debug for FirmataAdaptor<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirmataAdaptor")
            .field("name", &self.name)
            .field("port", &self.port)
            .field("connected", &self.connected.load(Ordering::SeqCst))
            .field("i2c_address", &self.i2c_address.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<C: ProtocolClient> Adaptor for FirmataAdaptor<C> {
    fn name(&self) -> &str {
        FirmataAdaptor::name(self)
    }

    fn port(&self) -> &str {
        FirmataAdaptor::port(self)
    }

    async fn connect(&self) -> Vec<Error> {
        FirmataAdaptor::connect(self).await
    }

    async fn finalize(&self) -> Vec<Error> {
        FirmataAdaptor::finalize(self).await
    }
}

#[async_trait]
impl<C: ProtocolClient> DigitalWriter for FirmataAdaptor<C> {
    async fn digital_write(&self, pin: &str, level: u8) -> Result<()> {
        FirmataAdaptor::digital_write(self, pin, level).await
    }
}

#[async_trait]
impl<C: ProtocolClient> DigitalReader for FirmataAdaptor<C> {
    async fn digital_read(&self, pin: &str) -> Result<i32> {
        FirmataAdaptor::digital_read(self, pin).await
    }
}

#[async_trait]
impl<C: ProtocolClient> AnalogReader for FirmataAdaptor<C> {
    async fn analog_read(&self, pin: &str) -> Result<i32> {
        FirmataAdaptor::analog_read(self, pin).await
    }
}

#[async_trait]
impl<C: ProtocolClient> PwmWriter for FirmataAdaptor<C> {
    async fn pwm_write(&self, pin: &str, level: u8) -> Result<()> {
        FirmataAdaptor::pwm_write(self, pin, level).await
    }
}

#[async_trait]
impl<C: ProtocolClient> ServoWriter for FirmataAdaptor<C> {
    async fn servo_write(&self, pin: &str, angle: u8) -> Result<()> {
        FirmataAdaptor::servo_write(self, pin, angle).await
    }
}

#[async_trait]
impl<C: ProtocolClient> I2c for FirmataAdaptor<C> {
    async fn i2c_start(&self, address: u8) -> Result<()> {
        FirmataAdaptor::i2c_start(self, address).await
    }

    async fn i2c_read(&self, size: usize) -> Result<Vec<u8>> {
        FirmataAdaptor::i2c_read(self, size).await
    }

    async fn i2c_write(&self, data: &[u8]) -> Result<()> {
        FirmataAdaptor::i2c_write(self, data).await
    }
}
