//! Hardware abstraction layer traits.
//!
//! This module defines the capability traits (lifecycle, GPIO, PWM, servo,
//! I2C) that let drivers work against any adaptor providing them, whether a
//! Firmata board on a serial link or something else entirely.
//!
//! Pins are named by textual labels; each adaptor decides how labels map to
//! its hardware.

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Connection lifecycle shared by all adaptors.
///
/// `connect` and `finalize` report failures as a list so that multi-step
/// setup and teardown can surface every failing step. An empty list means
/// success.
#[async_trait]
pub trait Adaptor: Send + Sync {
    fn name(&self) -> &str;

    fn port(&self) -> &str;

    async fn connect(&self) -> Vec<Error>;

    async fn finalize(&self) -> Vec<Error>;
}

#[async_trait]
pub trait DigitalWriter: Send + Sync {
    /// Drive `pin` low (0) or high (1).
    async fn digital_write(&self, pin: &str, level: u8) -> Result<()>;
}

#[async_trait]
pub trait DigitalReader: Send + Sync {
    async fn digital_read(&self, pin: &str) -> Result<i32>;
}

#[async_trait]
pub trait AnalogReader: Send + Sync {
    async fn analog_read(&self, pin: &str) -> Result<i32>;
}

#[async_trait]
pub trait PwmWriter: Send + Sync {
    /// Set the duty cycle of `pin`, 0-254.
    async fn pwm_write(&self, pin: &str, level: u8) -> Result<()>;
}

#[async_trait]
pub trait ServoWriter: Send + Sync {
    /// Move the servo on `pin` to `angle` degrees, 0-180.
    async fn servo_write(&self, pin: &str, angle: u8) -> Result<()>;
}

/// I2C master addressing one target device at a time.
#[async_trait]
pub trait I2c: Send + Sync {
    /// Select `address` as the target of subsequent reads and writes.
    async fn i2c_start(&self, address: u8) -> Result<()>;

    async fn i2c_read(&self, size: usize) -> Result<Vec<u8>>;

    async fn i2c_write(&self, data: &[u8]) -> Result<()>;
}
