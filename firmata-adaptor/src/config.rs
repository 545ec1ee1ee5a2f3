//! Configuration for a Firmata adaptor.
//!
//! Values come from built-in defaults, optionally overlaid by environment
//! variables or read from a JSON file. Every field has a default, so a file
//! only needs to name what it changes.

use serde::{Deserialize, Serialize};
use std::{env, path::Path, time::Duration};

use anyhow::Context;

use crate::error::{Error, Result};
use crate::transport::DEFAULT_BAUD_RATE;

/// Adaptor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AdaptorConfig {
    /// Display name
    pub name: String,

    /// Port label handed to the transport opener
    pub port: Option<String>,

    /// Rate parameter for the serial opener
    pub baud_rate: u32,

    /// Wait after enabling reporting before the first read
    pub settle_delay_ms: u64,

    /// Upper bound on waiting for an I2C reply; `None` waits forever
    pub i2c_reply_timeout_ms: Option<u64>,
}

impl Default for AdaptorConfig {
    fn default() -> Self {
        Self {
            name: "firmata".to_string(),
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            settle_delay_ms: 10,
            i2c_reply_timeout_ms: None,
        }
    }
}

impl AdaptorConfig {
    /// Defaults overlaid with `FIRMATA_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::default().overlay(|key| env::var(key).ok())
    }

    /// Load configuration from a JSON file.
    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn i2c_reply_timeout(&self) -> Option<Duration> {
        self.i2c_reply_timeout_ms.map(Duration::from_millis)
    }

    fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(name) = lookup("FIRMATA_NAME") {
            self.name = name;
        }
        if let Some(port) = lookup("FIRMATA_PORT") {
            self.port = Some(port);
        }
        if let Some(baud) = lookup("FIRMATA_BAUD_RATE") {
            self.baud_rate = parse_number("FIRMATA_BAUD_RATE", &baud)?;
        }
        if let Some(delay) = lookup("FIRMATA_SETTLE_DELAY_MS") {
            self.settle_delay_ms = parse_number("FIRMATA_SETTLE_DELAY_MS", &delay)?;
        }
        if let Some(timeout) = lookup("FIRMATA_I2C_REPLY_TIMEOUT_MS") {
            self.i2c_reply_timeout_ms = Some(parse_number("FIRMATA_I2C_REPLY_TIMEOUT_MS", &timeout)?);
        }
        Ok(self)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key}={value:?} is not a valid number")))
}
