//! Pin descriptors and pin addressing.
//!
//! Pins are addressed by textual labels (as they arrive from drivers and
//! remote commands) which must parse as plain base-10 indices. Analog pins
//! have their own 0-based numbering and sit after the digital pins on the
//! board, so A0 is digital pin 14.

use strum::{Display, EnumString};

use crate::error::{Error, Result};

/// Offset between analog pin numbering (A0, A1, ...) and digital indices.
pub const ANALOG_PIN_OFFSET: usize = 14;

/// Functional configuration of a physical pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum PinMode {
    /// Not yet configured by anyone
    #[default]
    Unset,
    Input,
    Output,
    Analog,
    Pwm,
    Servo,
}

/// Kind of value streaming the board can be asked to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ReportKind {
    Digital,
    Analog,
}

/// Snapshot of one entry of the protocol client's pin table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pin {
    pub mode: PinMode,
    /// Last value observed from reporting or last value written
    pub value: i32,
}

impl Pin {
    pub fn new(mode: PinMode, value: i32) -> Self {
        Self { mode, value }
    }
}

/// Parse a pin label into a digital pin index.
///
/// Only non-negative base-10 integers are accepted. Nothing is sent to the
/// board when this fails.
pub fn parse_pin(label: &str) -> Result<usize> {
    if label.is_empty() || !label.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidPin {
            label: label.to_string(),
        });
    }
    label.parse().map_err(|_| Error::InvalidPin {
        label: label.to_string(),
    })
}

/// Parse an analog pin label (A0 = "0") into its digital pin index.
pub fn parse_analog_pin(label: &str) -> Result<usize> {
    let analog = parse_pin(label)?;
    analog
        .checked_add(ANALOG_PIN_OFFSET)
        .ok_or_else(|| Error::InvalidPin {
            label: label.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use test_case::test_case;

    #[test_case("0", 0)]
    #[test_case("13", 13)]
    #[test_case("007", 7)]
    fn parses_decimal_labels(label: &str, expected: usize) {
        assert_eq!(parse_pin(label).unwrap(), expected);
    }

    #[test_case(""; "empty")]
    #[test_case("a"; "letter")]
    #[test_case("A0"; "analog name")]
    #[test_case("-1"; "negative")]
    #[test_case("+3"; "explicit sign")]
    #[test_case(" 4"; "leading space")]
    #[test_case("0x0d"; "hex")]
    #[test_case("99999999999999999999999"; "overflow")]
    fn rejects_non_decimal_labels(label: &str) {
        match parse_pin(label) {
            Err(Error::InvalidPin { label: l }) => assert_eq!(l, label),
            other => panic!("expected InvalidPin, got {other:?}"),
        }
    }

    #[test_case("0", 14)]
    #[test_case("3", 17)]
    #[test_case("5", 19)]
    fn analog_labels_map_past_digital_pins(label: &str, expected: usize) {
        assert_eq!(parse_analog_pin(label).unwrap(), expected);
    }

    #[test]
    fn mode_names_parse_and_display() {
        assert_eq!(PinMode::Pwm.to_string(), "pwm");
        assert_eq!(PinMode::from_str("servo").unwrap(), PinMode::Servo);
        assert!(PinMode::from_str("shift").is_err());
    }
}
