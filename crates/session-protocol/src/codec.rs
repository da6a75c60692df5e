//! Fixed-width ASCII command codec
//!
//! Every command is exactly seven ASCII digits: a 2-digit opcode, a
//! 2-digit zero-padded pin number, and a 3-digit zero-padded value.
//! On the wire the payload is wrapped in a start/end delimiter pair,
//! giving a 9-byte frame:
//!
//! ```text
//! !0103255.
//! │││││││└┴─ frame end
//! ││││└┴┴─── value  ("255")
//! ││└┴────── pin    ("03")
//! └┴──────── opcode ("01" = digital write), preceded by frame start
//! ```
//!
//! The device-side parser resynchronizes on the `!` and `.` delimiters,
//! so fixed widths matter more than compactness here.

use crate::errors::SessionError;
use serde::{Deserialize, Serialize};

/// Frame delimiters recognized by the device-side parser
pub const FRAME_START: char = '!';
pub const FRAME_END: char = '.';

/// Length of an encoded (unframed) command payload
pub const ENCODED_LEN: usize = 7;

/// Length of a framed command on the wire
pub const FRAMED_LEN: usize = 9;

/// Canonical digital level literals as they appear in the value field
pub const HIGH: &str = "255";
pub const LOW: &str = "000";

/// Highest addressable pin (two digits on the wire)
pub const MAX_PIN: u8 = 99;

/// Highest encodable value (three digits on the wire)
pub const MAX_VALUE: u16 = 999;

/// Sent unframed after the post-connect delay so the device-side parser
/// discards whatever partial input it accumulated while the port was
/// opening. All zeros, so a parser mid-frame sees only harmless digits.
pub const CLEARING_SEQUENCE: &[u8] = b"00000000";

/// Two-digit operation codes
pub mod opcode {
    /// Configure a pin as input or output
    pub const PIN_MODE: &str = "00";
    /// Drive a digital pin high or low
    pub const DIGITAL_WRITE: &str = "01";
    /// Request a digital pin read
    pub const DIGITAL_READ: &str = "02";
    /// PWM write to an analog-capable pin
    pub const ANALOG_WRITE: &str = "03";
    /// Request an analog pin read
    pub const ANALOG_READ: &str = "04";
    /// Identify ping; a responsive device answers on its data line
    pub const IDENTIFY: &str = "90";
    /// Toggle device-side debug echo (value 001 = on, 000 = off)
    pub const DEBUG_TOGGLE: &str = "99";
}

/// Pin direction for the pin-mode command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinMode {
    Input,
    Output,
}

impl PinMode {
    /// Value-field encoding: input is 000, output is 001
    pub fn wire_value(&self) -> u16 {
        match self {
            Self::Input => 0,
            Self::Output => 1,
        }
    }
}

/// Digital pin level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinLevel {
    Low,
    High,
}

impl PinLevel {
    /// Value-field encoding: low is 000, high is 255
    pub fn wire_value(&self) -> u16 {
        match self {
            Self::Low => 0,
            Self::High => 255,
        }
    }

    /// Flip between high and low
    pub fn toggled(&self) -> Self {
        match self {
            Self::Low => Self::High,
            Self::High => Self::Low,
        }
    }
}

/// Zero-pad a pin number to exactly two ASCII digits
///
/// Callers are expected to validate against [`MAX_PIN`] first;
/// [`Command::new`] does this for every command path.
pub fn normalize_pin(pin: u8) -> String {
    format!("{:02}", pin)
}

/// Zero-pad a value to exactly three ASCII digits
///
/// Callers are expected to validate against [`MAX_VALUE`] first.
pub fn normalize_value(value: u16) -> String {
    format!("{:03}", value)
}

/// Wrap an encoded payload in frame delimiters
pub fn frame(payload: &str) -> String {
    format!("{}{}{}", FRAME_START, payload, FRAME_END)
}

/// A validated pin command
///
/// Construction checks pin and value ranges, so `encode()` always
/// produces exactly [`ENCODED_LEN`] characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    opcode: &'static str,
    pin: u8,
    value: u16,
}

impl Command {
    /// Build a command, rejecting pins above [`MAX_PIN`] and values
    /// above [`MAX_VALUE`]
    pub fn new(opcode: &'static str, pin: u8, value: u16) -> Result<Self, SessionError> {
        if pin > MAX_PIN {
            return Err(SessionError::InvalidPin(pin));
        }
        if value > MAX_VALUE {
            return Err(SessionError::InvalidValue(value));
        }
        Ok(Self { opcode, pin, value })
    }

    pub fn pin_mode(pin: u8, mode: PinMode) -> Result<Self, SessionError> {
        Self::new(opcode::PIN_MODE, pin, mode.wire_value())
    }

    pub fn digital_write(pin: u8, level: PinLevel) -> Result<Self, SessionError> {
        Self::new(opcode::DIGITAL_WRITE, pin, level.wire_value())
    }

    pub fn digital_read(pin: u8) -> Result<Self, SessionError> {
        Self::new(opcode::DIGITAL_READ, pin, 0)
    }

    pub fn analog_write(pin: u8, value: u8) -> Result<Self, SessionError> {
        Self::new(opcode::ANALOG_WRITE, pin, u16::from(value))
    }

    pub fn analog_read(pin: u8) -> Result<Self, SessionError> {
        Self::new(opcode::ANALOG_READ, pin, 0)
    }

    /// Identify ping (`90 00 000`); infallible since all fields are fixed
    pub fn identify() -> Self {
        Self {
            opcode: opcode::IDENTIFY,
            pin: 0,
            value: 0,
        }
    }

    /// Debug echo toggle; infallible since all fields are fixed
    pub fn debug_toggle(enabled: bool) -> Self {
        Self {
            opcode: opcode::DEBUG_TOGGLE,
            pin: 0,
            value: u16::from(enabled),
        }
    }

    /// Encode to the 7-character unframed payload
    pub fn encode(&self) -> String {
        format!(
            "{}{}{}",
            self.opcode,
            normalize_pin(self.pin),
            normalize_value(self.value)
        )
    }

    /// Encode and wrap in frame delimiters (9 characters)
    pub fn framed(&self) -> String {
        frame(&self.encode())
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_pin_width() {
        assert_eq!(normalize_pin(0), "00");
        assert_eq!(normalize_pin(7), "07");
        assert_eq!(normalize_pin(13), "13");
        assert_eq!(normalize_pin(99), "99");
    }

    #[test]
    fn test_normalize_value_width() {
        assert_eq!(normalize_value(0), "000");
        assert_eq!(normalize_value(42), "042");
        assert_eq!(normalize_value(255), "255");
        assert_eq!(normalize_value(999), "999");
    }

    #[test]
    fn test_normalize_roundtrip() {
        for pin in [0u8, 1, 9, 10, 55, 99] {
            let s = normalize_pin(pin);
            assert_eq!(s.len(), 2);
            assert_eq!(s.parse::<u8>().unwrap(), pin);
        }
        for value in [0u16, 1, 99, 100, 500, 999] {
            let s = normalize_value(value);
            assert_eq!(s.len(), 3);
            assert_eq!(s.parse::<u16>().unwrap(), value);
        }
    }

    #[test]
    fn test_encoded_and_framed_lengths() {
        let cmd = Command::analog_write(11, 128).unwrap();
        assert_eq!(cmd.encode().len(), ENCODED_LEN);
        assert_eq!(cmd.framed().len(), FRAMED_LEN);
    }

    #[test]
    fn test_frame_shape() {
        let framed = Command::digital_write(3, PinLevel::High).unwrap().framed();
        assert!(framed.starts_with(FRAME_START));
        assert!(framed.ends_with(FRAME_END));
        let payload = &framed[1..framed.len() - 1];
        assert_eq!(payload.len(), ENCODED_LEN);
        assert!(payload.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_digital_write_high() {
        let cmd = Command::digital_write(3, PinLevel::High).unwrap();
        assert_eq!(cmd.framed(), "!0103255.");
    }

    #[test]
    fn test_digital_write_low() {
        let cmd = Command::digital_write(3, PinLevel::Low).unwrap();
        assert_eq!(cmd.framed(), "!0103000.");
    }

    #[test]
    fn test_pin_mode_output() {
        let cmd = Command::pin_mode(5, PinMode::Output).unwrap();
        assert_eq!(cmd.framed(), "!0005001.");
    }

    #[test]
    fn test_pin_mode_input() {
        let cmd = Command::pin_mode(5, PinMode::Input).unwrap();
        assert_eq!(cmd.framed(), "!0005000.");
    }

    #[test]
    fn test_identify_ping() {
        assert_eq!(Command::identify().framed(), "!9000000.");
    }

    #[test]
    fn test_debug_toggle() {
        assert_eq!(Command::debug_toggle(true).framed(), "!9900001.");
        assert_eq!(Command::debug_toggle(false).framed(), "!9900000.");
    }

    #[test]
    fn test_level_literals_match_constants() {
        assert_eq!(normalize_value(PinLevel::High.wire_value()), HIGH);
        assert_eq!(normalize_value(PinLevel::Low.wire_value()), LOW);
    }

    #[test]
    fn test_pin_out_of_range_rejected() {
        match Command::digital_write(100, PinLevel::High) {
            Err(SessionError::InvalidPin(100)) => {}
            other => panic!("Expected InvalidPin, got {:?}", other),
        }
    }

    #[test]
    fn test_value_out_of_range_rejected() {
        match Command::new(opcode::ANALOG_WRITE, 3, 1000) {
            Err(SessionError::InvalidValue(1000)) => {}
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_clearing_sequence_is_eight_zeros() {
        assert_eq!(CLEARING_SEQUENCE, b"00000000");
        assert_eq!(CLEARING_SEQUENCE.len(), 8);
    }

    #[test]
    fn test_level_toggle() {
        assert_eq!(PinLevel::High.toggled(), PinLevel::Low);
        assert_eq!(PinLevel::Low.toggled(), PinLevel::High);
    }
}
