//! # CAN Protocol Constants and Types
//!
//! Identifiers, payload layouts and frame types shared by the joystick
//! telemetry encoder and the LED status decoder.

use serde::Deserialize;

use crate::error::{BridgeError, Result};

/// Joystick telemetry arbitration ID (extended, mimics a Grayhill joystick)
pub const JOYSTICK_FRAME_ID: u32 = 0x18FD_D6F1;

/// LED status arbitration ID (extended), used by both status formats
pub const STATUS_FRAME_ID: u32 = 0x18EF_F102;

/// Maximum classic CAN payload size
pub const CAN_MAX_PAYLOAD_SIZE: usize = 8;

/// Largest 29-bit extended identifier
pub const CAN_EXTENDED_ID_MAX: u32 = 0x1FFF_FFFF;

/// Largest 11-bit standard identifier
pub const CAN_STANDARD_ID_MAX: u32 = 0x7FF;

/// Joystick payload before axis and button bits are applied.
/// Bytes 4 and 7 are constant protocol markers.
pub const JOYSTICK_BASE_PAYLOAD: [u8; 8] = [0x01, 0x00, 0x01, 0x00, 0xFF, 0x00, 0x00, 0x1F];

/// Sign flag in the axis high byte (byte0 for X, byte2 for Y)
pub const AXIS_SIGN_BIT: u8 = 0x10;

/// Full-scale raw ADC value count (readings are `0..=65535`)
pub const AXIS_FULL_SCALE: u32 = 65_536;

/// Raw ADC center
pub const AXIS_RAW_CENTER: u16 = 32_768;

/// Number of indicators addressable by a batch status frame
pub const STATUS_MAX_INDICATORS: usize = 9;

/// Maximum number of buttons carried by the joystick frame
pub const JOYSTICK_MAX_BUTTONS: usize = 6;

/// Button bit positions as `(byte index, mask)`, in button order
pub const BUTTON_BITS: [(usize, u8); JOYSTICK_MAX_BUTTONS] = [
    (5, 0x40),
    (5, 0x10),
    (5, 0x04),
    (5, 0x01),
    (6, 0x04),
    (6, 0x40),
];

/// Axis resolution advertised in the joystick frame.
///
/// Determines the signed range `-2^res..=2^res - 1` of a scaled axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "u8")]
pub enum Resolution {
    /// 8-bit magnitude (`-256..=255`)
    Bits8,
    /// 10-bit magnitude (`-1024..=1023`)
    Bits10,
    /// 12-bit magnitude (`-4096..=4095`)
    Bits12,
}

impl Resolution {
    /// Number of bits, `res`
    #[must_use]
    pub fn bits(self) -> u32 {
        match self {
            Resolution::Bits8 => 8,
            Resolution::Bits10 => 10,
            Resolution::Bits12 => 12,
        }
    }

    /// `2^res`, the magnitude of the most negative scaled value
    #[must_use]
    pub fn half_range(self) -> i32 {
        1 << self.bits()
    }

    /// Smallest scaled value, `-2^res`
    #[must_use]
    pub fn min_scaled(self) -> i32 {
        -self.half_range()
    }

    /// Largest scaled value, `2^res - 1`
    #[must_use]
    pub fn max_scaled(self) -> i32 {
        self.half_range() - 1
    }

    /// Resolution marker bits for the X high byte
    #[must_use]
    pub fn x_marker(self) -> u8 {
        match self {
            Resolution::Bits12 | Resolution::Bits10 => 0x03,
            Resolution::Bits8 => 0x00,
        }
    }

    /// Resolution marker bits for the Y high byte
    #[must_use]
    pub fn y_marker(self) -> u8 {
        match self {
            Resolution::Bits12 => 0x03,
            Resolution::Bits10 | Resolution::Bits8 => 0x00,
        }
    }
}

impl TryFrom<u8> for Resolution {
    type Error = String;

    fn try_from(bits: u8) -> std::result::Result<Self, Self::Error> {
        match bits {
            8 => Ok(Resolution::Bits8),
            10 => Ok(Resolution::Bits10),
            12 => Ok(Resolution::Bits12),
            other => Err(format!("resolution must be 8, 10 or 12 bits, got {}", other)),
        }
    }
}

/// Raw CAN frame as exchanged with the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanFrame {
    /// Arbitration ID (11 or 29 bits)
    pub id: u32,

    /// Extended (29-bit) addressing
    pub extended: bool,

    /// Payload data (max 8 bytes)
    pub payload: Vec<u8>,
}

impl CanFrame {
    /// Create a new CAN frame
    ///
    /// # Errors
    ///
    /// Returns error if the payload exceeds 8 bytes or the ID does not fit
    /// the addressing mode.
    pub fn new(id: u32, extended: bool, payload: Vec<u8>) -> Result<Self> {
        if payload.len() > CAN_MAX_PAYLOAD_SIZE {
            return Err(BridgeError::CanProtocol(format!(
                "Payload size {} exceeds maximum {}",
                payload.len(),
                CAN_MAX_PAYLOAD_SIZE
            )));
        }

        let max_id = if extended { CAN_EXTENDED_ID_MAX } else { CAN_STANDARD_ID_MAX };
        if id > max_id {
            return Err(BridgeError::CanProtocol(format!(
                "ID 0x{:X} does not fit {} addressing",
                id,
                if extended { "extended" } else { "standard" }
            )));
        }

        Ok(Self { id, extended, payload })
    }

    /// Data length code
    pub fn dlc(&self) -> u8 {
        self.payload.len() as u8
    }
}

/// Encoded joystick telemetry frame.
///
/// Always 8 bytes at [`JOYSTICK_FRAME_ID`] with extended addressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoystickFrame {
    payload: [u8; 8],
}

impl JoystickFrame {
    pub(crate) fn from_payload(payload: [u8; 8]) -> Self {
        Self { payload }
    }

    /// Arbitration ID of every joystick frame
    pub fn id(&self) -> u32 {
        JOYSTICK_FRAME_ID
    }

    /// The 8 payload bytes
    pub fn payload(&self) -> &[u8; 8] {
        &self.payload
    }

    /// Convert into a transport frame
    pub fn to_can_frame(&self) -> CanFrame {
        CanFrame {
            id: JOYSTICK_FRAME_ID,
            extended: true,
            payload: self.payload.to_vec(),
        }
    }
}
