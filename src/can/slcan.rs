//! # SLCAN Line Codec
//!
//! Serial-line CAN (Lawicel) ASCII encoding used by USB-CAN adapters.
//!
//! ```text
//! T18FDD6F1801000100FF00001F\r    extended: 8 hex ID digits, DLC, data
//! t6662ABCD\r                     standard: 3 hex ID digits, DLC, data
//! ```
//!
//! Commands are acknowledged with `\r`, failures with BEL (`0x07`).

use std::fmt::Write;

use super::protocol::*;
use crate::error::{BridgeError, Result};

/// Line terminator
pub const SLCAN_CR: u8 = b'\r';

/// Error reply
pub const SLCAN_BELL: u8 = 0x07;

/// Close channel
pub const SLCAN_CLOSE: &str = "C\r";

/// Open channel in normal mode
pub const SLCAN_OPEN: &str = "O\r";

/// Supported bus bitrates and their `S<n>` setup codes
pub const SLCAN_BITRATES: [(u32, u8); 9] = [
    (10_000, 0),
    (20_000, 1),
    (50_000, 2),
    (100_000, 3),
    (125_000, 4),
    (250_000, 5),
    (500_000, 6),
    (800_000, 7),
    (1_000_000, 8),
];

/// Build the `S<n>\r` command for a bus bitrate
///
/// # Errors
///
/// Returns error for bitrates the adapter cannot select
pub fn bitrate_command(bitrate: u32) -> Result<String> {
    SLCAN_BITRATES
        .iter()
        .find(|&&(rate, _)| rate == bitrate)
        .map(|&(_, code)| format!("S{}\r", code))
        .ok_or_else(|| BridgeError::CanProtocol(format!("Unsupported CAN bitrate: {}", bitrate)))
}

/// Encode a frame as one SLCAN transmit line (terminator included)
///
/// # Examples
///
/// ```
/// use joycan_bridge::can::protocol::CanFrame;
/// use joycan_bridge::can::slcan::encode_frame;
///
/// let frame = CanFrame::new(0x666, false, vec![0xAB, 0xCD]).unwrap();
/// assert_eq!(encode_frame(&frame), b"t6662ABCD\r".to_vec());
/// ```
pub fn encode_frame(frame: &CanFrame) -> Vec<u8> {
    let mut line = String::with_capacity(1 + 8 + 1 + 2 * CAN_MAX_PAYLOAD_SIZE + 1);

    // Writing into a String cannot fail
    let _ = if frame.extended {
        write!(line, "T{:08X}{}", frame.id & CAN_EXTENDED_ID_MAX, frame.dlc())
    } else {
        write!(line, "t{:03X}{}", frame.id & CAN_STANDARD_ID_MAX, frame.dlc())
    };
    for byte in &frame.payload {
        let _ = write!(line, "{:02X}", byte);
    }
    line.push('\r');

    line.into_bytes()
}

/// Decode one SLCAN line (terminator stripped)
///
/// # Returns
///
/// * `Ok(Some(frame))` - a received data frame
/// * `Ok(None)` - a command acknowledgement (`""`, `z`, `Z`)
///
/// # Errors
///
/// Returns error if the line is not valid SLCAN
pub fn decode_line(line: &[u8]) -> Result<Option<CanFrame>> {
    let Some((&kind, rest)) = line.split_first() else {
        return Ok(None);
    };

    let id_digits = match kind {
        b'T' => 8,
        b't' => 3,
        b'z' | b'Z' => return Ok(None),
        other => {
            return Err(BridgeError::CanProtocol(format!(
                "Unexpected SLCAN line type: 0x{:02X}",
                other
            )))
        }
    };

    if rest.len() < id_digits + 1 {
        return Err(BridgeError::CanProtocol(format!(
            "SLCAN line too short: {} bytes",
            line.len()
        )));
    }

    let id = parse_hex(&rest[..id_digits])?;
    let dlc = parse_hex(&rest[id_digits..id_digits + 1])? as usize;
    let data = &rest[id_digits + 1..];

    if dlc > CAN_MAX_PAYLOAD_SIZE || data.len() != dlc * 2 {
        return Err(BridgeError::CanProtocol(format!(
            "SLCAN DLC {} does not match {} data digits",
            dlc,
            data.len()
        )));
    }

    let payload = data
        .chunks(2)
        .map(|pair| parse_hex(pair).map(|value| value as u8))
        .collect::<Result<Vec<u8>>>()?;

    CanFrame::new(id, kind == b'T', payload).map(Some)
}

fn parse_hex(digits: &[u8]) -> Result<u32> {
    if !digits.iter().all(u8::is_ascii_hexdigit) {
        return Err(BridgeError::CanProtocol(format!(
            "Invalid hex digits: {:?}",
            String::from_utf8_lossy(digits)
        )));
    }
    let text = std::str::from_utf8(digits)
        .map_err(|_| BridgeError::CanProtocol("SLCAN line is not ASCII".to_string()))?;
    u32::from_str_radix(text, 16)
        .map_err(|e| BridgeError::CanProtocol(format!("Invalid hex '{}': {}", text, e)))
}
