//! # Joystick Frame Encoder
//!
//! Packs two sampled axes and the button vector into the 8-byte telemetry
//! payload expected by the drive head unit.
//!
//! ## Payload Layout
//!
//! ```text
//! Byte 0: X high  [7:6] magnitude bits 9:8 | [4] sign | [3:2] magnitude bits 11:10 | [1:0] resolution marker
//! Byte 1: X low   magnitude bits 7:0
//! Byte 2: Y high  (same layout as byte 0)
//! Byte 3: Y low
//! Byte 4: 0xFF
//! Byte 5: buttons 1-4 (0x40, 0x10, 0x04, 0x01)
//! Byte 6: buttons 5-6 (0x04, 0x40)
//! Byte 7: 0x1F
//! ```

use super::protocol::*;
use crate::joystick::buttons::ButtonVector;

/// Encode sampled axes and buttons into a joystick frame
///
/// # Arguments
///
/// * `x` - Resolved X axis value (0-65535)
/// * `y` - Resolved Y axis value (0-65535)
/// * `buttons` - Pressed state per button; entries beyond the sixth are ignored
/// * `resolution` - Advertised axis resolution
///
/// # Examples
///
/// ```
/// use joycan_bridge::can::encoder::encode_joystick_frame;
/// use joycan_bridge::can::protocol::Resolution;
/// use joycan_bridge::joystick::buttons::ButtonVector;
///
/// let frame = encode_joystick_frame(32768, 32768, &ButtonVector::released(6), Resolution::Bits12);
/// assert_eq!(frame.payload(), &[0x03, 0x00, 0x03, 0x00, 0xFF, 0x00, 0x00, 0x1F]);
/// ```
pub fn encode_joystick_frame(
    x: u16,
    y: u16,
    buttons: &ButtonVector,
    resolution: Resolution,
) -> JoystickFrame {
    let mut payload = JOYSTICK_BASE_PAYLOAD;

    for (pressed, &(byte, mask)) in buttons.iter().zip(BUTTON_BITS.iter()) {
        if pressed {
            payload[byte] |= mask;
        }
    }

    let (x_hi, x_lo) = encode_axis(scale_axis(x, resolution), resolution.x_marker());
    let (y_hi, y_lo) = encode_axis(scale_axis(y, resolution), resolution.y_marker());
    payload[0] = x_hi;
    payload[1] = x_lo;
    payload[2] = y_hi;
    payload[3] = y_lo;

    JoystickFrame::from_payload(payload)
}

/// Rescale a raw axis value to the signed range of `resolution`
///
/// `round(raw / 65536 * 2^(res+1)) - 2^res`, clamped to
/// `-2^res..=2^res - 1`. Only a raw value at the very top of the scale can
/// round past the upper bound.
#[must_use]
pub fn scale_axis(raw: u16, resolution: Resolution) -> i32 {
    // 2^(res+1) / 2^16 == 2^-(15 - res)
    let shift = 15 - resolution.bits();
    let rounded = (u32::from(raw) + (1 << (shift - 1))) >> shift;
    let scaled = rounded as i32 - resolution.half_range();
    scaled.clamp(resolution.min_scaled(), resolution.max_scaled())
}

/// Encode a scaled axis into its `(high, low)` byte pair
///
/// The magnitude is split big-endian; high-byte bits 1:0 land in bits 7:6
/// and bits 3:2 stay in place, leaving room for the sign flag and the
/// resolution marker.
#[must_use]
pub fn encode_axis(scaled: i32, marker: u8) -> (u8, u8) {
    let mut high = marker;
    if scaled < 0 {
        high |= AXIS_SIGN_BIT;
    }

    let magnitude = scaled.unsigned_abs().min(u32::from(u16::MAX)) as u16;
    let [mag_hi, mag_lo] = magnitude.to_be_bytes();
    high |= ((u16::from(mag_hi) << 6) & 0xC0) as u8;
    high |= mag_hi & 0x0C;

    (high, mag_lo)
}

/// Decode a `(high, low)` byte pair back into a scaled axis value
///
/// A set sign flag with zero magnitude stands for `-2^res`, whose
/// magnitude does not fit the four magnitude bits at 12-bit resolution.
#[must_use]
pub fn decode_axis(high: u8, low: u8, resolution: Resolution) -> i32 {
    let mag_hi = ((high & 0xC0) >> 6) | (high & 0x0C);
    let magnitude = i32::from(u16::from_be_bytes([mag_hi, low]));

    if high & AXIS_SIGN_BIT == 0 {
        magnitude
    } else if magnitude == 0 {
        resolution.min_scaled()
    } else {
        -magnitude
    }
}

/// Decode a joystick payload into `(scaled_x, scaled_y, buttons)`
#[must_use]
pub fn decode_joystick_payload(payload: &[u8; 8], resolution: Resolution) -> (i32, i32, ButtonVector) {
    let x = decode_axis(payload[0], payload[1], resolution);
    let y = decode_axis(payload[2], payload[3], resolution);
    let buttons = BUTTON_BITS
        .iter()
        .map(|&(byte, mask)| payload[byte] & mask != 0)
        .collect();

    (x, y, buttons)
}
