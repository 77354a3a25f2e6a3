//! # LED Status Frame Decoder
//!
//! Decodes inbound status frames from the head unit into per-indicator
//! targets. Two payload formats exist; the deployment selects one and the
//! decoder never guesses between them.

use serde::Deserialize;
use tracing::debug;

use super::protocol::*;

/// Target state for one indicator, as commanded by the head unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedTarget {
    /// Steady off (code `0x1`)
    Off,
    /// Steady on (code `0x0`)
    On,
    /// 1.0 s blink (code `0x2`)
    SlowBlink,
    /// 0.5 s blink (code `0x3`)
    MedBlink,
    /// 0.1 s blink (code `0x4`)
    FastBlink,
    /// Any other code: steady, on when the code is even
    Fallback(bool),
}

impl LedTarget {
    /// Map a 4-bit status code to a target.
    ///
    /// Unknown codes resolve to `Fallback(code % 2 == 0)`. The head unit is
    /// not known to send them; the rule is kept for wire compatibility.
    #[must_use]
    pub fn from_code(code: u8) -> Self {
        match code & 0x0F {
            0x0 => LedTarget::On,
            0x1 => LedTarget::Off,
            0x2 => LedTarget::SlowBlink,
            0x3 => LedTarget::MedBlink,
            0x4 => LedTarget::FastBlink,
            other => LedTarget::Fallback(other % 2 == 0),
        }
    }
}

/// Which inbound status format the deployment speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFormat {
    /// Up to 9 nibble-packed targets per frame
    #[default]
    Batch,
    /// Legacy: one indicator index and an on/off nibble per frame
    Single,
}

/// One decoded target for the indicator at `index` (0-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusUpdate {
    pub index: usize,
    pub target: LedTarget,
}

/// Decode a status frame
///
/// # Arguments
///
/// * `frame` - Inbound frame, already accepted by the filter set
/// * `format` - Active status format
/// * `indicator_count` - Number of indicators fitted; updates beyond it are dropped
///
/// # Returns
///
/// The updates carried by the frame, in indicator order. Frames with a
/// different ID or a payload too short to carry an update yield none.
pub fn decode_status_frame(frame: &CanFrame, format: StatusFormat, indicator_count: usize) -> Vec<StatusUpdate> {
    if frame.id != STATUS_FRAME_ID {
        debug!("Ignoring frame 0x{:08X}: not a status frame", frame.id);
        return Vec::new();
    }

    match format {
        StatusFormat::Batch => decode_batch(&frame.payload, indicator_count),
        StatusFormat::Single => decode_single(&frame.payload, indicator_count).into_iter().collect(),
    }
}

/// Batch format: indicator `i` reads the high nibble of byte `i / 2` when
/// `i` is even and the low nibble when odd.
///
/// # Examples
///
/// ```
/// use joycan_bridge::can::decoder::{decode_batch, LedTarget};
///
/// let updates = decode_batch(&[0x01, 0x20, 0x00, 0x00, 0x00], 9);
/// assert_eq!(updates[1].target, LedTarget::Off);
/// assert_eq!(updates[2].target, LedTarget::SlowBlink);
/// ```
pub fn decode_batch(payload: &[u8], indicator_count: usize) -> Vec<StatusUpdate> {
    (0..indicator_count.min(STATUS_MAX_INDICATORS))
        .map_while(|index| {
            let byte = *payload.get(index / 2)?;
            let code = if index % 2 == 1 { byte & 0x0F } else { (byte >> 4) & 0x0F };
            Some(StatusUpdate {
                index,
                target: LedTarget::from_code(code),
            })
        })
        .collect()
}

/// Single-update format: byte0 is the 1-based indicator index, the high
/// nibble of byte1 is `0` for on and anything else for off.
pub fn decode_single(payload: &[u8], indicator_count: usize) -> Option<StatusUpdate> {
    let (&key, &state) = match payload {
        [key, state, ..] => (key, state),
        _ => {
            debug!("Single status payload too short: {} bytes", payload.len());
            return None;
        }
    };

    let index = usize::from(key).checked_sub(1)?;
    if index >= indicator_count {
        debug!("Single status index {} out of range (have {})", key, indicator_count);
        return None;
    }

    let target = if (state >> 4) & 0x0F == 0 { LedTarget::On } else { LedTarget::Off };
    Some(StatusUpdate { index, target })
}
