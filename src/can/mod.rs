//! # CAN Protocol Module
//!
//! Wire formats exchanged with the drive head unit.
//!
//! This module handles:
//! - Joystick telemetry encoding (ID 0x18FDD6F1, 8 bytes, bit-exact layout)
//! - LED status decoding (ID 0x18EFF102, batch and single-update formats)
//! - Acceptance filtering of inbound frames
//! - SLCAN line encoding for serial CAN adapters

pub mod protocol;
pub mod filter;
pub mod encoder;
pub mod decoder;
pub mod slcan;
