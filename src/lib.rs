//! # JoyCAN Bridge Library
//!
//! Bridge a two-axis joystick and its push buttons to a marine drive head
//! unit over CAN.
//!
//! This library provides the joystick sampling, the bit-exact joystick
//! telemetry frame, the LED status decoder and the blink state machine, plus
//! an SLCAN transport and the cooperative scheduler that ties them together.

pub mod config;
pub mod error;
pub mod can;
pub mod joystick;
pub mod led;
pub mod transport;
pub mod bridge;
