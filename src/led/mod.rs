//! # LED Module
//!
//! Indicator handling for the status LEDs on the handle.
//!
//! This module handles:
//! - Applying decoded status targets to indicators
//! - Non-blocking blinking driven by one shared tick

pub mod state_machine;
