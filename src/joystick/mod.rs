//! # Joystick Module
//!
//! Hand controller input handling.
//!
//! This module handles:
//! - Oversampling the two analog axes and picking a noise-robust value
//! - Dead-zone clamping and axis inversion
//! - Reading the active-low push buttons

pub mod buttons;
pub mod sampler;
