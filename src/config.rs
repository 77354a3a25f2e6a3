//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every build variant of the handle (pin assignment, sampling window,
//! dead zone, resolution, button and LED counts, status format) is one
//! configuration file rather than its own program.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::can::decoder::StatusFormat;
use crate::can::filter::CanFilter;
use crate::can::protocol::{
    Resolution, CAN_EXTENDED_ID_MAX, CAN_STANDARD_ID_MAX, JOYSTICK_MAX_BUTTONS, STATUS_MAX_INDICATORS,
};
use crate::can::slcan::SLCAN_BITRATES;
use crate::error::{BridgeError, Result};
use crate::joystick::sampler::AxisConfig;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub joystick: JoystickConfig,
    #[serde(default)]
    pub buttons: ButtonConfig,
    #[serde(default)]
    pub leds: LedConfig,
    #[serde(default)]
    pub can: CanConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// SLCAN adapter configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    /// Adapter device path; empty = auto-detect
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// CAN bus bitrate in bit/s
    #[serde(default = "default_bitrate")]
    pub bitrate: u32,
}

/// Joystick sampling and telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct JoystickConfig {
    #[serde(default = "default_resolution")]
    pub resolution: Resolution,

    #[serde(default = "default_x_axis")]
    pub x: AxisConfig,

    #[serde(default = "default_y_axis")]
    pub y: AxisConfig,

    /// Pause after each telemetry frame
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
}

/// Push button configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ButtonConfig {
    /// Input pins in frame order (button 1 first)
    #[serde(default = "default_button_pins")]
    pub pins: Vec<u8>,
}

/// Indicator configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LedConfig {
    /// Output pins in status order (indicator 1 first)
    #[serde(default = "default_led_pins")]
    pub pins: Vec<u8>,

    /// Start with every indicator lit
    #[serde(default = "default_initial_on")]
    pub initial_on: bool,

    /// Shared blink tick period
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

/// Inbound CAN configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CanConfig {
    #[serde(default)]
    pub status_format: StatusFormat,

    #[serde(default = "default_filters")]
    pub filters: Vec<CanFilter>,

    /// Pause between receive polls; 0 re-polls after a bare yield
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Directory for daily log files; console only when unset
    #[serde(default)]
    pub dir: Option<String>,

    /// Frames between status log messages
    #[serde(default = "default_status_interval_frames")]
    pub status_interval_frames: u64,
}

// Default value functions
fn default_baud_rate() -> u32 { 115_200 }
fn default_bitrate() -> u32 { 250_000 }

fn default_resolution() -> Resolution { Resolution::Bits12 }
fn default_x_axis() -> AxisConfig {
    AxisConfig { center: 32768, dead_zone: 3000, window: 2000, rank: 1000, inverted: true }
}
fn default_y_axis() -> AxisConfig {
    AxisConfig { center: 32768, dead_zone: 3000, window: 10, rank: 5, inverted: false }
}
fn default_pacing_ms() -> u64 { 100 }

fn default_button_pins() -> Vec<u8> { vec![2, 1, 0, 5, 3, 4] }

fn default_led_pins() -> Vec<u8> { vec![11, 10, 9, 14, 8, 12, 13, 7, 6] }
fn default_initial_on() -> bool { true }
fn default_tick_ms() -> u64 { 20 }

fn default_filters() -> Vec<CanFilter> {
    vec![
        CanFilter::new(0x00EF_0002, 0xFF, true),
        CanFilter::new(0x666, 0xFFF, true),
    ]
}
fn default_poll_interval_ms() -> u64 { 0 }

fn default_status_interval_frames() -> u64 { 100 }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: default_baud_rate(),
            bitrate: default_bitrate(),
        }
    }
}

impl Default for JoystickConfig {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            x: default_x_axis(),
            y: default_y_axis(),
            pacing_ms: default_pacing_ms(),
        }
    }
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self { pins: default_button_pins() }
    }
}

impl Default for LedConfig {
    fn default() -> Self {
        Self {
            pins: default_led_pins(),
            initial_on: default_initial_on(),
            tick_ms: default_tick_ms(),
        }
    }
}

impl Default for CanConfig {
    fn default() -> Self {
        Self {
            status_format: StatusFormat::default(),
            filters: default_filters(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            status_interval_frames: default_status_interval_frames(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            joystick: JoystickConfig::default(),
            buttons: ButtonConfig::default(),
            leds: LedConfig::default(),
            can: CanConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> BridgeError {
    BridgeError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use joycan_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if !SLCAN_BITRATES.iter().any(|&(rate, _)| rate == self.serial.bitrate) {
            return Err(invalid(format!(
                "bitrate {} is not supported (10000, 20000, 50000, 100000, 125000, 250000, 500000, 800000, 1000000)",
                self.serial.bitrate
            )));
        }

        if self.serial.baud_rate == 0 {
            return Err(invalid("baud_rate must be greater than 0"));
        }

        for (name, axis) in [("joystick.x", &self.joystick.x), ("joystick.y", &self.joystick.y)] {
            axis.validate().map_err(|e| invalid(format!("{}: {}", name, e)))?;
        }

        if self.joystick.pacing_ms > 1000 {
            return Err(invalid("pacing_ms must be between 0 and 1000"));
        }

        if self.buttons.pins.is_empty() || self.buttons.pins.len() > JOYSTICK_MAX_BUTTONS {
            return Err(invalid(format!(
                "buttons.pins must list between 1 and {} pins",
                JOYSTICK_MAX_BUTTONS
            )));
        }

        if self.leds.pins.is_empty() || self.leds.pins.len() > STATUS_MAX_INDICATORS {
            return Err(invalid(format!(
                "leds.pins must list between 1 and {} pins",
                STATUS_MAX_INDICATORS
            )));
        }

        if self.leds.tick_ms == 0 || self.leds.tick_ms > 100 {
            return Err(invalid("leds.tick_ms must be between 1 and 100"));
        }

        if self.can.filters.is_empty() {
            return Err(invalid("can.filters must contain at least one filter"));
        }

        for filter in &self.can.filters {
            let limit = if filter.extended { CAN_EXTENDED_ID_MAX } else { CAN_STANDARD_ID_MAX };
            if filter.address > limit || filter.mask > limit {
                return Err(invalid(format!(
                    "filter (0x{:X}, 0x{:X}) does not fit {} addressing",
                    filter.address,
                    filter.mask,
                    if filter.extended { "extended" } else { "standard" }
                )));
            }
        }

        if self.can.poll_interval_ms > 1000 {
            return Err(invalid("can.poll_interval_ms must be between 0 and 1000"));
        }

        if self.logging.status_interval_frames == 0 {
            return Err(invalid("logging.status_interval_frames must be greater than 0"));
        }

        if matches!(&self.logging.dir, Some(dir) if dir.is_empty()) {
            return Err(invalid("logging.dir cannot be empty when set"));
        }

        Ok(())
    }
}
