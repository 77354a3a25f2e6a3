//! # Axis Sampler
//!
//! Turns a window of noisy ADC readings into one value per axis.
//!
//! ## Order Statistic
//!
//! Each cycle reads `window` raw samples and keeps the one at position
//! `rank` in ascending order. `rank = window / 2` approximates the median;
//! shorter windows trade noise rejection for responsiveness.
//!
//! | window | rank | Behaviour |
//! |--------|------|-----------|
//! | 2000 | 1000 | Median, heavy filtering |
//! | 500 | 250 | Median |
//! | 10 | 5 | Slightly above median, fast |
//!
//! ## Dead Zone
//!
//! A selected value closer than `dead_zone` to `center` is snapped to
//! `center`; anything else passes through unchanged.
//!
//! ## Usage
//!
//! ```
//! use joycan_bridge::joystick::sampler::{sample_window, AxisConfig};
//!
//! let config = AxisConfig { center: 32768, dead_zone: 1000, window: 3, rank: 1, inverted: false };
//! assert_eq!(sample_window(&config, [40000, 10, 33000]), 32768);
//! ```

use serde::Deserialize;

use crate::can::protocol::{AXIS_FULL_SCALE, AXIS_RAW_CENTER};

/// Joystick axis selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

/// Raw ADC access, implemented by the hardware layer.
#[cfg_attr(test, mockall::automock)]
pub trait AxisReader {
    /// One raw full-scale sample (0-65535).
    fn read_axis(&mut self, axis: Axis) -> u16;
}

/// Sampling parameters for one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AxisConfig {
    /// Raw value treated as centered
    #[serde(default = "default_center")]
    pub center: u16,

    /// Half-width of the band snapped to `center`
    #[serde(default = "default_dead_zone")]
    pub dead_zone: u16,

    /// Readings per cycle
    #[serde(default = "default_window")]
    pub window: u32,

    /// Sorted position kept from the window (`rank < window`)
    #[serde(default = "default_rank")]
    pub rank: u32,

    /// Read the axis as `65536 - raw`
    #[serde(default)]
    pub inverted: bool,
}

fn default_center() -> u16 { AXIS_RAW_CENTER }
fn default_dead_zone() -> u16 { 3000 }
fn default_window() -> u32 { 10 }
fn default_rank() -> u32 { 5 }

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            center: default_center(),
            dead_zone: default_dead_zone(),
            window: default_window(),
            rank: default_rank(),
            inverted: false,
        }
    }
}

impl AxisConfig {
    /// Checks `0 <= rank < window`.
    pub fn validate(&self) -> Result<(), String> {
        if self.window == 0 {
            return Err("window must be greater than 0".to_string());
        }
        if self.rank >= self.window {
            return Err(format!("rank {} must be less than window {}", self.rank, self.window));
        }
        Ok(())
    }

    /// Applies inversion to one raw reading; `65536 - 0` saturates to 65535.
    #[inline]
    fn orient(&self, raw: u16) -> u16 {
        if self.inverted {
            (AXIS_FULL_SCALE - u32::from(raw)).min(u32::from(u16::MAX)) as u16
        } else {
            raw
        }
    }

    /// Applies the dead zone to a selected value.
    #[inline]
    fn apply_dead_zone(&self, value: u16) -> u16 {
        if value.abs_diff(self.center) < self.dead_zone {
            self.center
        } else {
            value
        }
    }
}

/// Select the configured order statistic from a window of readings.
///
/// Pure function of the readings and `config`. A window shorter than
/// `config.window` uses whatever was supplied, with `rank` clamped to the
/// last element; an empty window yields `center`.
pub fn sample_window<I>(config: &AxisConfig, readings: I) -> u16
where
    I: IntoIterator<Item = u16>,
{
    let mut buffer: Vec<u16> = readings
        .into_iter()
        .take(config.window as usize)
        .map(|raw| config.orient(raw))
        .collect();
    select(config, &mut buffer)
}

fn select(config: &AxisConfig, buffer: &mut [u16]) -> u16 {
    if buffer.is_empty() {
        return config.center;
    }

    let rank = (config.rank as usize).min(buffer.len() - 1);
    let (_, &mut selected, _) = buffer.select_nth_unstable(rank);
    config.apply_dead_zone(selected)
}

/// Stateless sampler for one axis; the scratch buffer is reused between
/// cycles so a 2000-sample window does not allocate every time.
#[derive(Debug, Clone)]
pub struct AxisSampler {
    axis: Axis,
    config: AxisConfig,
    buffer: Vec<u16>,
}

impl AxisSampler {
    #[must_use]
    pub fn new(axis: Axis, config: AxisConfig) -> Self {
        Self {
            axis,
            config,
            buffer: Vec::with_capacity(config.window as usize),
        }
    }

    /// Read one window from `reader` and resolve it.
    ///
    /// Cost is dominated by reading the window; selection is linear.
    pub fn sample<R: AxisReader + ?Sized>(&mut self, reader: &mut R) -> u16 {
        self.buffer.clear();
        for _ in 0..self.config.window {
            let raw = reader.read_axis(self.axis);
            self.buffer.push(self.config.orient(raw));
        }
        select(&self.config, &mut self.buffer)
    }
}
