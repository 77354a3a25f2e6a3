//! # LED State Machine
//!
//! Tracks the visible state of every indicator and advances blinking ones
//! from a single shared periodic tick.
//!
//! ## States
//!
//! | Target | State | Output |
//! |--------|-------|--------|
//! | `Off` | `Steady(false)` | off |
//! | `On` | `Steady(true)` | on |
//! | `Fallback(v)` | `Steady(v)` | `v` |
//! | `SlowBlink` | `Blinking(1.0 s)` | phase |
//! | `MedBlink` | `Blinking(0.5 s)` | phase |
//! | `FastBlink` | `Blinking(0.1 s)` | phase |
//!
//! Ticks never block: each call flips at most once per indicator whose
//! period has elapsed since its last toggle.

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::can::decoder::{LedTarget, StatusUpdate};

/// Slow blink half-period
pub const SLOW_BLINK_PERIOD: Duration = Duration::from_millis(1000);
/// Medium blink half-period
pub const MED_BLINK_PERIOD: Duration = Duration::from_millis(500);
/// Fast blink half-period
pub const FAST_BLINK_PERIOD: Duration = Duration::from_millis(100);

/// Physical indicator output, implemented by the hardware layer.
#[cfg_attr(test, mockall::automock)]
pub trait IndicatorOutput {
    /// Drive indicator `id` on or off.
    fn set(&mut self, id: u8, on: bool);
}

/// Visible behaviour of one indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedMode {
    Steady(bool),
    Blinking(Duration),
}

impl LedTarget {
    /// State entered when this target is applied
    #[must_use]
    pub fn mode(self) -> LedMode {
        match self {
            LedTarget::Off => LedMode::Steady(false),
            LedTarget::On => LedMode::Steady(true),
            LedTarget::Fallback(on) => LedMode::Steady(on),
            LedTarget::SlowBlink => LedMode::Blinking(SLOW_BLINK_PERIOD),
            LedTarget::MedBlink => LedMode::Blinking(MED_BLINK_PERIOD),
            LedTarget::FastBlink => LedMode::Blinking(FAST_BLINK_PERIOD),
        }
    }
}

/// Per-indicator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedState {
    /// Last applied target
    pub target: LedTarget,
    /// Visible output (the blink phase while blinking)
    pub phase: bool,
    /// When `phase` last changed because of a blink or a target change
    pub last_toggle: Instant,
}

impl LedState {
    fn steady(on: bool, now: Instant) -> Self {
        Self {
            target: if on { LedTarget::On } else { LedTarget::Off },
            phase: on,
            last_toggle: now,
        }
    }

    pub fn mode(&self) -> LedMode {
        self.target.mode()
    }

    /// Current visible output
    pub fn output(&self) -> bool {
        self.phase
    }
}

/// Owns every indicator's state. Mutated only by decoded updates and ticks.
#[derive(Debug, Clone)]
pub struct LedStateMachine {
    pins: Vec<u8>,
    states: Vec<LedState>,
}

impl LedStateMachine {
    /// Creates the machine with every indicator `Steady(initial_on)`.
    ///
    /// Call [`LedStateMachine::initialize`] to drive the outputs once.
    #[must_use]
    pub fn new(pins: Vec<u8>, initial_on: bool, now: Instant) -> Self {
        let states = vec![LedState::steady(initial_on, now); pins.len()];
        Self { pins, states }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn state(&self, index: usize) -> Option<&LedState> {
        self.states.get(index)
    }

    /// Visible output of indicator `index`
    pub fn output(&self, index: usize) -> Option<bool> {
        self.states.get(index).map(LedState::output)
    }

    /// Write the current output of every indicator.
    pub fn initialize<O: IndicatorOutput + ?Sized>(&self, output: &mut O) {
        for (pin, state) in self.pins.iter().zip(&self.states) {
            output.set(*pin, state.output());
        }
    }

    /// Apply a decoded target to indicator `index`.
    ///
    /// A target different from the current one replaces the state: steady
    /// targets take their value, blink targets start from the current output
    /// with the toggle timer reset to `now`. Re-sending the current target
    /// leaves a running blink undisturbed.
    pub fn apply<O: IndicatorOutput + ?Sized>(
        &mut self,
        index: usize,
        target: LedTarget,
        now: Instant,
        output: &mut O,
    ) {
        let Some(state) = self.states.get_mut(index) else {
            debug!("Ignoring target {:?} for missing indicator {}", target, index);
            return;
        };

        if state.target == target {
            return;
        }

        debug!("Indicator {}: {:?} -> {:?}", index, state.target, target);
        state.target = target;
        state.last_toggle = now;

        if let LedMode::Steady(on) = target.mode() {
            if state.phase != on {
                state.phase = on;
                output.set(self.pins[index], on);
            }
        }
    }

    /// Apply every update from one decoded status frame.
    pub fn apply_updates<O: IndicatorOutput + ?Sized>(
        &mut self,
        updates: &[StatusUpdate],
        now: Instant,
        output: &mut O,
    ) {
        for update in updates {
            self.apply(update.index, update.target, now, output);
        }
    }

    /// Advance blinking indicators.
    ///
    /// Each blinking indicator whose period has elapsed since its last toggle
    /// flips exactly once, however late the tick is.
    ///
    /// # Returns
    ///
    /// Number of indicators toggled
    pub fn tick<O: IndicatorOutput + ?Sized>(&mut self, now: Instant, output: &mut O) -> usize {
        let mut toggled = 0;

        for (pin, state) in self.pins.iter().zip(self.states.iter_mut()) {
            let LedMode::Blinking(period) = state.mode() else {
                continue;
            };

            if now.saturating_duration_since(state.last_toggle) >= period {
                state.phase = !state.phase;
                state.last_toggle = now;
                output.set(*pin, state.phase);
                toggled += 1;
            }
        }

        if toggled > 0 {
            trace!("LED tick toggled {} indicator(s)", toggled);
        }
        toggled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    /// Records every write for inspection
    #[derive(Default)]
    struct RecordingOutput {
        writes: Vec<(u8, bool)>,
    }

    impl IndicatorOutput for RecordingOutput {
        fn set(&mut self, id: u8, on: bool) {
            self.writes.push((id, on));
        }
    }

    fn pins() -> Vec<u8> {
        vec![11, 10, 9, 14, 8, 12, 13, 7, 6]
    }

    #[test]
    fn test_initial_state_dark() {
        let now = Instant::now();
        let leds = LedStateMachine::new(pins(), false, now);
        assert_eq!(leds.len(), 9);
        assert!((0..9).all(|i| leds.output(i) == Some(false)));
        assert_eq!(leds.state(0).unwrap().mode(), LedMode::Steady(false));
    }

    #[test]
    fn test_initialize_writes_every_pin() {
        let now = Instant::now();
        let leds = LedStateMachine::new(pins(), true, now);
        let mut out = RecordingOutput::default();
        leds.initialize(&mut out);
        assert_eq!(out.writes.len(), 9);
        assert!(out.writes.iter().all(|&(_, on)| on));
        assert_eq!(out.writes[0].0, 11);
    }

    #[test]
    fn test_steady_targets() {
        let now = Instant::now();
        let mut leds = LedStateMachine::new(pins(), false, now);
        let mut out = RecordingOutput::default();

        leds.apply(0, LedTarget::On, now, &mut out);
        leds.apply(1, LedTarget::Fallback(true), now, &mut out);
        leds.apply(2, LedTarget::Off, now, &mut out);

        assert_eq!(leds.output(0), Some(true));
        assert_eq!(leds.output(1), Some(true));
        assert_eq!(leds.output(2), Some(false));
        // Indicator 2 was already off: no write
        assert_eq!(out.writes, vec![(11, true), (10, true)]);
    }

    #[test]
    fn test_blink_starts_from_current_output() {
        let now = Instant::now();
        let mut leds = LedStateMachine::new(pins(), true, now);
        let mut out = RecordingOutput::default();

        leds.apply(3, LedTarget::FastBlink, now, &mut out);
        let state = leds.state(3).unwrap();
        assert_eq!(state.mode(), LedMode::Blinking(FAST_BLINK_PERIOD));
        assert!(state.phase);
        assert_eq!(state.last_toggle, now);
        assert!(out.writes.is_empty());
    }

    #[test]
    fn test_late_tick_flips_once() {
        let start = Instant::now();
        let mut leds = LedStateMachine::new(pins(), false, start);
        let mut out = RecordingOutput::default();

        leds.apply(2, LedTarget::SlowBlink, start, &mut out);
        let now = start + Duration::from_millis(1100);
        assert_eq!(leds.tick(now, &mut out), 1);
        assert_eq!(leds.output(2), Some(true));
        assert_eq!(leds.state(2).unwrap().last_toggle, now);
        assert_eq!(out.writes, vec![(9, true)]);

        // Next tick half a second later is too early for a 1 s period
        assert_eq!(leds.tick(now + Duration::from_millis(500), &mut out), 0);
        assert_eq!(leds.output(2), Some(true));
    }

    #[test]
    fn test_tick_before_period_does_nothing() {
        let start = Instant::now();
        let mut leds = LedStateMachine::new(pins(), false, start);
        let mut out = RecordingOutput::default();

        leds.apply(0, LedTarget::MedBlink, start, &mut out);
        assert_eq!(leds.tick(start + Duration::from_millis(499), &mut out), 0);
        assert_eq!(leds.tick(start + Duration::from_millis(500), &mut out), 1);
        assert_eq!(leds.output(0), Some(true));
    }

    #[test]
    fn test_fast_blink_toggles_every_period() {
        let start = Instant::now();
        let mut leds = LedStateMachine::new(pins(), false, start);
        let mut out = RecordingOutput::default();

        leds.apply(4, LedTarget::FastBlink, start, &mut out);
        for step in 1..=4u64 {
            leds.tick(start + FAST_BLINK_PERIOD * step as u32, &mut out);
        }
        assert_eq!(out.writes, vec![(8, true), (8, false), (8, true), (8, false)]);
    }

    #[test]
    fn test_repeated_target_keeps_blink_running() {
        let start = Instant::now();
        let mut leds = LedStateMachine::new(pins(), false, start);
        let mut out = RecordingOutput::default();

        leds.apply(0, LedTarget::SlowBlink, start, &mut out);
        leds.apply(0, LedTarget::SlowBlink, start + Duration::from_millis(900), &mut out);
        assert_eq!(leds.tick(start + Duration::from_millis(1000), &mut out), 1);
    }

    #[test]
    fn test_steady_after_blink_stops_toggling() {
        let start = Instant::now();
        let mut leds = LedStateMachine::new(pins(), false, start);
        let mut out = RecordingOutput::default();

        leds.apply(0, LedTarget::FastBlink, start, &mut out);
        leds.tick(start + FAST_BLINK_PERIOD, &mut out);
        leds.apply(0, LedTarget::Off, start + FAST_BLINK_PERIOD, &mut out);
        assert_eq!(leds.output(0), Some(false));
        assert_eq!(leds.tick(start + Duration::from_secs(5), &mut out), 0);
    }

    #[test]
    fn test_missing_indicator_ignored() {
        let now = Instant::now();
        let mut leds = LedStateMachine::new(vec![1, 2], false, now);
        let mut out = MockIndicatorOutput::new();
        out.expect_set().never();
        leds.apply(5, LedTarget::On, now, &mut out);
    }

    #[test]
    fn test_apply_updates_drives_output() {
        let now = Instant::now();
        let mut leds = LedStateMachine::new(vec![6, 7], false, now);
        let mut out = MockIndicatorOutput::new();
        out.expect_set().with(eq(7), eq(true)).times(1).return_const(());

        let updates = [
            StatusUpdate { index: 0, target: LedTarget::Off },
            StatusUpdate { index: 1, target: LedTarget::On },
        ];
        leds.apply_updates(&updates, now, &mut out);
    }
}
