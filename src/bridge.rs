//! # Bridge Scheduler
//!
//! Runs the transmit and receive paths cooperatively on one task.
//!
//! ```text
//! transmit:  AxisSampler x2 + ButtonBank -> encoder -> transport.send -> pace
//! receive:   transport.poll -> CanFilterSet -> decoder -> LedStateMachine
//! tick:      LedStateMachine::tick (shared by every blinking indicator)
//! ```
//!
//! A transport failure abandons the current cycle only; the next cycle
//! recomputes everything from fresh readings.

use std::future::Future;

use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::can::decoder::{decode_status_frame, StatusFormat};
use crate::can::encoder::encode_joystick_frame;
use crate::can::filter::CanFilterSet;
use crate::can::protocol::{JoystickFrame, Resolution};
use crate::config::Config;
use crate::error::Result;
use crate::joystick::buttons::{ButtonBank, ButtonReader};
use crate::joystick::sampler::{Axis, AxisReader, AxisSampler};
use crate::led::state_machine::{IndicatorOutput, LedStateMachine};
use crate::transport::port_trait::CanTransport;

/// Running totals, logged periodically and on shutdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    pub frames_sent: u64,
    pub send_failures: u64,
    pub frames_received: u64,
    pub frames_rejected: u64,
    pub status_updates: u64,
    pub poll_failures: u64,
}

/// Hardware-facing collaborators of the bridge
pub struct Peripherals<A, B, O> {
    pub axes: A,
    pub buttons: B,
    pub indicators: O,
}

/// Joystick-to-CAN bridge
pub struct Bridge<T, A, B, O> {
    transport: T,
    peripherals: Peripherals<A, B, O>,
    x: AxisSampler,
    y: AxisSampler,
    buttons: ButtonBank,
    leds: LedStateMachine,
    filters: CanFilterSet,
    resolution: Resolution,
    status_format: StatusFormat,
    pacing: Duration,
    poll_interval: Duration,
    led_tick: Duration,
    status_interval: u64,
    stats: BridgeStats,
}

impl<T, A, B, O> Bridge<T, A, B, O>
where
    T: CanTransport,
    A: AxisReader,
    B: ButtonReader,
    O: IndicatorOutput,
{
    /// Build a bridge from validated configuration.
    ///
    /// Indicators are driven to their initial state immediately.
    pub fn new(config: &Config, transport: T, mut peripherals: Peripherals<A, B, O>) -> Self {
        let leds = LedStateMachine::new(
            config.leds.pins.clone(),
            config.leds.initial_on,
            Instant::now().into_std(),
        );
        leds.initialize(&mut peripherals.indicators);

        Self {
            transport,
            peripherals,
            x: AxisSampler::new(Axis::X, config.joystick.x),
            y: AxisSampler::new(Axis::Y, config.joystick.y),
            buttons: ButtonBank::new(config.buttons.pins.clone()),
            leds,
            filters: CanFilterSet::new(config.can.filters.clone()),
            resolution: config.joystick.resolution,
            status_format: config.can.status_format,
            pacing: Duration::from_millis(config.joystick.pacing_ms),
            poll_interval: Duration::from_millis(config.can.poll_interval_ms),
            led_tick: Duration::from_millis(config.leds.tick_ms.max(1)),
            status_interval: config.logging.status_interval_frames.max(1),
            stats: BridgeStats::default(),
        }
    }

    pub fn stats(&self) -> BridgeStats {
        self.stats
    }

    pub fn leds(&self) -> &LedStateMachine {
        &self.leds
    }

    pub fn peripherals(&self) -> &Peripherals<A, B, O> {
        &self.peripherals
    }

    /// Release the transport and peripherals
    pub fn into_parts(self) -> (T, Peripherals<A, B, O>) {
        (self.transport, self.peripherals)
    }

    /// Sample the joystick and encode one frame without sending it
    pub fn sample_frame(&mut self) -> JoystickFrame {
        let x = self.x.sample(&mut self.peripherals.axes);
        let y = self.y.sample(&mut self.peripherals.axes);
        let buttons = self.buttons.read_all(&mut self.peripherals.buttons);
        encode_joystick_frame(x, y, &buttons, self.resolution)
    }

    /// Run one transmit cycle: sample, encode, send.
    ///
    /// # Errors
    ///
    /// Returns the transport error; the frame is dropped, not retried.
    pub async fn transmit_once(&mut self) -> Result<()> {
        let frame = self.sample_frame();

        if let Err(e) = self.transport.send(&frame.to_can_frame()).await {
            self.stats.send_failures += 1;
            return Err(e);
        }

        self.stats.frames_sent += 1;
        if self.stats.frames_sent % self.status_interval == 0 {
            info!(
                "Sent {} frames (last payload {:02X?}, {} send failures)",
                self.stats.frames_sent,
                frame.payload(),
                self.stats.send_failures
            );
        }
        Ok(())
    }

    /// Run one receive cycle: drain the transport and apply accepted status frames.
    ///
    /// # Returns
    ///
    /// Number of status updates applied
    ///
    /// # Errors
    ///
    /// Returns the transport error; indicator state is left unchanged.
    pub async fn receive_once(&mut self, now: std::time::Instant) -> Result<usize> {
        let frames = match self.transport.poll().await {
            Ok(frames) => frames,
            Err(e) => {
                self.stats.poll_failures += 1;
                return Err(e);
            }
        };

        let mut applied = 0;
        for frame in frames {
            self.stats.frames_received += 1;

            if !self.filters.accepts(&frame) {
                self.stats.frames_rejected += 1;
                debug!("Rejected frame 0x{:08X}", frame.id);
                continue;
            }

            let updates = decode_status_frame(&frame, self.status_format, self.leds.len());
            self.leds.apply_updates(&updates, now, &mut self.peripherals.indicators);
            applied += updates.len();
        }

        self.stats.status_updates += applied as u64;
        Ok(applied)
    }

    /// Advance blinking indicators; returns how many toggled
    pub fn tick_leds(&mut self, now: std::time::Instant) -> usize {
        self.leds.tick(now, &mut self.peripherals.indicators)
    }

    /// Run until `shutdown` completes.
    ///
    /// Transmission and the receive poll each re-arm a sleep after every
    /// attempt, so a zero pacing or poll interval only yields to the other
    /// branches. The LED tick runs on its own interval.
    pub async fn run<F: Future<Output = ()>>(&mut self, shutdown: F) -> BridgeStats {
        let mut tick = time::interval(self.led_tick);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let pace = time::sleep(Duration::ZERO);
        let poll = time::sleep(Duration::ZERO);
        tokio::pin!(pace);
        tokio::pin!(poll);
        tokio::pin!(shutdown);

        info!(
            "Bridge running: pacing {:?}, poll {:?}, {} filter(s), {:?} status format",
            self.pacing,
            self.poll_interval,
            self.filters.len(),
            self.status_format
        );

        loop {
            tokio::select! {
                _ = &mut pace => {
                    if let Err(e) = self.transmit_once().await {
                        warn!("Transmit failed: {}", e);
                    }
                    pace.as_mut().reset(Instant::now() + self.pacing);
                }

                _ = &mut poll => {
                    if let Err(e) = self.receive_once(Instant::now().into_std()).await {
                        warn!("Receive failed: {}", e);
                    }
                    poll.as_mut().reset(Instant::now() + self.poll_interval);
                }

                _ = tick.tick() => {
                    self.tick_leds(Instant::now().into_std());
                }

                _ = &mut shutdown => {
                    info!("Shutting down...");
                    break;
                }
            }
        }

        let stats = self.stats;
        info!(
            "Total frames sent: {} ({} failed), received: {} ({} rejected), status updates: {}",
            stats.frames_sent,
            stats.send_failures,
            stats.frames_received,
            stats.frames_rejected,
            stats.status_updates
        );
        stats
    }
}
