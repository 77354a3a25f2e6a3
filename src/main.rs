//! # JoyCAN Bridge
//!
//! Bridge a two-axis joystick and its push buttons to a marine drive head
//! unit over CAN, and mirror the head unit's status on the handle's LEDs.
//!
//! Usage: `joycan-bridge [CONFIG]` (default `config/default.toml`).

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use joycan_bridge::bridge::{Bridge, Peripherals};
use joycan_bridge::can::protocol::AXIS_RAW_CENTER;
use joycan_bridge::config::{Config, LoggingConfig};
use joycan_bridge::joystick::buttons::ButtonReader;
use joycan_bridge::joystick::sampler::{Axis, AxisReader};
use joycan_bridge::led::state_machine::IndicatorOutput;
use joycan_bridge::transport::SlcanTransport;

/// Configuration file used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Log file name prefix inside `[logging] dir`
const LOG_FILE_PREFIX: &str = "joycan-bridge.log";

/// Axis input for hosts without an ADC: the stick rests at center
struct CenteredAxes;

impl AxisReader for CenteredAxes {
    fn read_axis(&mut self, _axis: Axis) -> u16 {
        AXIS_RAW_CENTER
    }
}

/// Button input for hosts without GPIO: every pull-up reads high
struct ReleasedButtons;

impl ButtonReader for ReleasedButtons {
    fn read_button(&mut self, _pin: u8) -> bool {
        true
    }
}

/// Indicator output for hosts without GPIO: changes go to the log
struct LoggingIndicators;

impl IndicatorOutput for LoggingIndicators {
    fn set(&mut self, id: u8, on: bool) {
        debug!("LED pin {} -> {}", id, if on { "on" } else { "off" });
    }
}

/// Level filter from `RUST_LOG`-style directives, `info` when none are given
fn build_filter(directives: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .parse_lossy(directives.unwrap_or_default())
}

/// Set up console logging plus an optional daily rolling file
///
/// The returned guard flushes the file writer and must live until exit.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let (file_layer, guard) = match &config.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::registry()
        .with(build_filter(directives.as_deref()))
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

/// Resolve the configuration path from the command line
fn config_path(args: &[String]) -> Option<&str> {
    args.get(1).map(String::as_str)
}

fn load_config(path: Option<&str>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path).with_context(|| format!("Failed to load {}", path)),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("Failed to load {}", DEFAULT_CONFIG_PATH)),
        None => Ok(Config::default()),
    }
}

/// Main entry point for JoyCAN Bridge application
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration and set up logging
///    - Open the SLCAN adapter and the CAN channel
///
/// 2. **Main Loop**
///    - Transmit joystick telemetry, paced per configuration
///    - Poll for status frames and drive the indicators
///    - Handle Ctrl+C for graceful shutdown
///
/// 3. **Graceful Shutdown**
///    - Log totals and close the CAN channel
///
/// # Errors
///
/// Returns error if:
/// - The configuration cannot be loaded or is invalid
/// - No SLCAN adapter can be opened or set up
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let config = load_config(config_path(&args))?;
    let _log_guard = init_logging(&config.logging);

    info!("JoyCAN Bridge v{} starting...", env!("CARGO_PKG_VERSION"));
    info!(
        "{:?} resolution, {} button(s), {} LED(s)",
        config.joystick.resolution,
        config.buttons.pins.len(),
        config.leds.pins.len()
    );

    let mut transport = SlcanTransport::open(&config.serial.port, config.serial.baud_rate)?;
    info!("SLCAN adapter opened at: {}", transport.device_path());
    transport.start(config.serial.bitrate).await?;

    let peripherals = Peripherals {
        axes: CenteredAxes,
        buttons: ReleasedButtons,
        indicators: LoggingIndicators,
    };
    let mut bridge = Bridge::new(&config, transport, peripherals);

    info!("Press Ctrl+C to exit");
    bridge
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl+C: {}", e);
            }
        })
        .await;

    let (mut transport, _) = bridge.into_parts();
    if transport.adapter_errors() > 0 {
        warn!("Adapter reported {} error(s)", transport.adapter_errors());
    }
    if let Err(e) = transport.stop().await {
        warn!("Failed to close CAN channel: {}", e);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_from_args() {
        let args = vec!["joycan-bridge".to_string(), "custom.toml".to_string()];
        assert_eq!(config_path(&args), Some("custom.toml"));
        assert_eq!(config_path(&args[..1]), None);
    }

    #[test]
    fn test_explicit_missing_config_fails() {
        assert!(load_config(Some("/nonexistent/joycan.toml")).is_err());
    }

    #[test]
    fn test_load_explicit_config() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[joystick]\npacing_ms = 50\n").unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path().to_str()).unwrap();
        assert_eq!(config.joystick.pacing_ms, 50);
    }

    #[test]
    fn test_log_filter_defaults_to_info() {
        assert_eq!(build_filter(None).to_string(), "info");
        assert_eq!(build_filter(Some("")).to_string(), "info");
    }

    #[test]
    fn test_log_filter_follows_rust_log() {
        assert_eq!(build_filter(Some("debug")).to_string(), "debug");
        assert_eq!(build_filter(Some("warn")).to_string(), "warn");
        assert!(build_filter(Some("joycan_bridge=trace"))
            .to_string()
            .contains("joycan_bridge=trace"));
    }

    #[test]
    fn test_host_stand_ins() {
        assert_eq!(CenteredAxes.read_axis(Axis::X), 32768);
        assert_eq!(CenteredAxes.read_axis(Axis::Y), 32768);
        assert!(ReleasedButtons.read_button(0));
        LoggingIndicators.set(11, true);
    }
}
