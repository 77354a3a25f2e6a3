//! # CAN Transport Module
//!
//! Frame transport to the CAN bus through a serial SLCAN adapter.
//!
//! This module handles:
//! - Opening the adapter's serial port (auto-detecting common device paths)
//! - SLCAN channel setup (close, bitrate, open)
//! - Transmitting frames as SLCAN lines
//! - Draining received lines without blocking

pub mod port_trait;

use async_trait::async_trait;
use bytes::{Buf, BytesMut};
use tokio::time::{sleep, Duration};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::can::protocol::CanFrame;
use crate::can::slcan::{self, SLCAN_BELL, SLCAN_CLOSE, SLCAN_CR, SLCAN_OPEN};
use crate::error::{BridgeError, Result};
use port_trait::{CanTransport, SerialPortIO, TokioSerialPort};

/// Default SLCAN adapter paths to try (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyACM0", // USB CDC adapters (CANable and clones)
    "/dev/ttyUSB0", // USB-to-serial adapters
];

/// Longest valid SLCAN line: `T` + 8 ID digits + DLC + 16 data digits
const MAX_LINE_LENGTH: usize = 26;

/// Time allowed for the adapter to answer setup commands
const SETUP_SETTLE: Duration = Duration::from_millis(50);

/// Read chunk size when draining the port
const READ_CHUNK: usize = 256;

/// SLCAN transport over a serial port
pub struct SlcanTransport<P: SerialPortIO> {
    port: P,
    device_path: String,
    rx: BytesMut,
    adapter_errors: u64,
}

impl<P: SerialPortIO> std::fmt::Debug for SlcanTransport<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlcanTransport")
            .field("device_path", &self.device_path)
            .field("adapter_errors", &self.adapter_errors)
            .finish_non_exhaustive()
    }
}

impl SlcanTransport<TokioSerialPort> {
    /// Open the SLCAN adapter
    ///
    /// Tries `port` when given, otherwise the default device paths.
    ///
    /// # Errors
    ///
    /// Returns error if no adapter could be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use joycan_bridge::transport::SlcanTransport;
    ///
    /// #[tokio::main(flavor = "current_thread")]
    /// async fn main() -> anyhow::Result<()> {
    ///     let mut transport = SlcanTransport::open("", 115_200)?;
    ///     transport.start(250_000).await?;
    ///     Ok(())
    /// }
    /// ```
    pub fn open(port: &str, baud_rate: u32) -> Result<Self> {
        if port.is_empty() {
            Self::open_with_paths(DEFAULT_DEVICE_PATHS, baud_rate)
        } else {
            Self::open_with_paths(&[port], baud_rate)
        }
    }

    /// Open the first path that succeeds
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open SLCAN adapter: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Successfully opened SLCAN adapter at {}", path);
                    return Ok(Self::with_port(TokioSerialPort::new(port), path));
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(BridgeError::SerialPortNotFound(paths.join(", ")))
    }

    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| BridgeError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }
}

impl<P: SerialPortIO> SlcanTransport<P> {
    /// Wrap an already-open port
    pub fn with_port(port: P, device_path: &str) -> Self {
        Self {
            port,
            device_path: device_path.to_string(),
            rx: BytesMut::with_capacity(READ_CHUNK),
            adapter_errors: 0,
        }
    }

    /// Path of the opened adapter
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Number of BEL replies seen from the adapter
    pub fn adapter_errors(&self) -> u64 {
        self.adapter_errors
    }

    /// Close, configure the bitrate and open the CAN channel
    ///
    /// Replies to the setup commands are discarded: closing an already
    /// closed channel is answered with BEL on most adapters.
    ///
    /// # Errors
    ///
    /// Returns error for an unsupported bitrate or a write failure
    pub async fn start(&mut self, bitrate: u32) -> Result<()> {
        let bitrate_cmd = slcan::bitrate_command(bitrate)?;

        for command in [SLCAN_CLOSE, bitrate_cmd.as_str(), SLCAN_OPEN] {
            self.write(command.as_bytes()).await?;
        }

        sleep(SETUP_SETTLE).await;
        self.fill_rx().await?;
        self.rx.clear();

        info!("SLCAN channel open at {} bit/s", bitrate);
        Ok(())
    }

    /// Close the CAN channel
    pub async fn stop(&mut self) -> Result<()> {
        self.write(SLCAN_CLOSE.as_bytes()).await?;
        info!("SLCAN channel closed");
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.port
            .write_all(data)
            .await
            .map_err(|e| BridgeError::Transport(format!("Failed to write to {}: {}", self.device_path, e)))?;

        self.port
            .flush()
            .await
            .map_err(|e| BridgeError::Transport(format!("Failed to flush {}: {}", self.device_path, e)))
    }

    /// Move everything the port has buffered into `rx`
    async fn fill_rx(&mut self) -> Result<()> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let count = self
                .port
                .read_available(&mut chunk)
                .await
                .map_err(|e| BridgeError::Transport(format!("Failed to read from {}: {}", self.device_path, e)))?;

            self.rx.extend_from_slice(&chunk[..count]);
            if count < chunk.len() {
                return Ok(());
            }
        }
    }

    /// Split complete lines off `rx` and decode them
    fn drain_lines(&mut self) -> Vec<CanFrame> {
        let mut frames = Vec::new();

        while let Some(end) = self.rx.iter().position(|&b| b == SLCAN_CR || b == SLCAN_BELL) {
            let line = self.rx.split_to(end);
            let terminator = self.rx.get_u8();

            if terminator == SLCAN_BELL {
                self.adapter_errors += 1;
                warn!("SLCAN adapter rejected a command ({} total)", self.adapter_errors);
                continue;
            }

            match slcan::decode_line(&line) {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => {}
                Err(e) => warn!("Dropping malformed SLCAN line: {}", e),
            }
        }

        if self.rx.len() > MAX_LINE_LENGTH {
            warn!("Discarding {} bytes of unterminated SLCAN input", self.rx.len());
            self.rx.clear();
        }

        frames
    }
}

#[async_trait]
impl<P: SerialPortIO> CanTransport for SlcanTransport<P> {
    async fn send(&mut self, frame: &CanFrame) -> Result<()> {
        let line = slcan::encode_frame(frame);
        self.write(&line).await?;
        debug!("Sent CAN frame 0x{:08X} ({} bytes)", frame.id, frame.payload.len());
        Ok(())
    }

    async fn poll(&mut self) -> Result<Vec<CanFrame>> {
        self.fill_rx().await?;
        Ok(self.drain_lines())
    }
}
