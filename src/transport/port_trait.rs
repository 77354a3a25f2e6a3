//! Trait abstractions for the CAN transport and its serial port, so the
//! bridge and the SLCAN transport can be tested without hardware.

use async_trait::async_trait;
use std::io;
use std::time::Duration;

use crate::can::protocol::CanFrame;
use crate::error::Result;

/// Frame-level CAN access used by the bridge.
///
/// Sends are fire-and-forget: there is no acknowledgement and no retry.
#[async_trait]
pub trait CanTransport: Send {
    /// Transmit one frame
    async fn send(&mut self, frame: &CanFrame) -> Result<()>;

    /// Drain every frame received since the last poll without waiting
    async fn poll(&mut self) -> Result<Vec<CanFrame>>;
}

/// Trait for serial port I/O operations
#[async_trait]
pub trait SerialPortIO: Send {
    /// Write all data to the port
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush the output buffer
    async fn flush(&mut self) -> io::Result<()>;

    /// Read already-buffered bytes; `Ok(0)` when nothing is pending
    async fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Wrapper around tokio_serial::SerialStream that implements SerialPortIO
pub struct TokioSerialPort {
    port: tokio_serial::SerialStream,
}

impl TokioSerialPort {
    pub fn new(port: tokio_serial::SerialStream) -> Self {
        Self { port }
    }
}

#[async_trait]
impl SerialPortIO for TokioSerialPort {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.flush().await
    }

    async fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        use tokio::io::AsyncReadExt;
        // A zero timeout polls the read once and gives up if it would block
        match tokio::time::timeout(Duration::ZERO, self.port.read(buf)).await {
            Ok(result) => result,
            Err(_) => Ok(0),
        }
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use crate::error::BridgeError;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Mock serial port for testing
    #[derive(Clone)]
    pub struct MockSerialPort {
        pub written_data: Arc<Mutex<Vec<Vec<u8>>>>,
        pub incoming: Arc<Mutex<VecDeque<u8>>>,
        pub write_error: Arc<Mutex<Option<io::ErrorKind>>>,
        pub read_error: Arc<Mutex<Option<io::ErrorKind>>>,
    }

    impl MockSerialPort {
        pub fn new() -> Self {
            Self {
                written_data: Arc::new(Mutex::new(Vec::new())),
                incoming: Arc::new(Mutex::new(VecDeque::new())),
                write_error: Arc::new(Mutex::new(None)),
                read_error: Arc::new(Mutex::new(None)),
            }
        }

        pub fn get_written_data(&self) -> Vec<Vec<u8>> {
            self.written_data.lock().unwrap().clone()
        }

        pub fn push_incoming(&self, data: &[u8]) {
            self.incoming.lock().unwrap().extend(data.iter().copied());
        }

        pub fn set_write_error(&self, error: io::ErrorKind) {
            *self.write_error.lock().unwrap() = Some(error);
        }

        pub fn set_read_error(&self, error: io::ErrorKind) {
            *self.read_error.lock().unwrap() = Some(error);
        }
    }

    #[async_trait]
    impl SerialPortIO for MockSerialPort {
        async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
            if let Some(error) = *self.write_error.lock().unwrap() {
                return Err(io::Error::new(error, "Mock write error"));
            }
            self.written_data.lock().unwrap().push(data.to_vec());
            Ok(())
        }

        async fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }

        async fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if let Some(error) = *self.read_error.lock().unwrap() {
                return Err(io::Error::new(error, "Mock read error"));
            }
            let mut incoming = self.incoming.lock().unwrap();
            let count = buf.len().min(incoming.len());
            for (slot, byte) in buf.iter_mut().zip(incoming.drain(..count)) {
                *slot = byte;
            }
            Ok(count)
        }
    }

    /// Mock CAN transport recording sent frames and replaying queued ones
    #[derive(Clone, Default)]
    pub struct MockCanTransport {
        pub sent: Arc<Mutex<Vec<CanFrame>>>,
        pub inbound: Arc<Mutex<VecDeque<CanFrame>>>,
        pub fail_send: Arc<Mutex<bool>>,
        pub fail_poll: Arc<Mutex<bool>>,
    }

    impl MockCanTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn get_sent(&self) -> Vec<CanFrame> {
            self.sent.lock().unwrap().clone()
        }

        pub fn push_inbound(&self, frame: CanFrame) {
            self.inbound.lock().unwrap().push_back(frame);
        }

        pub fn set_fail_send(&self, fail: bool) {
            *self.fail_send.lock().unwrap() = fail;
        }

        pub fn set_fail_poll(&self, fail: bool) {
            *self.fail_poll.lock().unwrap() = fail;
        }
    }

    #[async_trait]
    impl CanTransport for MockCanTransport {
        async fn send(&mut self, frame: &CanFrame) -> Result<()> {
            if *self.fail_send.lock().unwrap() {
                return Err(BridgeError::Transport("Mock send error".to_string()));
            }
            self.sent.lock().unwrap().push(frame.clone());
            Ok(())
        }

        async fn poll(&mut self) -> Result<Vec<CanFrame>> {
            if *self.fail_poll.lock().unwrap() {
                return Err(BridgeError::Transport("Mock poll error".to_string()));
            }
            Ok(self.inbound.lock().unwrap().drain(..).collect())
        }
    }
}
