//! # Error Types
//!
//! Custom error types for JoyCAN Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for JoyCAN Bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Malformed CAN frame or SLCAN line
    #[error("CAN protocol error: {0}")]
    CanProtocol(String),

    /// Send or poll failure reported by the CAN transport
    #[error("CAN transport failure: {0}")]
    Transport(String),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// No serial adapter could be opened
    #[error("No SLCAN adapter found (tried: {0})")]
    SerialPortNotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for JoyCAN Bridge
pub type Result<T> = std::result::Result<T, BridgeError>;
