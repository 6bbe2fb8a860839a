//! # Error Types
//!
//! Custom error types for Zerg Pad using `thiserror`.

use thiserror::Error;

/// Main error type for Zerg Pad
#[derive(Debug, Error)]
pub enum ZergPadError {
    /// No transport available (no adapter, no open stream)
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    /// Remote device unreachable or refused the connection
    #[error("Failed to connect to {address}: {reason}")]
    ConnectFailed {
        /// Address of the remote device
        address: String,
        /// Underlying failure
        reason: String,
    },

    /// Write failed on every attempt
    #[error("Send failed after {attempts} attempt(s): {reason}")]
    SendFailed {
        /// Number of write attempts made
        attempts: u32,
        /// Last I/O failure
        reason: String,
    },

    /// A payload byte collides with a framing prefix
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Gamepad input errors
    #[error("Controller error: {0}")]
    Controller(String),

    /// No usable gamepad found
    #[error("No gamepad with an analog stick found")]
    ControllerNotFound,
}

/// Result type alias for Zerg Pad
pub type Result<T> = std::result::Result<T, ZergPadError>;
