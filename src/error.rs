//! Error types for WinRelay
//!
//! This module defines all error types used throughout the application.
//! Errors are grouped by the part of the pipeline that raises them so the
//! session loops can decide whether a failure ends the session or only drops
//! a single message.

use std::io;
use std::time::Duration;
use thiserror::Error;

use crate::window::WindowHandle;

/// Main error type for WinRelay
#[derive(Error, Debug)]
pub enum RelayError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Window system query and capture errors
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// Socket connect/read/write errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Malformed messages on one of the channels
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Synthetic input errors
    #[error("Injection error: {0}")]
    Injection(#[from] InjectionError),

    /// Image encode/decode errors
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RelayError {
    /// Returns true if the error ends the session that raised it
    ///
    /// Protocol errors only drop the offending message, every other
    /// category tears the session down.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, RelayError::Protocol(_))
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Window system errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    #[error("Window {0} is no longer valid")]
    Stale(WindowHandle),

    #[error("Capture of window {0} returned no pixels")]
    EmptyCapture(WindowHandle),

    #[error("Window system unavailable: {0}")]
    Unavailable(String),

    #[error("Window system request failed: {0}")]
    RequestFailed(String),
}

/// Transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connection closed by peer")]
    Closed,

    #[error("Failed to connect to {addr}: {source}")]
    ConnectFailed { addr: String, source: io::Error },

    #[error("Failed to bind {addr}: {source}")]
    BindFailed { addr: String, source: io::Error },

    #[error("Socket error: {0}")]
    Io(#[from] io::Error),
}

/// Protocol errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Invalid input command: {0}")]
    InvalidCommand(String),
}

/// Input injection errors
#[derive(Error, Debug)]
pub enum InjectionError {
    #[error("Focus not confirmed within {0:?}")]
    FocusTimeout(Duration),

    #[error("Window {0} is not viewable")]
    NotViewable(WindowHandle),

    #[error("No keycode for key {0:?}")]
    UnmappedKey(String),

    #[error(transparent)]
    Window(#[from] WindowError),
}

/// Codec errors
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Encoding failed: {0}")]
    EncodeFailed(String),

    #[error("Decoding failed: {0}")]
    DecodeFailed(String),

    #[error("Image buffer does not match {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

/// Type alias for Results using RelayError
pub type Result<T> = std::result::Result<T, RelayError>;

/// Type alias for Config Results
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Type alias for Window Results
pub type WindowResult<T> = std::result::Result<T, WindowError>;

/// Type alias for Injection Results
pub type InjectionResult<T> = std::result::Result<T, InjectionError>;

/// Type alias for Codec Results
pub type CodecResult<T> = std::result::Result<T, CodecError>;

impl From<toml::de::Error> for RelayError {
    fn from(err: toml::de::Error) -> Self {
        RelayError::Config(ConfigError::LoadFailed(err.to_string()))
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::InvalidCommand(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ProtocolError::MessageTooLarge { size: 100, max: 50 };
        assert_eq!(error.to_string(), "Message too large: 100 bytes (max 50)");

        let error = WindowError::Stale(WindowHandle(0x1a));
        assert_eq!(error.to_string(), "Window 0x1a is no longer valid");

        let error = TransportError::ConnectFailed {
            addr: "127.0.0.1:12345".into(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert_eq!(
            error.to_string(),
            "Failed to connect to 127.0.0.1:12345: refused"
        );
    }

    #[test]
    fn test_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let relay_error: RelayError = io_error.into();
        assert!(matches!(relay_error, RelayError::Io(_)));
    }

    #[test]
    fn test_fatality() {
        let protocol: RelayError = ProtocolError::InvalidCommand("bad".into()).into();
        assert!(!protocol.is_fatal());

        let transport: RelayError = TransportError::Closed.into();
        assert!(transport.is_fatal());
    }
}
