//! Configuration for WinRelay
//!
//! This module handles runtime configuration including:
//! - Channel ports and addresses for host and viewer
//! - Capture pacing and quality
//! - Edge gesture thresholds
//! - Input injection timing
//!
//! Configuration is read from an explicit TOML file or taken from the
//! defaults. Nothing is ever written back to disk.

use crate::error::{ConfigError, ConfigResult};
use crate::logging::LogLevel;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

// Constants for configuration (avoiding magic numbers)
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1";
const DEFAULT_VIDEO_PORT: u16 = 12345;
const DEFAULT_INPUT_PORT: u16 = 12346;
const DEFAULT_QUALITY: u8 = 80;
const DEFAULT_FRAME_DELAY_MS: u64 = 33;
const DEFAULT_GESTURE_POLL_MS: u64 = 100;
const DEFAULT_HOLD_THRESHOLD: u32 = 20;
const DEFAULT_EDGE_MARGIN: u32 = 1;
const DEFAULT_FOCUS_TIMEOUT_MS: u64 = 5000;
const DEFAULT_FOCUS_POLL_MS: u64 = 10;
const DEFAULT_DOUBLE_CLICK_DELAY_MS: u64 = 150;
const DEFAULT_STOP_KEY: &str = "\u{1b}";
const DEFAULT_MASK_PRE_DELAY_MS: u64 = 50;
const DEFAULT_MASK_POST_DELAY_MS: u64 = 100;
const DEFAULT_RECONNECT_DELAY_MS: u64 = 2000;
const DEFAULT_CONNECT_POLL_MS: u64 = 100;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Network configuration
    pub network: NetworkConfig,

    /// Window capture configuration
    pub capture: CaptureConfig,

    /// Edge gesture configuration
    pub gesture: GestureConfig,

    /// Input injection configuration
    pub input: InputConfig,

    /// Viewer configuration
    pub client: ClientConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Network-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address the host listens on
    pub bind_address: String,

    /// Address the viewer connects to
    pub server_address: String,

    /// Port of the video channel
    pub video_port: u16,

    /// Port of the input channel
    pub input_port: u16,
}

/// Window capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// JPEG quality (1-100)
    pub quality: u8,

    /// Fixed delay after each sent frame in milliseconds
    pub frame_delay_ms: u64,
}

/// Edge gesture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Pointer sampling interval in milliseconds
    pub poll_interval_ms: u64,

    /// Consecutive edge samples needed to arm
    pub hold_threshold: u32,

    /// Distance in pixels from the border that still counts as the edge
    pub edge_margin: u32,

    /// Stop a live session when a new gesture fires
    pub preempt: bool,
}

/// Input injection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Upper bound for focus confirmation in milliseconds
    pub focus_timeout_ms: u64,

    /// Focus polling interval in milliseconds
    pub focus_poll_interval_ms: u64,

    /// Delay between the two clicks of a double click in milliseconds
    pub double_click_delay_ms: u64,

    /// Key name that ends the session instead of being typed
    pub stop_key: String,

    /// Opacity masking around raise/focus
    pub mask: MaskConfig,
}

/// Opacity masking around the raise/focus sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskConfig {
    /// Make the window transparent while it is raised
    pub enabled: bool,

    /// Delay after hiding before raising, in milliseconds
    pub pre_delay_ms: u64,

    /// Delay after the action before restoring opacity, in milliseconds
    pub post_delay_ms: u64,
}

/// Viewer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Delay between connection attempts in milliseconds
    pub reconnect_delay_ms: u64,

    /// How often the viewer checks whether both channels are up
    pub connect_poll_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            server_address: DEFAULT_SERVER_ADDRESS.to_string(),
            video_port: DEFAULT_VIDEO_PORT,
            input_port: DEFAULT_INPUT_PORT,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            frame_delay_ms: DEFAULT_FRAME_DELAY_MS,
        }
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_GESTURE_POLL_MS,
            hold_threshold: DEFAULT_HOLD_THRESHOLD,
            edge_margin: DEFAULT_EDGE_MARGIN,
            preempt: false,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            focus_timeout_ms: DEFAULT_FOCUS_TIMEOUT_MS,
            focus_poll_interval_ms: DEFAULT_FOCUS_POLL_MS,
            double_click_delay_ms: DEFAULT_DOUBLE_CLICK_DELAY_MS,
            stop_key: DEFAULT_STOP_KEY.to_string(),
            mask: MaskConfig::default(),
        }
    }
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            pre_delay_ms: DEFAULT_MASK_PRE_DELAY_MS,
            post_delay_ms: DEFAULT_MASK_POST_DELAY_MS,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            connect_poll_ms: DEFAULT_CONNECT_POLL_MS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl NetworkConfig {
    /// Listen address of the video channel
    pub fn video_bind(&self) -> String {
        format!("{}:{}", self.bind_address, self.video_port)
    }

    /// Listen address of the input channel
    pub fn input_bind(&self) -> String {
        format!("{}:{}", self.bind_address, self.input_port)
    }

    /// Remote address of the video channel
    pub fn video_remote(&self) -> String {
        format!("{}:{}", self.server_address, self.video_port)
    }

    /// Remote address of the input channel
    pub fn input_remote(&self) -> String {
        format!("{}:{}", self.server_address, self.input_port)
    }
}

impl CaptureConfig {
    /// Returns the pacing delay between frames
    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.frame_delay_ms)
    }
}

impl GestureConfig {
    /// Returns the pointer sampling interval
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl InputConfig {
    /// Returns the focus confirmation bound
    pub fn focus_timeout(&self) -> Duration {
        Duration::from_millis(self.focus_timeout_ms)
    }

    /// Returns the focus polling interval
    pub fn focus_poll_interval(&self) -> Duration {
        Duration::from_millis(self.focus_poll_interval_ms)
    }

    /// Returns the delay between the clicks of a double click
    pub fn double_click_delay(&self) -> Duration {
        Duration::from_millis(self.double_click_delay_ms)
    }
}

impl MaskConfig {
    /// Returns the delay between hiding and raising
    pub fn pre_delay(&self) -> Duration {
        Duration::from_millis(self.pre_delay_ms)
    }

    /// Returns the delay between the action and restoring opacity
    pub fn post_delay(&self) -> Duration {
        Duration::from_millis(self.post_delay_ms)
    }
}

impl ClientConfig {
    /// Returns the delay between connection attempts
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Returns the channel readiness polling interval
    pub fn connect_poll(&self) -> Duration {
        Duration::from_millis(self.connect_poll_ms)
    }
}

impl Config {
    /// Loads configuration from a TOML file
    ///
    /// Missing sections and keys fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, parsed or validated
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::LoadFailed(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            ConfigError::LoadFailed(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Renders the configuration as TOML
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue(format!("Failed to serialize config: {}", e)))
    }

    /// Parsed log level, falling back to info
    pub fn log_level(&self) -> LogLevel {
        self.logging.level.parse().unwrap_or_default()
    }

    /// Validates configuration values
    ///
    /// # Errors
    ///
    /// Returns error naming the first invalid value
    pub fn validate(&self) -> ConfigResult<()> {
        if self.capture.quality == 0 || self.capture.quality > 100 {
            return Err(ConfigError::InvalidValue(
                "Quality must be between 1 and 100".to_string(),
            ));
        }

        if self.network.video_port == self.network.input_port {
            return Err(ConfigError::InvalidValue(
                "Video and input channels need different ports".to_string(),
            ));
        }

        if self.capture.frame_delay_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "Frame delay must be positive".to_string(),
            ));
        }

        if self.gesture.hold_threshold == 0 {
            return Err(ConfigError::InvalidValue(
                "Hold threshold must be at least 1".to_string(),
            ));
        }

        if self.gesture.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "Gesture poll interval must be positive".to_string(),
            ));
        }

        if self.input.focus_poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "Focus poll interval must be positive".to_string(),
            ));
        }

        if self.client.reconnect_delay_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "Reconnect delay must be positive".to_string(),
            ));
        }

        if self.client.connect_poll_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "Connect poll interval must be positive".to_string(),
            ));
        }

        if self.logging.level.parse::<LogLevel>().is_err() {
            return Err(ConfigError::InvalidValue(format!(
                "Unknown log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }
}
