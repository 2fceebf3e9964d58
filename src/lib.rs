//! WinRelay - Stream one application window over TCP and relay input back
//!
//! This library provides the pieces of both ends of a relay session:
//! - Window lookup, capture and input injection behind a shared capability
//! - Length-prefixed video and input channels
//! - Capture and dispatch loops paired into sessions
//! - Edge gesture detection for choosing the window to share
//! - A reconnecting viewer
//!
//! # Examples
//!
//! ```no_run
//! use winrelay::{client::{FrameCounter, ReconnectingClient}, config::Config, logging};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> winrelay::Result<()> {
//! logging::init_default_logging();
//!
//! let mut client = ReconnectingClient::new(Config::default(), FrameCounter::new());
//! client.input_queue().key("Return");
//! client.run(CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod desktop;
pub mod error;
pub mod gesture;
pub mod input;
pub mod logging;
pub mod network;
pub mod session;
pub mod window;

// Re-export commonly used types at crate root
pub use error::{RelayError, Result};
