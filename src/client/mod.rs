//! Viewer module for WinRelay
//!
//! This module handles the remote side of a session:
//! - One reconnecting connector per channel
//! - Frame decoding into a display sink
//! - Queued local input flushed on each video tick

pub mod connector;
pub mod console;
pub mod queue;
pub mod sink;
pub mod viewer;

pub use connector::ChannelConnector;
pub use console::{parse_line, read_commands};
pub use queue::InputQueue;
pub use sink::{DisplaySink, FrameCounter, SnapshotSink};
pub use viewer::ReconnectingClient;
