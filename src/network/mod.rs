//! Network module for WinRelay
//!
//! This module defines the wire contract shared by host and viewer:
//! - Length-prefixed framing for both channels
//! - JSON input commands

pub mod protocol;
pub mod stream;

pub use protocol::{InputCommand, MouseButton};
pub use stream::{
    read_message, write_message, MessageReader, MessageWriter, LENGTH_PREFIX_SIZE,
    MAX_COMMAND_SIZE, MAX_FRAME_SIZE,
};
