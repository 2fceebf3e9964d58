//! Desktop module for WinRelay
//!
//! This module handles the frame path:
//! - Capturing a single window at its current size
//! - Frame encoding and decoding
//! - Decode statistics on the viewer

pub mod capture;
pub mod decoder;
pub mod encoder;
pub mod types;

// Re-export commonly used types
pub use capture::FrameSource;
pub use decoder::{DecoderStats, FrameDecoder};
pub use encoder::{FrameCodec, JpegCodec};
pub use types::{EncodedFrame, Quality, DEFAULT_QUALITY, MAX_QUALITY, MIN_QUALITY};
