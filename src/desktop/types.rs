//! Frame types and data structures
//!
//! This module defines common types used across the capture and decode paths.

/// Frame quality setting (1-100)
pub type Quality = u8;

/// Valid quality range constants
pub const MIN_QUALITY: Quality = 1;
pub const MAX_QUALITY: Quality = 100;
pub const DEFAULT_QUALITY: Quality = 80;

/// Encoded frame ready for transmission
///
/// Only `data` goes on the wire. The dimensions and original size are kept
/// for logging and statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Compressed frame data
    pub data: Vec<u8>,
    /// Original uncompressed size
    pub original_size: usize,
}

impl EncodedFrame {
    /// Returns the compression ratio
    pub fn compression_ratio(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        self.data.len() as f64 / self.original_size as f64
    }

    /// Returns the compression percentage
    pub fn compression_percentage(&self) -> f64 {
        (1.0 - self.compression_ratio()) * 100.0
    }
}
