//! Window types and data structures
//!
//! This module defines common types shared by the locator, the capture loop
//! and the input dispatcher.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a window in the host window system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowHandle(pub u32);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Size of the visible display area in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySize {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl DisplaySize {
    /// Creates a new display size
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Window attributes as reported by the window system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowAttributes {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Whether the window is mapped and viewable
    pub viewable: bool,
}

/// Axis-aligned rectangle in root coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenRect {
    /// Left edge
    pub x: i32,
    /// Top edge
    pub y: i32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl ScreenRect {
    /// Returns true if any pixel of the rectangle lies on the display
    pub fn overlaps(&self, display: DisplaySize) -> bool {
        let right = i64::from(self.x) + i64::from(self.width);
        let bottom = i64::from(self.y) + i64::from(self.height);

        i64::from(self.x) < i64::from(display.width)
            && right > 0
            && i64::from(self.y) < i64::from(display.height)
            && bottom > 0
    }
}

/// Global pointer state sampled from the root window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerState {
    /// Root-relative x coordinate
    pub x: i32,
    /// Root-relative y coordinate
    pub y: i32,
    /// Whether the primary button is held
    pub primary_pressed: bool,
}

/// Raw RGBA pixel buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// RGBA pixel data (4 bytes per pixel)
    pub data: Vec<u8>,
}

impl RawImage {
    /// Creates a new image
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    /// Returns the size of the pixel data in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the image has no pixels
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    /// Validates that the pixel data matches the dimensions
    pub fn is_valid(&self) -> bool {
        let expected_size = self.width as usize * self.height as usize * 4;
        self.data.len() == expected_size
    }
}
