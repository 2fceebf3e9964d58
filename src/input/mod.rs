//! Input module for WinRelay
//!
//! This module injects viewer commands into the tracked window:
//! - Raise, focus and focus confirmation
//! - Pointer warp and button synthesis for clicks
//! - Keycode lookup and key synthesis
//! - Optional opacity masking around the sequence

pub mod simulator;

// Re-export commonly used types
pub use simulator::InputSimulator;
