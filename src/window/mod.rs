//! Window module for WinRelay
//!
//! This module handles everything that talks to the host window system:
//! - The `WindowSystem` capability and its shared, mutex-guarded handle
//! - Window lookup by title, position and active-window property
//! - Key name resolution
//! - The X11 backend

pub mod keysym;
pub mod locator;
pub mod system;
pub mod types;

#[cfg(target_os = "linux")]
pub mod x11;

// Re-export commonly used types
pub use keysym::keysym_from_name;
pub use locator::{current_active_window, find_by_title, find_offscreen, WindowLocator};
pub use system::{SharedWindowSystem, WindowSystem};
pub use types::{DisplaySize, PointerState, RawImage, ScreenRect, WindowAttributes, WindowHandle};

#[cfg(target_os = "linux")]
pub use x11::X11WindowSystem;
