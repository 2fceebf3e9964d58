//! Window lookup
//!
//! Finds the window to stream by title, by position, or by asking the window
//! system which window is active. Every query failure is reported as "not
//! found" so callers can keep polling.

use tracing::{debug, trace};

use crate::window::system::{SharedWindowSystem, WindowSystem};
use crate::window::types::{ScreenRect, WindowHandle};

/// Finds the first window whose title contains `needle`
///
/// Walks the tree depth-first in pre-order starting at the root, so an
/// ancestor always wins over its descendants. Matching is case-sensitive.
/// A subtree whose children cannot be listed is skipped.
pub fn find_by_title(system: &mut dyn WindowSystem, needle: &str) -> Option<WindowHandle> {
    let mut stack = vec![system.root()];

    while let Some(window) = stack.pop() {
        match system.title(window) {
            Ok(Some(title)) if title.contains(needle) => {
                debug!("Window {} matches title {:?}: {:?}", window, needle, title);
                return Some(window);
            }
            Ok(_) => {}
            Err(e) => trace!("No title for window {}: {}", window, e),
        }

        match system.children(window) {
            // Reverse so the first child is visited next
            Ok(children) => stack.extend(children.into_iter().rev()),
            Err(e) => trace!("Skipping subtree of {}: {}", window, e),
        }
    }

    None
}

/// Finds the first viewable top-level window that lies entirely off the display
pub fn find_offscreen(system: &mut dyn WindowSystem) -> Option<WindowHandle> {
    let root = system.root();
    let display = system.display_size();

    let children = match system.children(root) {
        Ok(children) => children,
        Err(e) => {
            debug!("Failed to list top-level windows: {}", e);
            return None;
        }
    };

    children.into_iter().find(|&window| {
        let Ok(attributes) = system.attributes(window) else {
            return false;
        };
        if !attributes.viewable {
            return false;
        }
        let Ok((x, y)) = system.origin(window) else {
            return false;
        };

        let rect = ScreenRect {
            x,
            y,
            width: attributes.width,
            height: attributes.height,
        };
        !rect.overlaps(display)
    })
}

/// Reads the window the window manager marks as active
pub fn current_active_window(system: &mut dyn WindowSystem) -> Option<WindowHandle> {
    match system.active_window() {
        Ok(Some(WindowHandle(0))) | Ok(None) => None,
        Ok(Some(window)) => Some(window),
        Err(e) => {
            debug!("Failed to read active window: {}", e);
            None
        }
    }
}

/// Async front-end running the lookups on the shared connection
#[derive(Debug, Clone)]
pub struct WindowLocator {
    system: SharedWindowSystem,
}

impl WindowLocator {
    /// Creates a locator over the shared window system
    pub fn new(system: SharedWindowSystem) -> Self {
        Self { system }
    }

    /// See [`find_by_title`]
    pub async fn find_by_title(&self, needle: &str) -> Option<WindowHandle> {
        let needle = needle.to_string();
        self.system
            .call(move |system| Ok(find_by_title(system, &needle)))
            .await
            .ok()
            .flatten()
    }

    /// See [`find_offscreen`]
    pub async fn find_offscreen(&self) -> Option<WindowHandle> {
        self.system
            .call(|system| Ok(find_offscreen(system)))
            .await
            .ok()
            .flatten()
    }

    /// See [`current_active_window`]
    pub async fn current_active_window(&self) -> Option<WindowHandle> {
        self.system
            .call(|system| Ok(current_active_window(system)))
            .await
            .ok()
            .flatten()
    }
}
