//! Window system capability
//!
//! Every call into the native window-system connection goes through
//! [`SharedWindowSystem`], which serializes access behind one mutex. The
//! connection is handed to each component explicitly instead of living in a
//! process-wide global.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{WindowError, WindowResult};
use crate::window::types::{
    DisplaySize, PointerState, RawImage, WindowAttributes, WindowHandle,
};

/// Contract the relay needs from the host window system
///
/// Implementations must report failures as `WindowError` and never panic on
/// a stale handle.
pub trait WindowSystem: Send {
    /// Root window of the default screen
    fn root(&self) -> WindowHandle;

    /// Size of the visible display area
    fn display_size(&self) -> DisplaySize;

    /// Direct children of a window, bottom to top
    fn children(&mut self, window: WindowHandle) -> WindowResult<Vec<WindowHandle>>;

    /// Title of a window, if it has one
    fn title(&mut self, window: WindowHandle) -> WindowResult<Option<String>>;

    /// Size and viewable state of a window
    fn attributes(&mut self, window: WindowHandle) -> WindowResult<WindowAttributes>;

    /// Top-left corner of a window translated to root coordinates
    fn origin(&mut self, window: WindowHandle) -> WindowResult<(i32, i32)>;

    /// Window named by the root's active-window property
    fn active_window(&mut self) -> WindowResult<Option<WindowHandle>>;

    /// Global pointer position and primary button state
    fn pointer(&mut self) -> WindowResult<PointerState>;

    /// Captures the window contents as RGBA
    fn capture(&mut self, window: WindowHandle, width: u32, height: u32)
        -> WindowResult<RawImage>;

    /// Raises a window to the top of the stack
    fn raise(&mut self, window: WindowHandle) -> WindowResult<()>;

    /// Requests input focus for a window
    fn focus(&mut self, window: WindowHandle) -> WindowResult<()>;

    /// Window currently holding input focus
    fn focused_window(&mut self) -> WindowResult<Option<WindowHandle>>;

    /// Sets window opacity, 0.0 transparent to 1.0 opaque
    fn set_opacity(&mut self, window: WindowHandle, opacity: f64) -> WindowResult<()>;

    /// Moves the synthetic pointer to root coordinates
    fn warp_pointer(&mut self, x: i32, y: i32) -> WindowResult<()>;

    /// Synthesizes a button press or release
    fn button(&mut self, button: u8, pressed: bool) -> WindowResult<()>;

    /// Looks up the keycode for a logical key name
    fn keycode(&mut self, key: &str) -> WindowResult<Option<u8>>;

    /// Synthesizes a key press or release
    fn key(&mut self, keycode: u8, pressed: bool) -> WindowResult<()>;

    /// Flushes queued requests to the server
    fn flush(&mut self) -> WindowResult<()>;
}

/// Mutex-guarded handle to the window system, cheap to clone
///
/// Root and display size are fixed for the life of a connection and are
/// read once here, so they never wait on the lock.
#[derive(Clone)]
pub struct SharedWindowSystem {
    inner: Arc<Mutex<Box<dyn WindowSystem>>>,
    root: WindowHandle,
    display: DisplaySize,
}

impl SharedWindowSystem {
    /// Wraps a window system implementation
    pub fn new<W: WindowSystem + 'static>(system: W) -> Self {
        let root = system.root();
        let display = system.display_size();
        Self {
            inner: Arc::new(Mutex::new(Box::new(system))),
            root,
            display,
        }
    }

    /// Runs a closure with exclusive access on the blocking pool
    ///
    /// The lock is held only for the duration of the closure.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or `Unavailable` if the blocking task
    /// could not complete
    pub async fn call<R, F>(&self, f: F) -> WindowResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut dyn WindowSystem) -> WindowResult<R> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut guard = inner.lock();
            f(&mut **guard)
        })
        .await
        .map_err(|e| WindowError::Unavailable(format!("window system task failed: {}", e)))?
    }

    /// Root window of the default screen
    pub fn root(&self) -> WindowHandle {
        self.root
    }

    /// Size of the visible display area
    pub fn display_size(&self) -> DisplaySize {
        self.display
    }
}

impl std::fmt::Debug for SharedWindowSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedWindowSystem")
            .field("root", &self.root)
            .field("display", &self.display)
            .finish_non_exhaustive()
    }
}
