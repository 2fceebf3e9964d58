//! Window capture
//!
//! Produces one encoded frame per call for a tracked window. Geometry is
//! re-read on every tick so a resized window is captured at its new size.

use crate::desktop::encoder::FrameCodec;
use crate::desktop::types::EncodedFrame;
use crate::error::{CodecError, Result, WindowError};
use crate::window::{SharedWindowSystem, WindowHandle};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Captures and encodes frames of a single window
#[derive(Clone)]
pub struct FrameSource {
    system: SharedWindowSystem,
    window: WindowHandle,
    codec: Arc<dyn FrameCodec>,
}

impl FrameSource {
    /// Creates a frame source for a window
    pub fn new(system: SharedWindowSystem, window: WindowHandle, codec: Arc<dyn FrameCodec>) -> Self {
        info!("Created frame source for window {}", window);
        Self {
            system,
            window,
            codec,
        }
    }

    /// Returns the tracked window
    pub fn window(&self) -> WindowHandle {
        self.window
    }

    /// Captures the window at its current size and encodes the result
    ///
    /// # Errors
    ///
    /// Returns `Stale` if the window is gone, `EmptyCapture` if the capture
    /// held no pixels, or a codec error if encoding fails. All of them end
    /// the capture loop.
    pub async fn next_frame(&self) -> Result<EncodedFrame> {
        let start = Instant::now();
        let window = self.window;

        let image = self
            .system
            .call(move |system| {
                let attributes = system.attributes(window)?;
                if attributes.width == 0 || attributes.height == 0 {
                    return Err(WindowError::EmptyCapture(window));
                }
                system.capture(window, attributes.width, attributes.height)
            })
            .await?;

        if image.is_empty() || !image.is_valid() {
            return Err(WindowError::EmptyCapture(window).into());
        }

        let codec = Arc::clone(&self.codec);
        let (width, height, original_size) = (image.width, image.height, image.size_bytes());
        let data = tokio::task::spawn_blocking(move || codec.encode(&image))
            .await
            .map_err(|e| CodecError::EncodeFailed(format!("encoder task failed: {}", e)))??;

        let frame = EncodedFrame {
            width,
            height,
            data,
            original_size,
        };

        debug!(
            "Captured {}x{} frame ({} -> {} bytes, {:.1}% compression) in {}ms",
            width,
            height,
            original_size,
            frame.data.len(),
            frame.compression_percentage(),
            start.elapsed().as_millis()
        );

        Ok(frame)
    }
}

impl std::fmt::Debug for FrameSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSource")
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}
