//! Frame producer loop
//!
//! Captures, encodes and sends one frame per tick on the video channel until
//! the capture fails, the send fails or the session is cancelled.

use std::time::Duration;

use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::desktop::FrameSource;
use crate::network::MessageWriter;

/// Why the capture loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureStop {
    /// The session was stopped from outside or by the input half
    Cancelled,
    /// The window is gone or the capture returned no pixels
    CaptureFailed(String),
    /// Writing to the video channel failed
    SendFailed(String),
    /// The task panicked or was aborted
    TaskFailed(String),
}

/// Outcome of one capture loop
#[derive(Debug, Clone)]
pub struct CaptureReport {
    /// Frames written to the video channel
    pub frames_sent: u64,
    /// Bytes written, prefixes included
    pub bytes_sent: u64,
    /// Why the loop ended
    pub stop: CaptureStop,
}

/// Drives a [`FrameSource`] and writes frames to the video peer
pub struct CaptureSession<W> {
    source: FrameSource,
    writer: MessageWriter<W>,
    frame_delay: Duration,
}

impl<W: AsyncWrite + Unpin + Send> CaptureSession<W> {
    /// Creates a capture loop writing to `video`
    pub fn new(source: FrameSource, video: W, frame_delay: Duration) -> Self {
        Self {
            source,
            writer: MessageWriter::new(video),
            frame_delay,
        }
    }

    /// Runs until a fatal error or cancellation, then closes the channel
    ///
    /// Pacing is a fixed sleep after every sent frame, a slow peer simply
    /// stretches the interval.
    pub async fn run(mut self, cancel: CancellationToken) -> CaptureReport {
        let window = self.source.window();
        info!("Streaming window {}", window);

        let stop = loop {
            let frame = tokio::select! {
                _ = cancel.cancelled() => break CaptureStop::Cancelled,
                frame = self.source.next_frame() => frame,
            };

            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("Capture of window {} failed: {}", window, e);
                    break CaptureStop::CaptureFailed(e.to_string());
                }
            };

            let sent = tokio::select! {
                _ = cancel.cancelled() => break CaptureStop::Cancelled,
                sent = self.writer.send(&frame.data) => sent,
            };

            if let Err(e) = sent {
                warn!("Video channel write failed: {}", e);
                break CaptureStop::SendFailed(e.to_string());
            }

            tokio::select! {
                _ = cancel.cancelled() => break CaptureStop::Cancelled,
                _ = tokio::time::sleep(self.frame_delay) => {}
            }
        };

        self.writer.shutdown().await;

        debug!(
            "Capture loop for window {} ended after {} frames: {:?}",
            window,
            self.writer.messages_sent(),
            stop
        );

        CaptureReport {
            frames_sent: self.writer.messages_sent(),
            bytes_sent: self.writer.bytes_sent(),
            stop,
        }
    }
}
