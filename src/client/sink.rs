//! Display sinks for decoded frames
//!
//! The viewer GUI lives outside this crate. A sink receives every decoded
//! frame, the bundled ones count frames or keep a snapshot file current.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::{DynamicImage, RgbaImage};
use tracing::{debug, warn};

use crate::window::RawImage;

/// Minimum time between snapshot writes
const DEFAULT_SNAPSHOT_INTERVAL: Duration = Duration::from_secs(1);

/// Receives decoded frames on the viewer
pub trait DisplaySink: Send {
    /// Renders one frame
    fn show(&mut self, frame: &RawImage);
}

impl<S: DisplaySink + ?Sized> DisplaySink for Box<S> {
    fn show(&mut self, frame: &RawImage) {
        (**self).show(frame);
    }
}

/// Counts frames and remembers the latest size
#[derive(Debug, Clone, Default)]
pub struct FrameCounter {
    frames: Arc<AtomicU64>,
    last_size: Arc<parking_lot::Mutex<Option<(u32, u32)>>>,
}

impl FrameCounter {
    /// Creates a counter
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames shown so far
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Size of the latest frame
    pub fn last_size(&self) -> Option<(u32, u32)> {
        *self.last_size.lock()
    }
}

impl DisplaySink for FrameCounter {
    fn show(&mut self, frame: &RawImage) {
        let frames = self.frames.fetch_add(1, Ordering::Relaxed) + 1;
        let mut last_size = self.last_size.lock();
        if *last_size != Some((frame.width, frame.height)) {
            debug!("Remote window is {}x{}", frame.width, frame.height);
            *last_size = Some((frame.width, frame.height));
        }
        if frames % 300 == 0 {
            debug!("Displayed {} frames", frames);
        }
    }
}

/// Writes the latest frame to an image file at a bounded rate
///
/// The format follows the file extension. Inside a tokio runtime the file is
/// written on the blocking pool and frames arriving while a write is still
/// pending are not written.
#[derive(Debug)]
pub struct SnapshotSink {
    path: PathBuf,
    interval: Duration,
    last_write: Option<Instant>,
    writing: Arc<AtomicBool>,
    counter: FrameCounter,
}

impl SnapshotSink {
    /// Creates a sink writing to `path` at most once per second
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_interval(path, DEFAULT_SNAPSHOT_INTERVAL)
    }

    /// Creates a sink with a custom write interval
    pub fn with_interval(path: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            path: path.into(),
            interval,
            last_write: None,
            writing: Arc::new(AtomicBool::new(false)),
            counter: FrameCounter::new(),
        }
    }

    /// Counter of the frames this sink received
    pub fn counter(&self) -> FrameCounter {
        self.counter.clone()
    }

    /// Returns true while a background write is pending
    pub fn is_writing(&self) -> bool {
        self.writing.load(Ordering::Acquire)
    }
}

fn write_snapshot(path: &Path, frame: RawImage) {
    let Some(rgba) = RgbaImage::from_raw(frame.width, frame.height, frame.data) else {
        warn!("Snapshot frame does not match {}x{}", frame.width, frame.height);
        return;
    };
    // RGB output works for both JPEG and PNG targets
    if let Err(e) = DynamicImage::ImageRgba8(rgba).to_rgb8().save(path) {
        warn!("Failed to write snapshot {}: {}", path.display(), e);
    }
}

impl DisplaySink for SnapshotSink {
    fn show(&mut self, frame: &RawImage) {
        self.counter.show(frame);

        let due = self
            .last_write
            .map_or(true, |last| last.elapsed() >= self.interval);
        if !due || self.writing.swap(true, Ordering::AcqRel) {
            return;
        }
        self.last_write = Some(Instant::now());

        let path = self.path.clone();
        let frame = frame.clone();
        let writing = Arc::clone(&self.writing);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn_blocking(move || {
                    write_snapshot(&path, frame);
                    writing.store(false, Ordering::Release);
                });
            }
            Err(_) => {
                write_snapshot(&path, frame);
                writing.store(false, Ordering::Release);
            }
        }
    }
}
