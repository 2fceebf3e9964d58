//! Edge gesture detection
//!
//! Holding the primary button while the pointer sits on a screen border for
//! long enough offers the active window for remote control. The host samples
//! the pointer on a fixed interval and feeds each sample to [`EdgeGesture`].

use crate::config::GestureConfig;
use crate::window::{DisplaySize, PointerState, SharedWindowSystem, WindowHandle, WindowLocator};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Observable state of the gesture accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureState {
    /// No qualifying sample since the last reset
    Idle,
    /// Consecutive qualifying samples so far
    Holding(u32),
}

/// Hold counter for the edge gesture
///
/// The counter stays within `0..=threshold`. It grows by one for every
/// sample with the button held at an edge, drops to 0 on any other sample,
/// and drops to 0 again when it reaches the threshold and fires.
#[derive(Debug, Clone)]
pub struct EdgeGesture {
    hold_counter: u32,
    threshold: u32,
    margin: u32,
}

impl EdgeGesture {
    /// Creates a gesture firing after `threshold` consecutive edge samples
    pub fn new(threshold: u32, margin: u32) -> Self {
        Self {
            hold_counter: 0,
            threshold: threshold.max(1),
            margin,
        }
    }

    /// Creates a gesture from configuration
    pub fn from_config(config: &GestureConfig) -> Self {
        Self::new(config.hold_threshold, config.edge_margin)
    }

    /// Feeds one pointer sample, returns true when the gesture fires
    pub fn sample(&mut self, pointer: PointerState, display: DisplaySize) -> bool {
        if !(pointer.primary_pressed && at_edge(pointer, display, self.margin)) {
            self.hold_counter = 0;
            return false;
        }

        self.hold_counter += 1;
        if self.hold_counter >= self.threshold {
            self.hold_counter = 0;
            return true;
        }
        false
    }

    /// Current hold counter
    pub fn hold_counter(&self) -> u32 {
        self.hold_counter
    }

    /// Current state
    pub fn state(&self) -> GestureState {
        match self.hold_counter {
            0 => GestureState::Idle,
            n => GestureState::Holding(n),
        }
    }

    /// Drops any partial hold
    pub fn reset(&mut self) {
        self.hold_counter = 0;
    }
}

/// Returns true if the pointer is within `margin` pixels of a display border
pub fn at_edge(pointer: PointerState, display: DisplaySize, margin: u32) -> bool {
    let margin = i64::from(margin);
    let (x, y) = (i64::from(pointer.x), i64::from(pointer.y));
    let (width, height) = (i64::from(display.width), i64::from(display.height));

    x <= margin || y <= margin || x >= width - margin || y >= height - margin
}

/// Samples the pointer and reports windows selected by the gesture
pub struct EdgeGestureDetector {
    system: SharedWindowSystem,
    locator: WindowLocator,
    gesture: EdgeGesture,
    config: GestureConfig,
}

impl EdgeGestureDetector {
    /// Creates a detector over the shared window system
    pub fn new(system: SharedWindowSystem, config: GestureConfig) -> Self {
        Self {
            locator: WindowLocator::new(system.clone()),
            gesture: EdgeGesture::from_config(&config),
            system,
            config,
        }
    }

    /// Takes one pointer sample
    ///
    /// Returns the active window when the gesture fires and one is set. A
    /// failed pointer query counts as a non-qualifying sample.
    pub async fn poll(&mut self) -> Option<WindowHandle> {
        let display = self.system.display_size();

        let pointer = match self.system.call(|system| system.pointer()).await {
            Ok(pointer) => pointer,
            Err(e) => {
                debug!("Pointer query failed: {}", e);
                self.gesture.reset();
                return None;
            }
        };

        if !self.gesture.sample(pointer, display) {
            return None;
        }

        info!("Edge gesture armed at ({}, {})", pointer.x, pointer.y);
        let window = self.locator.current_active_window().await;
        if window.is_none() {
            warn!("Edge gesture fired but no window is active");
        }
        window
    }

    /// Polls until cancelled, sending every selected window on `selected`
    ///
    /// Stops early if the receiver is dropped.
    pub async fn run(mut self, selected: mpsc::Sender<WindowHandle>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Watching for edge gesture (threshold {} samples every {}ms)",
            self.config.hold_threshold, self.config.poll_interval_ms
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if let Some(window) = self.poll().await {
                if selected.send(window).await.is_err() {
                    break;
                }
            }
        }

        debug!("Edge gesture detector stopped");
    }
}
