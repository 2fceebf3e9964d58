//! Input injection into the tracked window
//!
//! Every command raises the window, asks for focus and waits until focus is
//! confirmed (or the bound expires) before synthesizing events. With masking
//! enabled the window is made transparent for the duration of the sequence.

use crate::config::InputConfig;
use crate::error::{InjectionError, InjectionResult};
use crate::network::{InputCommand, MouseButton};
use crate::window::{SharedWindowSystem, WindowHandle};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Fully transparent window opacity
const OPACITY_HIDDEN: f64 = 0.0;

/// Fully opaque window opacity
const OPACITY_VISIBLE: f64 = 1.0;

/// Applies input commands through the window system
#[derive(Debug, Clone)]
pub struct InputSimulator {
    system: SharedWindowSystem,
    config: InputConfig,
    /// Number of synthesized pointer and key events
    events_simulated: Arc<AtomicU64>,
}

impl InputSimulator {
    /// Creates a simulator over the shared window system
    pub fn new(system: SharedWindowSystem, config: InputConfig) -> Self {
        Self {
            system,
            config,
            events_simulated: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Applies one command to a window
    ///
    /// The stop key is not special here, the dispatcher filters it out
    /// before calling this.
    ///
    /// # Errors
    ///
    /// Returns `NotViewable` for clicks on an unmapped window, `UnmappedKey`
    /// for keys without a keycode, or a window error if a request fails.
    /// A focus timeout only logs a warning.
    pub async fn apply(&self, window: WindowHandle, command: &InputCommand) -> InjectionResult<()> {
        match command {
            InputCommand::Click { x, y, button } => self.click(window, *x, *y, *button, 1).await,
            InputCommand::DoubleClick { x, y, button } => {
                self.click(window, *x, *y, *button, 2).await
            }
            InputCommand::Key { key } => self.key(window, key).await,
        }
    }

    /// Number of synthesized pointer and key events
    pub fn events_simulated(&self) -> u64 {
        self.events_simulated.load(Ordering::Relaxed)
    }

    async fn click(
        &self,
        window: WindowHandle,
        x: i32,
        y: i32,
        button: MouseButton,
        count: u32,
    ) -> InjectionResult<()> {
        let attributes = self.system.call(move |system| system.attributes(window)).await?;
        if !attributes.viewable {
            return Err(InjectionError::NotViewable(window));
        }

        self.hide(window).await;
        let result = self.click_focused(window, x, y, button, count).await;
        self.restore(window).await;
        result
    }

    async fn click_focused(
        &self,
        window: WindowHandle,
        x: i32,
        y: i32,
        button: MouseButton,
        count: u32,
    ) -> InjectionResult<()> {
        self.raise_and_focus(window).await?;

        // Origin is read after raising, the window manager may have moved it
        let (origin_x, origin_y) = self.system.call(move |system| system.origin(window)).await?;
        let screen_x = origin_x.saturating_add(x);
        let screen_y = origin_y.saturating_add(y);

        self.system
            .call(move |system| {
                system.warp_pointer(screen_x, screen_y)?;
                system.flush()
            })
            .await?;
        self.events_simulated.fetch_add(1, Ordering::Relaxed);

        let button_id = button.button_id();
        for i in 0..count {
            if i > 0 {
                sleep(self.config.double_click_delay()).await;
            }
            self.system
                .call(move |system| {
                    system.button(button_id, true)?;
                    system.button(button_id, false)?;
                    system.flush()
                })
                .await?;
            self.events_simulated.fetch_add(2, Ordering::Relaxed);
        }

        debug!(
            "Clicked {} button {}x at ({}, {}) on window {}",
            button, count, screen_x, screen_y, window
        );
        Ok(())
    }

    async fn key(&self, window: WindowHandle, key: &str) -> InjectionResult<()> {
        let name = key.to_string();
        let keycode = self
            .system
            .call(move |system| system.keycode(&name))
            .await?
            .ok_or_else(|| InjectionError::UnmappedKey(key.to_string()))?;

        self.hide(window).await;
        let result = self.key_focused(window, keycode).await;
        self.restore(window).await;

        if result.is_ok() {
            debug!("Typed key {:?} (keycode {}) on window {}", key, keycode, window);
        }
        result
    }

    async fn key_focused(&self, window: WindowHandle, keycode: u8) -> InjectionResult<()> {
        self.raise_and_focus(window).await?;

        self.system
            .call(move |system| {
                system.key(keycode, true)?;
                system.key(keycode, false)?;
                system.flush()
            })
            .await?;
        self.events_simulated.fetch_add(2, Ordering::Relaxed);
        Ok(())
    }

    /// Raises the window, requests focus and waits for confirmation
    async fn raise_and_focus(&self, window: WindowHandle) -> InjectionResult<()> {
        self.system
            .call(move |system| {
                system.raise(window)?;
                system.focus(window)?;
                system.flush()
            })
            .await?;

        if let Err(e) = self.await_focus(window).await {
            warn!("{} for window {}, injecting anyway", e, window);
        }
        Ok(())
    }

    /// Polls focus until it lands on the window or the bound expires
    ///
    /// The window system lock is released between polls.
    async fn await_focus(&self, window: WindowHandle) -> InjectionResult<()> {
        let timeout = self.config.focus_timeout();
        let deadline = Instant::now() + timeout;

        loop {
            let focused = self.system.call(|system| system.focused_window()).await?;
            if focused == Some(window) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(InjectionError::FocusTimeout(timeout));
            }
            sleep(self.config.focus_poll_interval()).await;
        }
    }

    async fn hide(&self, window: WindowHandle) {
        if !self.config.mask.enabled {
            return;
        }
        self.set_opacity(window, OPACITY_HIDDEN).await;
        sleep(self.config.mask.pre_delay()).await;
    }

    /// Restores opacity, also after a failed action
    async fn restore(&self, window: WindowHandle) {
        if !self.config.mask.enabled {
            return;
        }
        sleep(self.config.mask.post_delay()).await;
        self.set_opacity(window, OPACITY_VISIBLE).await;
    }

    async fn set_opacity(&self, window: WindowHandle, opacity: f64) {
        let result = self
            .system
            .call(move |system| {
                system.set_opacity(window, opacity)?;
                system.flush()
            })
            .await;
        if let Err(e) = result {
            warn!("Failed to set opacity of window {}: {}", window, e);
        }
    }
}
