//! In-memory window system for integration tests
//!
//! Windows live in a tree under root `0x1`. Positions are stored in root
//! coordinates. Every mutating call is appended to an event log the test can
//! inspect through [`FakeControl`].

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use winrelay::error::{WindowError, WindowResult};
use winrelay::window::{
    DisplaySize, PointerState, RawImage, SharedWindowSystem, WindowAttributes, WindowHandle,
    WindowSystem,
};

pub const ROOT: WindowHandle = WindowHandle(0x1);

/// Side effect recorded by the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Raise(WindowHandle),
    Focus(WindowHandle),
    /// Opacity in percent
    Opacity(WindowHandle, u32),
    Warp(i32, i32),
    Button(u8, bool),
    Key(u8, bool),
    Capture(WindowHandle, u32, u32),
}

#[derive(Debug, Clone)]
struct FakeWindow {
    title: Option<String>,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    viewable: bool,
    children: Vec<WindowHandle>,
}

#[derive(Debug)]
struct FakeState {
    windows: HashMap<WindowHandle, FakeWindow>,
    events: Vec<Event>,
    focused: Option<WindowHandle>,
    active: Option<WindowHandle>,
    pointer: PointerState,
    pointer_fails: bool,
    keymap: HashMap<String, u8>,
    grant_focus: bool,
    broken_subtrees: HashSet<WindowHandle>,
    empty_capture: bool,
}

/// Window system backed by [`FakeState`]
pub struct FakeWindowSystem {
    state: Arc<Mutex<FakeState>>,
    display: DisplaySize,
}

/// Test-side handle onto the fake's state
#[derive(Clone)]
pub struct FakeControl {
    state: Arc<Mutex<FakeState>>,
}

/// Creates a fake with an empty root and a small keymap
pub fn fake_system(width: u32, height: u32) -> (SharedWindowSystem, FakeControl) {
    let mut windows = HashMap::new();
    windows.insert(
        ROOT,
        FakeWindow {
            title: None,
            x: 0,
            y: 0,
            width,
            height,
            viewable: true,
            children: Vec::new(),
        },
    );

    let keymap = [("a", 38u8), ("b", 56), ("Return", 36), ("Escape", 9), ("\u{1b}", 9)]
        .into_iter()
        .map(|(name, code)| (name.to_string(), code))
        .collect();

    let state = Arc::new(Mutex::new(FakeState {
        windows,
        events: Vec::new(),
        focused: None,
        active: None,
        pointer: PointerState::default(),
        pointer_fails: false,
        keymap,
        grant_focus: true,
        broken_subtrees: HashSet::new(),
        empty_capture: false,
    }));

    let system = FakeWindowSystem {
        state: Arc::clone(&state),
        display: DisplaySize::new(width, height),
    };
    (SharedWindowSystem::new(system), FakeControl { state })
}

impl FakeControl {
    /// Adds a window as the last child of `parent`
    pub fn add_window(
        &self,
        parent: WindowHandle,
        id: u32,
        title: Option<&str>,
        (x, y, width, height): (i32, i32, u32, u32),
    ) -> WindowHandle {
        let handle = WindowHandle(id);
        let mut state = self.state.lock();
        state.windows.insert(
            handle,
            FakeWindow {
                title: title.map(str::to_string),
                x,
                y,
                width,
                height,
                viewable: true,
                children: Vec::new(),
            },
        );
        if let Some(parent) = state.windows.get_mut(&parent) {
            parent.children.push(handle);
        }
        handle
    }

    pub fn remove_window(&self, window: WindowHandle) {
        let mut state = self.state.lock();
        state.windows.remove(&window);
        for other in state.windows.values_mut() {
            other.children.retain(|child| *child != window);
        }
    }

    pub fn set_viewable(&self, window: WindowHandle, viewable: bool) {
        if let Some(w) = self.state.lock().windows.get_mut(&window) {
            w.viewable = viewable;
        }
    }

    pub fn resize(&self, window: WindowHandle, width: u32, height: u32) {
        if let Some(w) = self.state.lock().windows.get_mut(&window) {
            w.width = width;
            w.height = height;
        }
    }

    pub fn break_subtree(&self, window: WindowHandle) {
        self.state.lock().broken_subtrees.insert(window);
    }

    pub fn set_active(&self, window: Option<WindowHandle>) {
        self.state.lock().active = window;
    }

    pub fn set_pointer(&self, x: i32, y: i32, primary_pressed: bool) {
        let mut state = self.state.lock();
        state.pointer = PointerState {
            x,
            y,
            primary_pressed,
        };
        state.pointer_fails = false;
    }

    pub fn fail_pointer(&self) {
        self.state.lock().pointer_fails = true;
    }

    pub fn set_grant_focus(&self, grant: bool) {
        self.state.lock().grant_focus = grant;
    }

    pub fn set_empty_capture(&self, empty: bool) {
        self.state.lock().empty_capture = empty;
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().events.clone()
    }

    /// Events other than captures, in order
    pub fn input_events(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| !matches!(e, Event::Capture(..)))
            .collect()
    }

    pub fn clear_events(&self) {
        self.state.lock().events.clear();
    }
}

impl FakeState {
    fn window(&self, window: WindowHandle) -> WindowResult<&FakeWindow> {
        self.windows.get(&window).ok_or(WindowError::Stale(window))
    }
}

impl WindowSystem for FakeWindowSystem {
    fn root(&self) -> WindowHandle {
        ROOT
    }

    fn display_size(&self) -> DisplaySize {
        self.display
    }

    fn children(&mut self, window: WindowHandle) -> WindowResult<Vec<WindowHandle>> {
        let state = self.state.lock();
        if state.broken_subtrees.contains(&window) {
            return Err(WindowError::RequestFailed("query_tree".into()));
        }
        Ok(state.window(window)?.children.clone())
    }

    fn title(&mut self, window: WindowHandle) -> WindowResult<Option<String>> {
        Ok(self.state.lock().window(window)?.title.clone())
    }

    fn attributes(&mut self, window: WindowHandle) -> WindowResult<WindowAttributes> {
        let state = self.state.lock();
        let w = state.window(window)?;
        Ok(WindowAttributes {
            width: w.width,
            height: w.height,
            viewable: w.viewable,
        })
    }

    fn origin(&mut self, window: WindowHandle) -> WindowResult<(i32, i32)> {
        let state = self.state.lock();
        let w = state.window(window)?;
        Ok((w.x, w.y))
    }

    fn active_window(&mut self) -> WindowResult<Option<WindowHandle>> {
        Ok(self.state.lock().active)
    }

    fn pointer(&mut self) -> WindowResult<PointerState> {
        let state = self.state.lock();
        if state.pointer_fails {
            return Err(WindowError::RequestFailed("query_pointer".into()));
        }
        Ok(state.pointer)
    }

    fn capture(
        &mut self,
        window: WindowHandle,
        width: u32,
        height: u32,
    ) -> WindowResult<RawImage> {
        let mut state = self.state.lock();
        state.window(window)?;
        state.events.push(Event::Capture(window, width, height));
        if state.empty_capture {
            return Ok(RawImage::new(0, 0, Vec::new()));
        }
        Ok(RawImage::new(
            width,
            height,
            vec![0x80; (width * height * 4) as usize],
        ))
    }

    fn raise(&mut self, window: WindowHandle) -> WindowResult<()> {
        let mut state = self.state.lock();
        state.window(window)?;
        state.events.push(Event::Raise(window));
        Ok(())
    }

    fn focus(&mut self, window: WindowHandle) -> WindowResult<()> {
        let mut state = self.state.lock();
        state.window(window)?;
        state.events.push(Event::Focus(window));
        if state.grant_focus {
            state.focused = Some(window);
        }
        Ok(())
    }

    fn focused_window(&mut self) -> WindowResult<Option<WindowHandle>> {
        Ok(self.state.lock().focused)
    }

    fn set_opacity(&mut self, window: WindowHandle, opacity: f64) -> WindowResult<()> {
        self.state
            .lock()
            .events
            .push(Event::Opacity(window, (opacity * 100.0).round() as u32));
        Ok(())
    }

    fn warp_pointer(&mut self, x: i32, y: i32) -> WindowResult<()> {
        self.state.lock().events.push(Event::Warp(x, y));
        Ok(())
    }

    fn button(&mut self, button: u8, pressed: bool) -> WindowResult<()> {
        self.state.lock().events.push(Event::Button(button, pressed));
        Ok(())
    }

    fn keycode(&mut self, key: &str) -> WindowResult<Option<u8>> {
        Ok(self.state.lock().keymap.get(key).copied())
    }

    fn key(&mut self, keycode: u8, pressed: bool) -> WindowResult<()> {
        self.state.lock().events.push(Event::Key(keycode, pressed));
        Ok(())
    }

    fn flush(&mut self) -> WindowResult<()> {
        Ok(())
    }
}
