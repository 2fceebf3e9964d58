//! X11 window system backend
//!
//! Window tree queries go through the core protocol, capture through the
//! Composite extension (so covered or off-screen windows still render) and
//! synthetic input through XTEST.

use std::collections::{HashMap, HashSet};
use std::fmt::Display;

use tracing::{debug, info, warn};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::errors::ReplyError;
use x11rb::protocol::composite::{self, ConnectionExt as _, Redirect};
use x11rb::protocol::xproto::{
    self, Atom, AtomEnum, ConfigureWindowAux, ConnectionExt as _, ImageFormat, InputFocus,
    KeyButMask, MapState, PropMode, StackMode,
};
use x11rb::protocol::xtest::ConnectionExt as _;
use x11rb::protocol::ErrorKind;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use crate::error::{WindowError, WindowResult};
use crate::window::keysym::keysym_from_name;
use crate::window::system::WindowSystem;
use crate::window::types::{
    DisplaySize, PointerState, RawImage, WindowAttributes, WindowHandle,
};

/// Longest title read from a window property, in 32-bit units
const TITLE_PROPERTY_LENGTH: u32 = 1024;

/// Atoms resolved once at connect time
#[derive(Debug, Clone, Copy)]
struct Atoms {
    net_active_window: Atom,
    net_wm_name: Atom,
    net_wm_window_opacity: Atom,
    utf8_string: Atom,
}

impl Atoms {
    fn intern(conn: &RustConnection) -> WindowResult<Self> {
        let intern = |name: &[u8]| -> WindowResult<Atom> {
            Ok(conn
                .intern_atom(false, name)
                .map_err(unavailable)?
                .reply()
                .map_err(unavailable)?
                .atom)
        };

        Ok(Self {
            net_active_window: intern(b"_NET_ACTIVE_WINDOW")?,
            net_wm_name: intern(b"_NET_WM_NAME")?,
            net_wm_window_opacity: intern(b"_NET_WM_WINDOW_OPACITY")?,
            utf8_string: intern(b"UTF8_STRING")?,
        })
    }
}

/// Window system backed by an X11 connection
pub struct X11WindowSystem {
    conn: RustConnection,
    root: WindowHandle,
    display: DisplaySize,
    atoms: Atoms,
    composite: bool,
    redirected: HashSet<u32>,
    keymap: HashMap<u32, u8>,
}

impl X11WindowSystem {
    /// Connects to the display named by `$DISPLAY`
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` if the display cannot be opened
    pub fn connect() -> WindowResult<Self> {
        let (conn, screen_num) = x11rb::connect(None).map_err(unavailable)?;

        let (root, display) = {
            let screen = conn.setup().roots.get(screen_num).ok_or_else(|| {
                WindowError::Unavailable(format!("screen {} not present", screen_num))
            })?;
            (
                WindowHandle(screen.root),
                DisplaySize::new(
                    u32::from(screen.width_in_pixels),
                    u32::from(screen.height_in_pixels),
                ),
            )
        };

        let atoms = Atoms::intern(&conn)?;
        let composite = Self::init_composite(&conn);
        let keymap = Self::load_keymap(&conn)?;

        let (width, height) = (display.width, display.height);
        info!(
            "Connected to X display ({}x{}, composite: {})",
            width, height, composite
        );

        Ok(Self {
            conn,
            root,
            display,
            atoms,
            composite,
            redirected: HashSet::new(),
            keymap,
        })
    }

    /// Negotiates the Composite extension, false if it is missing
    fn init_composite(conn: &RustConnection) -> bool {
        match conn.extension_information(composite::X11_EXTENSION_NAME) {
            Ok(Some(_)) => {}
            Ok(None) => {
                warn!("Composite extension not available, capturing windows directly");
                return false;
            }
            Err(e) => {
                warn!("Failed to query Composite extension: {}", e);
                return false;
            }
        }

        match conn.composite_query_version(0, 2).map(|cookie| cookie.reply()) {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                warn!("Composite version negotiation failed: {}", e);
                false
            }
            Err(e) => {
                warn!("Composite version negotiation failed: {}", e);
                false
            }
        }
    }

    /// Builds the keysym to keycode table from the server keyboard mapping
    fn load_keymap(conn: &RustConnection) -> WindowResult<HashMap<u32, u8>> {
        let min = conn.setup().min_keycode;
        let max = conn.setup().max_keycode;
        let count = max.saturating_sub(min).saturating_add(1);

        let mapping = conn
            .get_keyboard_mapping(min, count)
            .map_err(unavailable)?
            .reply()
            .map_err(unavailable)?;

        let per_keycode = usize::from(mapping.keysyms_per_keycode.max(1));
        let mut keymap = HashMap::new();
        for (offset, keysyms) in mapping.keysyms.chunks(per_keycode).enumerate() {
            let Ok(offset) = u8::try_from(offset) else {
                break;
            };
            let keycode = min.saturating_add(offset);
            for &keysym in keysyms.iter().filter(|&&keysym| keysym != 0) {
                keymap.entry(keysym).or_insert(keycode);
            }
        }

        debug!("Loaded {} keysyms from keyboard mapping", keymap.len());
        Ok(keymap)
    }

    /// Reads a text property, empty values count as absent
    fn text_property(
        &self,
        window: WindowHandle,
        property: Atom,
        type_: Atom,
    ) -> WindowResult<Option<String>> {
        let reply = self
            .conn
            .get_property(false, window.0, property, type_, 0, TITLE_PROPERTY_LENGTH)
            .map_err(failed)?
            .reply()
            .map_err(|e| stale_or_failed(window, e))?;

        if reply.value.is_empty() {
            Ok(None)
        } else {
            Ok(Some(String::from_utf8_lossy(&reply.value).into_owned()))
        }
    }

    /// Redirects a window off-screen once so its pixmap stays current
    fn ensure_redirected(&mut self, window: WindowHandle) {
        if !self.redirected.insert(window.0) {
            return;
        }

        let result = self
            .conn
            .composite_redirect_window(window.0, Redirect::AUTOMATIC)
            .map_err(failed)
            .and_then(|cookie| cookie.check().map_err(|e| stale_or_failed(window, e)));

        match result {
            Ok(()) => debug!("Redirected window {} for capture", window),
            Err(e) => warn!("Failed to redirect window {}: {}", window, e),
        }
    }

    fn get_image(
        &self,
        window: WindowHandle,
        drawable: u32,
        width: u16,
        height: u16,
    ) -> WindowResult<Vec<u8>> {
        Ok(self
            .conn
            .get_image(ImageFormat::Z_PIXMAP, drawable, 0, 0, width, height, !0)
            .map_err(failed)?
            .reply()
            .map_err(|e| stale_or_failed(window, e))?
            .data)
    }

    fn fake_input(&self, event_type: u8, detail: u8) -> WindowResult<()> {
        self.conn
            .xtest_fake_input(event_type, detail, x11rb::CURRENT_TIME, self.root.0, 0, 0, 0)
            .map_err(failed)?;
        Ok(())
    }
}

impl WindowSystem for X11WindowSystem {
    fn root(&self) -> WindowHandle {
        self.root
    }

    fn display_size(&self) -> DisplaySize {
        self.display
    }

    fn children(&mut self, window: WindowHandle) -> WindowResult<Vec<WindowHandle>> {
        let reply = self
            .conn
            .query_tree(window.0)
            .map_err(failed)?
            .reply()
            .map_err(|e| stale_or_failed(window, e))?;

        Ok(reply.children.into_iter().map(WindowHandle).collect())
    }

    fn title(&mut self, window: WindowHandle) -> WindowResult<Option<String>> {
        let atoms = self.atoms;
        if let Some(title) = self.text_property(window, atoms.net_wm_name, atoms.utf8_string)? {
            return Ok(Some(title));
        }
        self.text_property(window, AtomEnum::WM_NAME.into(), AtomEnum::ANY.into())
    }

    fn attributes(&mut self, window: WindowHandle) -> WindowResult<WindowAttributes> {
        let attributes = self
            .conn
            .get_window_attributes(window.0)
            .map_err(failed)?
            .reply()
            .map_err(|e| stale_or_failed(window, e))?;

        let geometry = self
            .conn
            .get_geometry(window.0)
            .map_err(failed)?
            .reply()
            .map_err(|e| stale_or_failed(window, e))?;

        Ok(WindowAttributes {
            width: u32::from(geometry.width),
            height: u32::from(geometry.height),
            viewable: attributes.map_state == MapState::VIEWABLE,
        })
    }

    fn origin(&mut self, window: WindowHandle) -> WindowResult<(i32, i32)> {
        let reply = self
            .conn
            .translate_coordinates(window.0, self.root.0, 0, 0)
            .map_err(failed)?
            .reply()
            .map_err(|e| stale_or_failed(window, e))?;

        Ok((i32::from(reply.dst_x), i32::from(reply.dst_y)))
    }

    fn active_window(&mut self) -> WindowResult<Option<WindowHandle>> {
        let reply = self
            .conn
            .get_property(
                false,
                self.root.0,
                self.atoms.net_active_window,
                AtomEnum::WINDOW,
                0,
                1,
            )
            .map_err(failed)?
            .reply()
            .map_err(failed)?;

        Ok(reply
            .value32()
            .and_then(|mut values| values.next())
            .filter(|&id| id != 0)
            .map(WindowHandle))
    }

    fn pointer(&mut self) -> WindowResult<PointerState> {
        let reply = self
            .conn
            .query_pointer(self.root.0)
            .map_err(failed)?
            .reply()
            .map_err(failed)?;

        Ok(PointerState {
            x: i32::from(reply.root_x),
            y: i32::from(reply.root_y),
            primary_pressed: u16::from(reply.mask) & u16::from(KeyButMask::BUTTON1) != 0,
        })
    }

    fn capture(
        &mut self,
        window: WindowHandle,
        width: u32,
        height: u32,
    ) -> WindowResult<RawImage> {
        let w = u16::try_from(width).unwrap_or(u16::MAX);
        let h = u16::try_from(height).unwrap_or(u16::MAX);
        if w == 0 || h == 0 {
            return Err(WindowError::EmptyCapture(window));
        }

        let bgrx = if self.composite {
            self.ensure_redirected(window);

            let pixmap = self.conn.generate_id().map_err(failed)?;
            self.conn
                .composite_name_window_pixmap(window.0, pixmap)
                .map_err(failed)?
                .check()
                .map_err(|e| stale_or_failed(window, e))?;

            let image = self.get_image(window, pixmap, w, h);
            if let Err(e) = self.conn.free_pixmap(pixmap) {
                debug!("Failed to free capture pixmap: {}", e);
            }
            image?
        } else {
            self.get_image(window, window.0, w, h)?
        };

        // ZPixmap at depth 24/32 is BGRX
        let mut rgba = Vec::with_capacity(bgrx.len());
        for chunk in bgrx.chunks_exact(4) {
            rgba.push(chunk[2]); // R
            rgba.push(chunk[1]); // G
            rgba.push(chunk[0]); // B
            rgba.push(255); // A
        }

        Ok(RawImage::new(u32::from(w), u32::from(h), rgba))
    }

    fn raise(&mut self, window: WindowHandle) -> WindowResult<()> {
        self.conn
            .configure_window(window.0, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))
            .map_err(failed)?
            .check()
            .map_err(|e| stale_or_failed(window, e))
    }

    fn focus(&mut self, window: WindowHandle) -> WindowResult<()> {
        self.conn
            .set_input_focus(InputFocus::PARENT, window.0, x11rb::CURRENT_TIME)
            .map_err(failed)?
            .check()
            .map_err(|e| stale_or_failed(window, e))
    }

    fn focused_window(&mut self) -> WindowResult<Option<WindowHandle>> {
        let reply = self
            .conn
            .get_input_focus()
            .map_err(failed)?
            .reply()
            .map_err(failed)?;

        // 0 is None and 1 is PointerRoot
        Ok(match reply.focus {
            0 | 1 => None,
            id => Some(WindowHandle(id)),
        })
    }

    fn set_opacity(&mut self, window: WindowHandle, opacity: f64) -> WindowResult<()> {
        let atom = self.atoms.net_wm_window_opacity;
        let cookie = if opacity >= 1.0 {
            self.conn.delete_property(window.0, atom).map_err(failed)?
        } else {
            let value = (opacity.max(0.0) * f64::from(u32::MAX)) as u32;
            self.conn
                .change_property32(PropMode::REPLACE, window.0, atom, AtomEnum::CARDINAL, &[value])
                .map_err(failed)?
        };
        cookie.check().map_err(|e| stale_or_failed(window, e))
    }

    fn warp_pointer(&mut self, x: i32, y: i32) -> WindowResult<()> {
        let x = i16::try_from(x).unwrap_or(if x < 0 { i16::MIN } else { i16::MAX });
        let y = i16::try_from(y).unwrap_or(if y < 0 { i16::MIN } else { i16::MAX });
        self.conn
            .warp_pointer(x11rb::NONE, self.root.0, 0, 0, 0, 0, x, y)
            .map_err(failed)?;
        Ok(())
    }

    fn button(&mut self, button: u8, pressed: bool) -> WindowResult<()> {
        let event_type = if pressed {
            xproto::BUTTON_PRESS_EVENT
        } else {
            xproto::BUTTON_RELEASE_EVENT
        };
        self.fake_input(event_type, button)
    }

    fn keycode(&mut self, key: &str) -> WindowResult<Option<u8>> {
        Ok(keysym_from_name(key).and_then(|keysym| self.keymap.get(&keysym).copied()))
    }

    fn key(&mut self, keycode: u8, pressed: bool) -> WindowResult<()> {
        let event_type = if pressed {
            xproto::KEY_PRESS_EVENT
        } else {
            xproto::KEY_RELEASE_EVENT
        };
        self.fake_input(event_type, keycode)
    }

    fn flush(&mut self) -> WindowResult<()> {
        self.conn.flush().map_err(failed)
    }
}

fn unavailable<E: Display>(err: E) -> WindowError {
    WindowError::Unavailable(err.to_string())
}

fn failed<E: Display>(err: E) -> WindowError {
    WindowError::RequestFailed(err.to_string())
}

/// BadWindow and BadDrawable mean the handle no longer names a window
fn stale_or_failed(window: WindowHandle, err: ReplyError) -> WindowError {
    match &err {
        ReplyError::X11Error(x11)
            if matches!(x11.error_kind, ErrorKind::Window | ErrorKind::Drawable) =>
        {
            WindowError::Stale(window)
        }
        _ => failed(err),
    }
}
