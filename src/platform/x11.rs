//! Native X11 window probe (EWMH properties over an `x11rb` connection).

#![allow(missing_docs)]

use x11rb::connection::Connection;
use x11rb::protocol::xproto::{Atom, AtomEnum, ConnectionExt, Window};
use x11rb::rust_connection::RustConnection;

use crate::core::errors::{Result, TrackerError};
use crate::platform::command::process_name;
use crate::platform::pal::{PointerPosition, WindowObservation, WindowProbe};

const BACKEND: &str = "x11";

fn probe_error(err: impl std::fmt::Display) -> TrackerError {
    TrackerError::ProbeFailure {
        backend: BACKEND,
        details: err.to_string(),
    }
}

struct Atoms {
    net_active_window: Atom,
    net_wm_name: Atom,
    net_wm_pid: Atom,
}

pub struct X11Probe {
    conn: RustConnection,
    root: Window,
    atoms: Atoms,
}

impl X11Probe {
    /// Connect to `$DISPLAY` and intern the EWMH atoms used on every tick.
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).map_err(probe_error)?;
        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .ok_or_else(|| probe_error(format!("screen {screen_num} not found")))?;

        let atoms = Atoms {
            net_active_window: intern(&conn, "_NET_ACTIVE_WINDOW")?,
            net_wm_name: intern(&conn, "_NET_WM_NAME")?,
            net_wm_pid: intern(&conn, "_NET_WM_PID")?,
        };

        Ok(Self { conn, root, atoms })
    }

    fn property(&self, window: Window, atom: Atom, long_length: u32) -> Result<Vec<u8>> {
        let reply = self
            .conn
            .get_property(false, window, atom, AtomEnum::ANY, 0, long_length)
            .map_err(probe_error)?
            .reply()
            .map_err(probe_error)?;
        Ok(reply.value)
    }

    fn active_window(&self) -> Result<Option<Window>> {
        let raw = self.property(self.root, self.atoms.net_active_window, 1)?;
        let id = raw
            .get(..4)
            .map(|b| u32::from_ne_bytes([b[0], b[1], b[2], b[3]]));
        Ok(id.filter(|id| *id != 0))
    }

    fn window_title(&self, window: Window) -> Result<String> {
        let mut raw = self.property(window, self.atoms.net_wm_name, 1024)?;
        if raw.is_empty() {
            raw = self.property(window, AtomEnum::WM_NAME.into(), 1024)?;
        }
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    fn window_pid(&self, window: Window) -> Option<u32> {
        let raw = self.property(window, self.atoms.net_wm_pid, 1).ok()?;
        raw.get(..4)
            .map(|b| u32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn window_class(&self, window: Window) -> Option<String> {
        let raw = self.property(window, AtomEnum::WM_CLASS.into(), 1024).ok()?;
        let text = String::from_utf8_lossy(&raw);
        text.split('\0')
            .find(|part| !part.is_empty())
            .map(str::to_string)
    }
}

fn intern(conn: &RustConnection, name: &str) -> Result<Atom> {
    Ok(conn
        .intern_atom(false, name.as_bytes())
        .map_err(probe_error)?
        .reply()
        .map_err(probe_error)?
        .atom)
}

impl WindowProbe for X11Probe {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn probe_active_window(&self) -> Result<Option<WindowObservation>> {
        let Some(window) = self.active_window()? else {
            return Ok(None);
        };

        let title = self.window_title(window)?;
        let pid = self.window_pid(window);
        let Some(app) = pid
            .and_then(process_name)
            .or_else(|| self.window_class(window))
        else {
            return Ok(None);
        };

        let mut observation = WindowObservation::new(app, title);
        observation.process_id = pid;
        Ok(observation.non_empty())
    }

    fn pointer_position(&self) -> Result<Option<PointerPosition>> {
        let reply = self
            .conn
            .query_pointer(self.root)
            .map_err(probe_error)?
            .reply()
            .map_err(probe_error)?;
        Ok(Some(PointerPosition {
            x: i32::from(reply.root_x),
            y: i32::from(reply.root_y),
        }))
    }
}
