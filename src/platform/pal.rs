//! Window-probe abstraction and backend selection.
//!
//! The sampler never talks to the OS directly: it owns one `WindowProbe`
//! chosen at startup by [`detect_probe`]. Every backend reports failures as
//! `Err` or `Ok(None)`; the caller decides how to degrade.

#![allow(missing_docs)]

use std::time::Duration;

use crate::core::errors::Result;

/// Foreground window at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowObservation {
    pub app: String,
    pub title: String,
    pub process_id: Option<u32>,
}

impl WindowObservation {
    #[must_use]
    pub fn new(app: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            title: title.into(),
            process_id: None,
        }
    }

    #[must_use]
    pub fn with_process_id(mut self, pid: u32) -> Self {
        self.process_id = Some(pid);
        self
    }

    /// Drop observations that carry no application name.
    #[must_use]
    pub fn non_empty(self) -> Option<Self> {
        if self.app.trim().is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

/// Pointer location in root-window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerPosition {
    pub x: i32,
    pub y: i32,
}

/// OS query surface consumed by the sampler.
pub trait WindowProbe: Send {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Current foreground window, or `None` when nothing is focused.
    fn probe_active_window(&self) -> Result<Option<WindowObservation>>;

    /// Current pointer position, or `None` when the backend cannot tell.
    fn pointer_position(&self) -> Result<Option<PointerPosition>>;
}

/// Backend for platforms without any supported window query.
///
/// Every tick becomes idle.
#[derive(Debug, Default)]
pub struct UnsupportedProbe;

impl WindowProbe for UnsupportedProbe {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    fn probe_active_window(&self) -> Result<Option<WindowObservation>> {
        Ok(None)
    }

    fn pointer_position(&self) -> Result<Option<PointerPosition>> {
        Ok(None)
    }
}

/// Pick the best available backend for this machine.
///
/// Linux prefers a native X11 connection and falls back to `xdotool`; macOS
/// uses `osascript` and Windows queries Win32 directly. External utilities
/// are bounded by `timeout`.
#[must_use]
pub fn detect_probe(timeout: Duration) -> Box<dyn WindowProbe> {
    #[cfg(all(target_os = "linux", feature = "x11"))]
    {
        match crate::platform::x11::X11Probe::connect() {
            Ok(probe) => return Box::new(probe),
            Err(err) => {
                eprintln!("[ACT-PROBE] native X11 probe unavailable, using xdotool: {err}");
            }
        }
    }

    #[cfg(target_os = "linux")]
    {
        Box::new(crate::platform::command::XdotoolProbe::new(timeout))
    }

    #[cfg(target_os = "macos")]
    {
        Box::new(crate::platform::command::AppleScriptProbe::new(timeout))
    }

    #[cfg(windows)]
    {
        let _ = timeout;
        Box::new(crate::platform::win32::Win32Probe::new())
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
    {
        let _ = timeout;
        eprintln!("[ACT-PROBE] no window probe for this platform; every tick will be idle");
        Box::new(UnsupportedProbe)
    }
}
