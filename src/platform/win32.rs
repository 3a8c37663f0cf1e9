//! Win32 foreground-window probe.
//!
//! `GetForegroundWindow` picks the window and `GetWindowTextW` gives its
//! title. The app name is the owning process's image file name
//! (`explorer.exe`, `Code.exe`). Elevated processes refuse `OpenProcess`, so
//! their window class name stands in.

#![allow(missing_docs)]

#[cfg(windows)]
pub use probe::Win32Probe;

/// File-name part of a process image path. Either separator is accepted.
#[must_use]
pub fn image_file_name(path: &str) -> Option<String> {
    let name = path.trim().rsplit(['\\', '/']).next()?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(windows)]
#[allow(unsafe_code)]
mod probe {
    // Each unsafe block is a single Win32 query on a handle the OS just
    // returned, writing into a buffer owned here.

    use windows::Win32::Foundation::{CloseHandle, HWND, POINT};
    use windows::Win32::System::Threading::{
        OpenProcess, PROCESS_NAME_FORMAT, PROCESS_QUERY_LIMITED_INFORMATION,
        QueryFullProcessImageNameW,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        GetClassNameW, GetCursorPos, GetForegroundWindow, GetWindowTextLengthW, GetWindowTextW,
        GetWindowThreadProcessId,
    };
    use windows::core::PWSTR;

    use super::image_file_name;
    use crate::core::errors::{Result, TrackerError};
    use crate::platform::pal::{PointerPosition, WindowObservation, WindowProbe};

    const BACKEND: &str = "win32";

    /// Stateless: every call queries the current foreground window.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct Win32Probe;

    impl Win32Probe {
        #[must_use]
        pub const fn new() -> Self {
            Self
        }
    }

    fn window_title(hwnd: HWND) -> String {
        let len = unsafe { GetWindowTextLengthW(hwnd) };
        let len = usize::try_from(len).unwrap_or(0);
        if len == 0 {
            return String::new();
        }
        let mut buf = vec![0u16; len + 1];
        let read = unsafe { GetWindowTextW(hwnd, &mut buf) };
        let read = usize::try_from(read).unwrap_or(0).min(buf.len());
        String::from_utf16_lossy(&buf[..read])
    }

    fn window_class(hwnd: HWND) -> Option<String> {
        let mut buf = [0u16; 256];
        let len = unsafe { GetClassNameW(hwnd, &mut buf) };
        let len = usize::try_from(len).ok()?.min(buf.len());
        let class = String::from_utf16_lossy(&buf[..len]);
        if class.trim().is_empty() {
            None
        } else {
            Some(class)
        }
    }

    fn process_image_name(pid: u32) -> Option<String> {
        let handle = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid) }.ok()?;
        let mut buf = [0u16; 1024];
        let mut size = 1024u32;
        let queried = unsafe {
            QueryFullProcessImageNameW(
                handle,
                PROCESS_NAME_FORMAT(0),
                PWSTR(buf.as_mut_ptr()),
                &mut size,
            )
        }
        .is_ok();
        let _ = unsafe { CloseHandle(handle) };
        if !queried {
            return None;
        }
        let len = usize::try_from(size).ok()?.min(buf.len());
        image_file_name(&String::from_utf16_lossy(&buf[..len]))
    }

    impl WindowProbe for Win32Probe {
        fn name(&self) -> &'static str {
            BACKEND
        }

        fn probe_active_window(&self) -> Result<Option<WindowObservation>> {
            let hwnd = unsafe { GetForegroundWindow() };
            if hwnd.0.is_null() {
                return Ok(None);
            }

            let mut pid = 0u32;
            let _ = unsafe { GetWindowThreadProcessId(hwnd, Some(&mut pid)) };
            let pid = (pid != 0).then_some(pid);

            let app = pid
                .and_then(process_image_name)
                .or_else(|| window_class(hwnd))
                .unwrap_or_default();
            let mut observation = WindowObservation::new(app, window_title(hwnd));
            observation.process_id = pid;
            Ok(observation.non_empty())
        }

        fn pointer_position(&self) -> Result<Option<PointerPosition>> {
            let mut point = POINT::default();
            unsafe { GetCursorPos(&mut point) }.map_err(|err| TrackerError::ProbeFailure {
                backend: BACKEND,
                details: format!("GetCursorPos failed: {err}"),
            })?;
            Ok(Some(PointerPosition {
                x: point.x,
                y: point.y,
            }))
        }
    }
}
