//! Window probes backed by external utilities (`xdotool`, `osascript`).
//!
//! Each child process is bounded by a timeout; a child that outlives it is
//! killed and the call fails with `ProbeTimeout` instead of stalling the tick.

#![allow(missing_docs)]

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::core::errors::{Result, TrackerError};
use crate::platform::pal::{PointerPosition, WindowObservation, WindowProbe};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Run `program args...` and return its trimmed stdout.
///
/// Non-zero exit, spawn failure and timeout are all errors tagged with `backend`.
pub fn run_with_timeout(
    backend: &'static str,
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<String> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|err| TrackerError::ProbeFailure {
            backend,
            details: format!("failed to spawn {program}: {err}"),
        })?;

    // Drained concurrently so a chatty child cannot fill the pipe and stall.
    let reader = child.stdout.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = String::new();
            pipe.read_to_string(&mut buf).map(|_| buf)
        })
    });

    let start = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(TrackerError::ProbeFailure {
                    backend,
                    details: format!("failed to wait for {program}: {err}"),
                });
            }
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(TrackerError::ProbeTimeout {
                backend,
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stdout = match reader.map(thread::JoinHandle::join) {
        None => String::new(),
        Some(Ok(Ok(buf))) => buf,
        Some(Ok(Err(err))) => {
            return Err(TrackerError::ProbeFailure {
                backend,
                details: format!("unreadable output from {program}: {err}"),
            });
        }
        Some(Err(_)) => {
            return Err(TrackerError::ProbeFailure {
                backend,
                details: format!("output reader for {program} panicked"),
            });
        }
    };

    if !status.success() {
        return Err(TrackerError::ProbeFailure {
            backend,
            details: format!("{program} {} exited with {status}", args.join(" ")),
        });
    }

    Ok(stdout.trim().to_string())
}

/// Executable name of a running process, from `/proc/<pid>/comm`.
#[must_use]
pub fn process_name(pid: u32) -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        let raw = std::fs::read_to_string(format!("/proc/{pid}/comm")).ok()?;
        let name = raw.trim();
        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = pid;
        None
    }
}

/// Parse `xdotool getmouselocation` output: `x:812 y:433 screen:0 window:6291463`.
#[must_use]
pub fn parse_mouse_location(raw: &str) -> Option<PointerPosition> {
    let mut x = None;
    let mut y = None;
    for field in raw.split_whitespace() {
        if let Some(v) = field.strip_prefix("x:") {
            x = v.parse().ok();
        } else if let Some(v) = field.strip_prefix("y:") {
            y = v.parse().ok();
        }
    }
    Some(PointerPosition { x: x?, y: y? })
}

/// Parse the `{frontApp, windowTitle, frontAppPath}` list printed by `osascript`.
///
/// The title is whatever sits between the first and the last separator, so a
/// title containing `", "` comes through whole.
#[must_use]
pub fn parse_applescript_output(raw: &str) -> Option<WindowObservation> {
    let (rest, _path) = raw.trim().rsplit_once(", ")?;
    let (app, title) = rest.split_once(", ")?;
    WindowObservation::new(app.trim(), title.trim()).non_empty()
}

// ──────────────────── xdotool ────────────────────

/// Linux probe shelling out to `xdotool`.
#[derive(Debug, Clone)]
pub struct XdotoolProbe {
    timeout: Duration,
}

impl XdotoolProbe {
    const BACKEND: &'static str = "xdotool";

    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn xdotool(&self, args: &[&str]) -> Result<String> {
        run_with_timeout(Self::BACKEND, "xdotool", args, self.timeout)
    }
}

impl WindowProbe for XdotoolProbe {
    fn name(&self) -> &'static str {
        Self::BACKEND
    }

    fn probe_active_window(&self) -> Result<Option<WindowObservation>> {
        let window_id = self.xdotool(&["getactivewindow"])?;
        if window_id.is_empty() {
            return Ok(None);
        }

        let title = self.xdotool(&["getwindowname", &window_id])?;
        let pid = self
            .xdotool(&["getwindowpid", &window_id])
            .ok()
            .and_then(|raw| raw.parse::<u32>().ok());

        let app = match pid.and_then(process_name) {
            Some(name) => name,
            None => self.xdotool(&["getwindowclassname", &window_id])?,
        };

        let mut observation = WindowObservation::new(app, title);
        observation.process_id = pid;
        Ok(observation.non_empty())
    }

    fn pointer_position(&self) -> Result<Option<PointerPosition>> {
        let raw = self.xdotool(&["getmouselocation"])?;
        Ok(parse_mouse_location(&raw))
    }
}

// ──────────────────── osascript ────────────────────

const FRONT_WINDOW_SCRIPT: &str = r#"
tell application "System Events"
    set frontApp to name of first application process whose frontmost is true
    set frontAppPath to path of first application process whose frontmost is true
    set windowTitle to ""
    tell process frontApp
        if exists (1st window whose value of attribute "AXMain" is true) then
            set windowTitle to name of 1st window whose value of attribute "AXMain" is true
        end if
    end tell
    return {frontApp, windowTitle, frontAppPath}
end tell
"#;

/// macOS probe running an AppleScript through `osascript`.
#[derive(Debug, Clone)]
pub struct AppleScriptProbe {
    timeout: Duration,
}

impl AppleScriptProbe {
    const BACKEND: &'static str = "osascript";

    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl WindowProbe for AppleScriptProbe {
    fn name(&self) -> &'static str {
        Self::BACKEND
    }

    fn probe_active_window(&self) -> Result<Option<WindowObservation>> {
        let raw = run_with_timeout(
            Self::BACKEND,
            "osascript",
            &["-e", FRONT_WINDOW_SCRIPT],
            self.timeout,
        )?;
        Ok(parse_applescript_output(&raw))
    }

    fn pointer_position(&self) -> Result<Option<PointerPosition>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mouse_location() {
        assert_eq!(
            parse_mouse_location("x:812 y:433 screen:0 window:6291463"),
            Some(PointerPosition { x: 812, y: 433 })
        );
        assert_eq!(parse_mouse_location("screen:0"), None);
        assert_eq!(parse_mouse_location(""), None);
    }

    #[test]
    fn parses_applescript_list() {
        let obs = parse_applescript_output("Safari, Rust docs, Macintosh HD:Applications:Safari.app:")
            .unwrap();
        assert_eq!(obs.app, "Safari");
        assert_eq!(obs.title, "Rust docs");
        assert_eq!(obs.process_id, None);

        let empty_title = parse_applescript_output("Finder, , Macintosh HD:System:Finder.app:")
            .unwrap();
        assert_eq!(empty_title.app, "Finder");
        assert_eq!(empty_title.title, "");

        assert!(parse_applescript_output("Finder").is_none());
        assert!(parse_applescript_output(", title, path").is_none());
    }

    #[test]
    fn applescript_title_keeps_its_commas() {
        let obs = parse_applescript_output(
            "Mail, Inbox, 3 unread, Macintosh HD:System:Applications:Mail.app:",
        )
        .unwrap();
        assert_eq!(obs.app, "Mail");
        assert_eq!(obs.title, "Inbox, 3 unread");
    }

    #[test]
    fn missing_program_is_probe_failure() {
        let err = run_with_timeout(
            "test",
            "definitely-not-a-real-binary-7f3a",
            &[],
            Duration::from_millis(200),
        )
        .unwrap_err();
        assert_eq!(err.code(), "ACT-2001");
    }

    #[cfg(unix)]
    #[test]
    fn captures_stdout_of_successful_child() {
        let out = run_with_timeout("test", "echo", &["hello"], Duration::from_secs(5)).unwrap();
        assert_eq!(out, "hello");
    }

    #[cfg(unix)]
    #[test]
    fn output_larger_than_pipe_buffer_is_read_in_full() {
        let start = Instant::now();
        let out = run_with_timeout(
            "test",
            "sh",
            &["-c", "head -c 200000 /dev/zero | tr '\\0' a"],
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(out.len(), 200_000);
        assert!(out.bytes().all(|b| b == b'a'));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_probe_failure() {
        let err = run_with_timeout("test", "false", &[], Duration::from_secs(5)).unwrap_err();
        assert_eq!(err.code(), "ACT-2001");
    }

    #[cfg(unix)]
    #[test]
    fn slow_child_is_killed_at_timeout() {
        let start = Instant::now();
        let err = run_with_timeout("test", "sleep", &["5"], Duration::from_millis(100)).unwrap_err();
        assert_eq!(err.code(), "ACT-2002");
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn process_name_of_self_is_known() {
        assert!(process_name(std::process::id()).is_some());
        assert!(process_name(u32::MAX).is_none());
    }
}
