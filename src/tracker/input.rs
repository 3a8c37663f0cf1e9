//! Keyboard activity monitor.
//!
//! A background listener thread receives OS key-press events and stamps the
//! shared runtime state. The tick loop asks [`InputActivityMonitor::is_currently_typing`],
//! which expires the typing flag lazily: typing is reported for up to
//! `typing_threshold` after the last key-press, however often it is polled.
//!
//! If the listener cannot start, the monitor reports "not typing" forever and
//! tracking continues.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::core::errors::{Result, TrackerError};
use crate::tracker::runtime::SharedRuntimeState;

pub struct InputActivityMonitor {
    state: SharedRuntimeState,
    typing_threshold: Duration,
    /// Whether a listener is currently delivering events.
    listener_active: Arc<AtomicBool>,
    /// Closed by `stop()`; events arriving afterwards are ignored.
    accepting: Arc<AtomicBool>,
}

impl InputActivityMonitor {
    /// Monitor with no listener attached yet.
    #[must_use]
    pub fn new(state: SharedRuntimeState, typing_threshold: Duration) -> Self {
        Self {
            state,
            typing_threshold,
            listener_active: Arc::new(AtomicBool::new(false)),
            accepting: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Monitor whose key events are delivered by the caller through
    /// [`record_key_press`](Self::record_key_press) instead of an OS listener.
    #[must_use]
    pub fn manual(state: SharedRuntimeState, typing_threshold: Duration) -> Self {
        let monitor = Self::new(state, typing_threshold);
        monitor.listener_active.store(true, Ordering::Relaxed);
        monitor
    }

    /// Start the OS key-press listener on its own thread.
    ///
    /// An error means typing detection is unavailable for this run; it is
    /// never fatal to the caller.
    pub fn start(&self) -> Result<()> {
        self.accepting.store(true, Ordering::Relaxed);
        self.spawn_listener()
    }

    #[cfg(feature = "input")]
    fn spawn_listener(&self) -> Result<()> {
        let state = self.state.clone();
        let active = Arc::clone(&self.listener_active);
        let accepting = Arc::clone(&self.accepting);

        active.store(true, Ordering::Relaxed);
        let spawned = std::thread::Builder::new()
            .name("actrack-keys".to_string())
            .spawn(move || {
                let result = rdev::listen(move |event| {
                    if matches!(event.event_type, rdev::EventType::KeyPress(_))
                        && accepting.load(Ordering::Relaxed)
                    {
                        apply_key_press(&state, Instant::now());
                    }
                });
                active.store(false, Ordering::Relaxed);
                if let Err(err) = result {
                    eprintln!("[ACT-INPUT] key-press listener stopped: {err:?}");
                }
            });

        if let Err(err) = spawned {
            self.listener_active.store(false, Ordering::Relaxed);
            return Err(TrackerError::InputUnavailable {
                details: format!("failed to spawn listener thread: {err}"),
            });
        }
        Ok(())
    }

    #[cfg(not(feature = "input"))]
    fn spawn_listener(&self) -> Result<()> {
        Err(TrackerError::InputUnavailable {
            details: "built without the `input` feature".to_string(),
        })
    }

    /// Stop reacting to key events.
    ///
    /// The OS hook cannot be unregistered portably, so the listener thread is
    /// left parked and its events are discarded until the process exits.
    pub fn stop(&self) {
        self.accepting.store(false, Ordering::Relaxed);
        self.listener_active.store(false, Ordering::Relaxed);
    }

    pub fn set_typing_threshold(&mut self, threshold: Duration) {
        self.typing_threshold = threshold;
    }

    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.listener_active.load(Ordering::Relaxed)
    }

    /// Deliver one key-press. Returns `true` if this press started a typing burst.
    pub fn record_key_press(&self, now: Instant) -> bool {
        if !self.accepting.load(Ordering::Relaxed) {
            return false;
        }
        apply_key_press(&self.state, now)
    }

    /// Whether the user typed within the last `typing_threshold`.
    ///
    /// Clears the stored typing flag once the threshold has passed.
    pub fn is_currently_typing(&self, now: Instant) -> bool {
        if !self.is_listening() {
            return false;
        }
        let threshold = self.typing_threshold;
        self.state.with(|state| {
            let Some(last) = state.last_keypress_time else {
                state.is_typing = false;
                return false;
            };
            if now.saturating_duration_since(last) > threshold {
                state.is_typing = false;
            }
            state.is_typing
        })
    }
}

fn apply_key_press(state: &SharedRuntimeState, now: Instant) -> bool {
    state.with(|s| {
        s.last_keypress_time = Some(now);
        s.record_interaction(now);
        let started = !s.is_typing;
        s.is_typing = true;
        started
    })
}
