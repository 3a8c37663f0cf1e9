//! Process-wide interaction state shared between the key-press listener and
//! the tick loop.
//!
//! The listener thread only ever writes the keyboard fields; the tick loop
//! owns the rest. Every access goes through one `parking_lot::Mutex`, held for
//! a handful of field reads or writes and never across I/O.

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::platform::pal::PointerPosition;

/// Interaction timestamps and derived flags. Reset on every restart.
#[derive(Debug, Clone)]
pub struct TrackerRuntimeState {
    pub last_interaction_time: Instant,
    pub last_keypress_time: Option<Instant>,
    pub is_typing: bool,
    pub is_idle: bool,
    pub last_observed_window_title: Option<String>,
    pub last_observed_pointer_position: Option<PointerPosition>,
}

impl TrackerRuntimeState {
    #[must_use]
    pub fn new(now: Instant) -> Self {
        Self {
            last_interaction_time: now,
            last_keypress_time: None,
            is_typing: false,
            is_idle: false,
            last_observed_window_title: None,
            last_observed_pointer_position: None,
        }
    }

    /// Record any user interaction observed at `now`. Never moves backwards.
    pub fn record_interaction(&mut self, now: Instant) {
        if now > self.last_interaction_time {
            self.last_interaction_time = now;
        }
    }
}

/// Cloneable handle to the shared state.
#[derive(Debug, Clone)]
pub struct SharedRuntimeState(Arc<Mutex<TrackerRuntimeState>>);

impl SharedRuntimeState {
    #[must_use]
    pub fn new(now: Instant) -> Self {
        Self(Arc::new(Mutex::new(TrackerRuntimeState::new(now))))
    }

    /// Run `f` with exclusive access to the state.
    pub fn with<R>(&self, f: impl FnOnce(&mut TrackerRuntimeState) -> R) -> R {
        let mut guard = self.0.lock();
        f(&mut guard)
    }

    /// Copy of the current state, for logging and tests.
    #[must_use]
    pub fn snapshot(&self) -> TrackerRuntimeState {
        self.0.lock().clone()
    }
}
