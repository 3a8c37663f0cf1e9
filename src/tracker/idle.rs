//! Idle inference from interaction recency.
//!
//! Keyboard events arrive asynchronously through the shared runtime state.
//! Pointer position and foreground title are polled once per tick and compared
//! with the previous tick's values; a change counts as interaction. The first
//! sample of each only seeds the cache.

#![allow(missing_docs)]

use std::fmt;
use std::time::{Duration, Instant};

use crate::platform::pal::PointerPosition;
use crate::tracker::runtime::SharedRuntimeState;

/// What pulled the user out of idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionCause {
    Keyboard,
    Pointer,
    WindowTitle,
}

impl InteractionCause {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Keyboard => "keyboard",
            Self::Pointer => "pointer",
            Self::WindowTitle => "window_title",
        }
    }
}

impl fmt::Display for InteractionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one idle check. Transitions are reported exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleTransition {
    Unchanged,
    BecameIdle { idle_for: Duration },
    BecameActive { cause: InteractionCause },
}

pub struct IdleDetector {
    state: SharedRuntimeState,
    threshold: Duration,
    /// Most recent polled interaction since the last check.
    pending_cause: Option<InteractionCause>,
}

impl IdleDetector {
    pub const DEFAULT_THRESHOLD: Duration = Duration::from_secs(30);

    #[must_use]
    pub fn new(state: SharedRuntimeState, threshold: Duration) -> Self {
        Self {
            state,
            threshold,
            pending_cause: None,
        }
    }

    #[must_use]
    pub const fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: Duration) {
        self.threshold = threshold;
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state.with(|s| s.is_idle)
    }

    /// Compare a polled pointer position against the previous one.
    /// Returns `true` if it moved.
    pub fn observe_pointer(&mut self, position: PointerPosition, now: Instant) -> bool {
        let moved = self.state.with(|s| {
            let previous = s.last_observed_pointer_position.replace(position);
            let moved = previous.is_some_and(|p| p != position);
            if moved {
                s.record_interaction(now);
            }
            moved
        });
        if moved {
            self.pending_cause = Some(InteractionCause::Pointer);
        }
        moved
    }

    /// Compare a polled foreground title against the previous one.
    /// Returns `true` if it changed.
    pub fn observe_window_title(&mut self, title: &str, now: Instant) -> bool {
        let changed = self.state.with(|s| {
            let changed = match s.last_observed_window_title.as_deref() {
                None => {
                    s.last_observed_window_title = Some(title.to_string());
                    false
                }
                Some(previous) if previous != title => {
                    s.last_observed_window_title = Some(title.to_string());
                    true
                }
                Some(_) => false,
            };
            if changed {
                s.record_interaction(now);
            }
            changed
        });
        if changed {
            self.pending_cause = Some(InteractionCause::WindowTitle);
        }
        changed
    }

    /// Evaluate the idle threshold at `now`.
    ///
    /// Enters idle once `now - lastInteraction >= threshold`; leaves it as soon
    /// as any interaction has brought the gap back under the threshold.
    pub fn check(&mut self, now: Instant) -> IdleTransition {
        let threshold = self.threshold;
        let polled = self.pending_cause.take();
        let transition = self.state.with(|s| {
            let idle_for = now.saturating_duration_since(s.last_interaction_time);
            let over = idle_for >= threshold;
            match (s.is_idle, over) {
                (false, true) => {
                    s.is_idle = true;
                    IdleTransition::BecameIdle { idle_for }
                }
                (true, false) => {
                    s.is_idle = false;
                    let keyed_last = s
                        .last_keypress_time
                        .is_some_and(|k| k >= s.last_interaction_time);
                    let cause = if keyed_last {
                        InteractionCause::Keyboard
                    } else {
                        polled.unwrap_or(InteractionCause::Keyboard)
                    };
                    IdleTransition::BecameActive { cause }
                }
                _ => IdleTransition::Unchanged,
            }
        });

        match transition {
            IdleTransition::BecameIdle { idle_for } => {
                eprintln!(
                    "[ACT-IDLE] user is now idle (inactive for {:.1}s)",
                    idle_for.as_secs_f64()
                );
            }
            IdleTransition::BecameActive { cause } => {
                eprintln!("[ACT-IDLE] user no longer idle ({cause} activity)");
            }
            IdleTransition::Unchanged => {}
        }
        transition
    }
}
