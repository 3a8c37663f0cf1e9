//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use activity_tracker::prelude::*;
//! ```

// Core
pub use crate::core::config::{CategoryRule, CategoryRules, Config};
pub use crate::core::errors::{Result, TrackerError};
pub use crate::core::paths::TrackerPaths;

// Platform
pub use crate::platform::pal::{PointerPosition, WindowObservation, WindowProbe, detect_probe};

// Tracker
pub use crate::tracker::classifier::{Category, CategoryConfig, classify};
pub use crate::tracker::idle::{IdleDetector, IdleTransition, InteractionCause};
pub use crate::tracker::input::InputActivityMonitor;
pub use crate::tracker::runtime::SharedRuntimeState;
pub use crate::tracker::sampler::{ActivitySampler, TickOutcome};
pub use crate::tracker::store::{ActivityRecord, ActivityStore, DailyTimeline, MergeOutcome};

// Reports
pub use crate::report::daily::{DailyOutcome, build_daily_report};
pub use crate::report::summary::{SummaryOutcome, build_summary};

// Daemon
#[cfg(feature = "daemon")]
pub use crate::daemon::loop_main::{DaemonArgs, TrackerDaemon};
