#![deny(unsafe_code)]

//! Activity Tracker: samples the foreground window on a fixed interval and
//! records it into a per-day timeline of merged activity spans.
//!
//! Each tick classifies the active application into a category, marks spans
//! where the user was typing, and records idle periods once no keyboard,
//! pointer or window-title change has been seen for the idle threshold.
//!
//! # Library usage
//!
//! ```rust,no_run
//! use activity_tracker::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use activity_tracker::core::config::Config;
//! use activity_tracker::tracker::store::{ActivityStore, DailyTimeline};
//! ```

pub mod prelude;

pub mod core;
#[cfg(feature = "daemon")]
pub mod daemon;
pub mod logger;
pub mod platform;
pub mod report;
pub mod tracker;
