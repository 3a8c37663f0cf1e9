//! Human-readable reports over persisted day files.
//!
//! Reports only read `activity_<date>.json` files; they never touch a running
//! tracker's state.

#![allow(missing_docs)]

pub mod daily;
pub mod summary;

use std::path::Path;

use serde::Serialize;

use crate::core::errors::{Result, TrackerError};
use crate::core::paths::write_atomic;
use crate::tracker::store::ActivityRecord;

const RULE_WIDE: usize = 40;
const RULE_NARROW: usize = 20;

/// Time attributed to one category or application.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeShare {
    pub name: String,
    pub seconds: u64,
    /// Share of the report's total, 0–100.
    pub percent: f64,
}

/// Accumulates durations per key, remembering first-seen order so equal
/// totals keep a stable ranking.
#[derive(Debug, Default)]
struct Tally {
    entries: Vec<(String, u64)>,
}

impl Tally {
    fn add(&mut self, key: &str, seconds: u64) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == key) {
            entry.1 += seconds;
        } else {
            self.entries.push((key.to_string(), seconds));
        }
    }

    /// Largest first; at most `limit` entries.
    fn ranked(mut self, total: u64, limit: Option<usize>) -> Vec<TimeShare> {
        self.entries.sort_by(|a, b| b.1.cmp(&a.1));
        self.entries
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|(name, seconds)| TimeShare {
                name,
                seconds,
                percent: percent(seconds, total),
            })
            .collect()
    }
}

#[derive(Debug, Default)]
struct Breakdown {
    total: u64,
    categories: Tally,
    apps: Tally,
}

impl Breakdown {
    fn add_records(&mut self, records: &[ActivityRecord]) {
        for record in records {
            self.total += record.duration_seconds;
            self.categories
                .add(record.category.as_str(), record.duration_seconds);
            self.apps.add(&record.app, record.duration_seconds);
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

#[allow(clippy::cast_precision_loss)]
fn hours(seconds: u64) -> f64 {
    seconds as f64 / 3600.0
}

#[allow(clippy::cast_precision_loss)]
fn minutes(seconds: u64) -> f64 {
    seconds as f64 / 60.0
}

fn push_heading(out: &mut String, title: &str, width: usize) {
    out.push_str(title);
    out.push('\n');
    out.push_str(&"=".repeat(width));
    out.push_str("\n\n");
}

fn push_section(out: &mut String, title: &str) {
    out.push_str(title);
    out.push('\n');
    out.push_str(&"-".repeat(RULE_NARROW));
    out.push('\n');
}

/// Write a rendered report next to the day files.
pub fn save_report(path: &Path, text: &str) -> Result<()> {
    write_atomic(path, text.as_bytes()).map_err(|source| TrackerError::io(path, source))
}
