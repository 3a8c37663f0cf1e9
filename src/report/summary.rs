//! All-time summary across every day file in the tool directory.

#![allow(missing_docs)]

use std::fmt::Write as _;

use chrono::NaiveDate;
use serde::Serialize;

use crate::core::errors::Result;
use crate::core::paths::TrackerPaths;
use crate::report::{Breakdown, RULE_WIDE, TimeShare, hours, push_heading, push_section};
use crate::tracker::store::{DailyTimeline, LoadOutcome};

const TOP_APPS: usize = 15;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayTotal {
    pub date: NaiveDate,
    pub seconds: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReport {
    pub total_seconds: u64,
    /// Non-empty days, oldest first.
    pub days: Vec<DayTotal>,
    pub categories: Vec<TimeShare>,
    pub top_apps: Vec<TimeShare>,
    /// Day files that could not be read.
    pub skipped: Vec<String>,
}

#[derive(Debug)]
pub enum SummaryOutcome {
    Report(SummaryReport),
    /// No day files at all.
    NoData,
}

impl SummaryOutcome {
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Report(report) => report.render(),
            Self::NoData => "No activity data found.".to_string(),
        }
    }
}

/// Aggregate every `activity_<date>.json` under the tool directory.
///
/// Unreadable files are skipped with a warning.
pub fn build_summary(paths: &TrackerPaths) -> Result<SummaryOutcome> {
    let day_files = paths.day_logs()?;
    if day_files.is_empty() {
        return Ok(SummaryOutcome::NoData);
    }

    let mut breakdown = Breakdown::default();
    let mut days = Vec::new();
    let mut skipped = Vec::new();

    for (date, path) in day_files {
        let timeline = match DailyTimeline::load(&path) {
            LoadOutcome::Loaded(timeline) => timeline,
            LoadOutcome::Missing => continue,
            LoadOutcome::Unreadable(err) => {
                eprintln!("[ACT-REPORT] warning: skipping {}: {err}", path.display());
                skipped.push(path.display().to_string());
                continue;
            }
        };
        if timeline.is_empty() {
            continue;
        }
        days.push(DayTotal {
            date,
            seconds: timeline.total_seconds(),
        });
        breakdown.add_records(timeline.records());
    }

    let total = breakdown.total;
    Ok(SummaryOutcome::Report(SummaryReport {
        total_seconds: total,
        days,
        categories: breakdown.categories.ranked(total, None),
        top_apps: breakdown.apps.ranked(total, Some(TOP_APPS)),
        skipped,
    }))
}

impl SummaryReport {
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        push_heading(&mut out, "Complete Activity Summary", RULE_WIDE);

        push_section(&mut out, "Time by Day:");
        for day in &self.days {
            let _ = writeln!(out, "{}: {:.2} hours", day.date, hours(day.seconds));
        }
        out.push('\n');

        push_section(&mut out, "Time by Category:");
        for share in &self.categories {
            let _ = writeln!(
                out,
                "{}: {:.2} hours ({:.1}%)",
                share.name,
                hours(share.seconds),
                share.percent
            );
        }
        out.push('\n');

        push_section(&mut out, "Time by Application:");
        for share in &self.top_apps {
            let _ = writeln!(out, "{}: {:.2} hours", share.name, hours(share.seconds));
        }
        out
    }
}
