//! Report for a single day: category and application totals plus the
//! activity list grouped by hour.

#![allow(missing_docs)]

use std::fmt::Write as _;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;

use crate::core::errors::TrackerError;
use crate::core::paths::TrackerPaths;
use crate::report::{
    Breakdown, RULE_WIDE, TimeShare, hours, minutes, push_heading, push_section,
};
use crate::tracker::store::{ActivityRecord, DailyTimeline, LoadOutcome};

const TOP_APPS: usize = 10;
const MIN_LISTED_SECONDS: u64 = 60;
const TITLE_WIDTH: usize = 50;
const UNKNOWN_HOUR: &str = "unknown";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLine {
    pub app: String,
    pub title: String,
    pub duration_seconds: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourBlock {
    /// `HH:00` of the span start, in the timestamp's own offset.
    pub hour: String,
    /// Spans of at least one minute that started in this hour.
    pub activities: Vec<ActivityLine>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    pub date: NaiveDate,
    pub total_seconds: u64,
    pub categories: Vec<TimeShare>,
    pub top_apps: Vec<TimeShare>,
    pub hours: Vec<HourBlock>,
}

#[derive(Debug)]
pub enum DailyOutcome {
    Report(DailyReport),
    /// No file, or a file with no records.
    NoActivities(NaiveDate),
    Invalid {
        date: NaiveDate,
        error: TrackerError,
    },
}

impl DailyOutcome {
    /// Text form, as printed and saved to `report_<date>.txt`.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Report(report) => report.render(),
            Self::NoActivities(date) => format!("No activities logged for {date}."),
            Self::Invalid { date, .. } => format!("Error: Invalid activity data for {date}."),
        }
    }
}

/// Load `date`'s file and aggregate it.
#[must_use]
pub fn build_daily_report(paths: &TrackerPaths, date: NaiveDate) -> DailyOutcome {
    match DailyTimeline::load(&paths.day_log(date)) {
        LoadOutcome::Missing => DailyOutcome::NoActivities(date),
        LoadOutcome::Unreadable(error) => DailyOutcome::Invalid { date, error },
        LoadOutcome::Loaded(timeline) if timeline.is_empty() => DailyOutcome::NoActivities(date),
        LoadOutcome::Loaded(timeline) => {
            DailyOutcome::Report(DailyReport::from_records(date, timeline.records()))
        }
    }
}

impl DailyReport {
    #[must_use]
    pub fn from_records(date: NaiveDate, records: &[ActivityRecord]) -> Self {
        let mut breakdown = Breakdown::default();
        breakdown.add_records(records);
        let total = breakdown.total;

        let mut hours: Vec<HourBlock> = Vec::new();
        for record in records {
            let hour = start_hour(&record.timestamp)
                .map_or_else(|| UNKNOWN_HOUR.to_string(), |h| format!("{h:02}:00"));
            let index = match hours.iter().position(|b| b.hour == hour) {
                Some(index) => index,
                None => {
                    hours.push(HourBlock {
                        hour,
                        activities: Vec::new(),
                    });
                    hours.len() - 1
                }
            };
            if record.duration_seconds >= MIN_LISTED_SECONDS {
                hours[index].activities.push(ActivityLine {
                    app: record.app.clone(),
                    title: record.title.clone(),
                    duration_seconds: record.duration_seconds,
                });
            }
        }
        // "unknown" sorts after every "HH:00".
        hours.sort_by(|a, b| a.hour.cmp(&b.hour));

        Self {
            date,
            total_seconds: total,
            categories: breakdown.categories.ranked(total, None),
            top_apps: breakdown.apps.ranked(total, Some(TOP_APPS)),
            hours,
        }
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        push_heading(&mut out, &format!("Activity Report for {}", self.date), RULE_WIDE);

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
            let _ = writeln!(out, "{}: {:.1} minutes", share.name, minutes(share.seconds));
        }
        out.push('\n');

        push_section(&mut out, "Detailed Activities:");
        for block in &self.hours {
            let _ = writeln!(out, "\n{}", block.hour);
            for line in &block.activities {
                let _ = writeln!(
                    out,
                    "  - {}: {} ({:.1} min)",
                    line.app,
                    truncate_title(&line.title),
                    minutes(line.duration_seconds)
                );
            }
        }
        out
    }
}

/// Hour of a span start. Accepts RFC 3339 and offset-less ISO timestamps.
fn start_hour(timestamp: &str) -> Option<u32> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(parsed.hour());
    }
    NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|parsed| parsed.hour())
}

fn truncate_title(title: &str) -> String {
    let mut chars = title.chars();
    let head: String = chars.by_ref().take(TITLE_WIDTH).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
