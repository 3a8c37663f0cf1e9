//! Per-day activity timeline and its JSON file.
//!
//! The timeline is append-only: only the last record may change, and only by
//! growing its duration and refreshing its title and typing flag. Every
//! persist rewrites the whole day file through a temp file and `rename()`, so
//! a crash leaves either the previous or the new version on disk.
//!
//! Continuation is decided by an in-process merge key. After a restart the
//! first tick always appends, even if it repeats the file's last record.

#![allow(missing_docs)]

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, TrackerError};
use crate::core::paths::{TrackerPaths, write_atomic};
use crate::tracker::classifier::Category;

/// Marker appended to the stored title while the user is typing.
pub const TYPING_SUFFIX: &str = " (typing)";
pub const IDLE_APP: &str = "Idle";
pub const IDLE_TITLE: &str = "User inactive";

/// One contiguous span of the same activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    /// Local start of the span, RFC 3339.
    pub timestamp: String,
    pub app: String,
    pub title: String,
    pub category: Category,
    #[serde(alias = "duration")]
    pub duration_seconds: u64,
    #[serde(default, alias = "is_typing", skip_serializing_if = "Option::is_none")]
    pub is_typing: Option<bool>,
}

impl ActivityRecord {
    /// The synthetic record written for idle ticks.
    #[must_use]
    pub fn idle(timestamp: impl Into<String>, duration_seconds: u64) -> Self {
        Self {
            timestamp: timestamp.into(),
            app: IDLE_APP.to_string(),
            title: IDLE_TITLE.to_string(),
            category: Category::idle(),
            duration_seconds,
            is_typing: None,
        }
    }

    /// Title with the typing marker removed, as used for span comparison.
    #[must_use]
    pub fn base_title(&self) -> &str {
        strip_typing_suffix(&self.title)
    }
}

#[must_use]
pub fn strip_typing_suffix(title: &str) -> &str {
    title.strip_suffix(TYPING_SUFFIX).unwrap_or(title)
}

/// Ordered records of one local calendar day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DailyTimeline {
    records: Vec<ActivityRecord>,
}

impl DailyTimeline {
    #[must_use]
    pub fn new(records: Vec<ActivityRecord>) -> Self {
        Self { records }
    }

    #[must_use]
    pub fn records(&self) -> &[ActivityRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&ActivityRecord> {
        self.records.last()
    }

    #[must_use]
    pub fn total_seconds(&self) -> u64 {
        self.records.iter().map(|r| r.duration_seconds).sum()
    }

    /// Pretty-printed JSON array, exactly as written to disk.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a day file. Never fails: see [`LoadOutcome`].
    #[must_use]
    pub fn load(path: &Path) -> LoadOutcome {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return LoadOutcome::Missing,
            Err(err) => {
                return LoadOutcome::Unreadable(TrackerError::TimelineRead {
                    path: path.to_path_buf(),
                    details: err.to_string(),
                });
            }
        };
        match serde_json::from_str::<Self>(&raw) {
            Ok(timeline) => LoadOutcome::Loaded(timeline),
            Err(err) => LoadOutcome::Unreadable(TrackerError::TimelineRead {
                path: path.to_path_buf(),
                details: err.to_string(),
            }),
        }
    }
}

/// Result of reading a day file.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(DailyTimeline),
    /// No file yet for that day.
    Missing,
    /// Malformed JSON or an IO error. Callers continue with an empty timeline.
    Unreadable(TrackerError),
}

impl LoadOutcome {
    /// The effective timeline and, if the file was unusable, the reason.
    #[must_use]
    pub fn into_parts(self) -> (DailyTimeline, Option<TrackerError>) {
        match self {
            Self::Loaded(timeline) => (timeline, None),
            Self::Missing => (DailyTimeline::default(), None),
            Self::Unreadable(err) => (DailyTimeline::default(), Some(err)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MergeKey {
    app: String,
    base_title: String,
}

/// What `append_or_merge_last` did with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Appended,
    Extended { duration_seconds: u64 },
}

/// Owner of the current day's timeline.
pub struct ActivityStore {
    paths: TrackerPaths,
    date: NaiveDate,
    timeline: DailyTimeline,
    /// Key of the last record written by this process; `None` after idle,
    /// after a restart and after a day switch.
    last_key: Option<MergeKey>,
}

impl ActivityStore {
    /// Open `date`'s timeline. An unusable file yields an empty timeline plus
    /// the warning, which is also printed.
    #[must_use]
    pub fn open(paths: TrackerPaths, date: NaiveDate) -> (Self, Option<TrackerError>) {
        let (timeline, warning) = load_day(&paths, date);
        let store = Self {
            paths,
            date,
            timeline,
            last_key: None,
        };
        (store, warning)
    }

    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.paths.day_log(self.date)
    }

    #[must_use]
    pub const fn timeline(&self) -> &DailyTimeline {
        &self.timeline
    }

    /// Extend the last record if `record` continues it, otherwise append.
    ///
    /// Idle records never continue anything and are never continued.
    pub fn append_or_merge_last(&mut self, record: ActivityRecord, idle: bool) -> MergeOutcome {
        let key = (!idle).then(|| MergeKey {
            app: record.app.clone(),
            base_title: record.base_title().to_string(),
        });

        if key.is_some() && key == self.last_key
            && let Some(last) = self.timeline.records.last_mut()
        {
            last.duration_seconds += record.duration_seconds;
            last.title = record.title;
            if record.is_typing.is_some() {
                last.is_typing = record.is_typing;
            }
            return MergeOutcome::Extended {
                duration_seconds: last.duration_seconds,
            };
        }

        self.timeline.records.push(record);
        self.last_key = key;
        MergeOutcome::Appended
    }

    /// Rewrite the day file with the full timeline.
    pub fn persist(&self) -> Result<()> {
        let path = self.path();
        let json = self.timeline.to_json_pretty()?;
        write_atomic(&path, json.as_bytes())
            .map_err(|source| TrackerError::TimelineWrite { path, source })
    }

    /// Switch to another day's timeline, loading its file if present.
    ///
    /// The previous day is not written here; it was persisted at its last tick.
    pub fn roll_over(&mut self, date: NaiveDate) -> Option<TrackerError> {
        let (timeline, warning) = load_day(&self.paths, date);
        self.date = date;
        self.timeline = timeline;
        self.last_key = None;
        warning
    }
}

fn load_day(paths: &TrackerPaths, date: NaiveDate) -> (DailyTimeline, Option<TrackerError>) {
    let (timeline, warning) = DailyTimeline::load(&paths.day_log(date)).into_parts();
    if let Some(err) = &warning {
        eprintln!("[ACT-STORE] warning: starting {date} with an empty timeline: {err}");
    }
    (timeline, warning)
}
