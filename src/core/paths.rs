//! Tool directory layout: config file, per-day timelines, reports, event log.

use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::core::errors::{Result, TrackerError};

/// Directory name under `$HOME` holding all tracker state.
pub const TOOL_DIR_NAME: &str = ".activity_tracker";
/// Environment variable overriding the tool directory.
pub const HOME_OVERRIDE_ENV: &str = "ACTRACK_HOME";

const CONFIG_FILE_NAME: &str = "activity_config.json";
const EVENT_LOG_FILE_NAME: &str = "tracker.jsonl";
const SUMMARY_FILE_NAME: &str = "complete_summary.txt";
const DAY_FILE_PREFIX: &str = "activity_";
const DAY_FILE_SUFFIX: &str = ".json";

/// Resolved locations of every file the tracker reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerPaths {
    root: PathBuf,
}

impl TrackerPaths {
    /// Use an explicit tool directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the tool directory from `ACTRACK_HOME`, else `$HOME/.activity_tracker`.
    #[must_use]
    pub fn discover() -> Self {
        if let Some(root) = env::var_os(HOME_OVERRIDE_ENV).filter(|v| !v.is_empty()) {
            return Self::new(root);
        }
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!("[ACT-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths");
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        Self::new(home_dir.join(TOOL_DIR_NAME))
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    #[must_use]
    pub fn event_log(&self) -> PathBuf {
        self.root.join(EVENT_LOG_FILE_NAME)
    }

    /// `activity_<YYYY-MM-DD>.json` for the given local date.
    #[must_use]
    pub fn day_log(&self, date: NaiveDate) -> PathBuf {
        self.root
            .join(format!("{DAY_FILE_PREFIX}{}{DAY_FILE_SUFFIX}", date.format("%Y-%m-%d")))
    }

    #[must_use]
    pub fn daily_report(&self, date: NaiveDate) -> PathBuf {
        self.root
            .join(format!("report_{}.txt", date.format("%Y-%m-%d")))
    }

    #[must_use]
    pub fn summary_report(&self) -> PathBuf {
        self.root.join(SUMMARY_FILE_NAME)
    }

    /// Create the tool directory if it does not exist yet.
    pub fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|source| TrackerError::io(&self.root, source))
    }

    /// Every day file in the tool directory, sorted by date ascending.
    ///
    /// Files whose name does not carry a valid date are ignored.
    pub fn day_logs(&self) -> Result<Vec<(NaiveDate, PathBuf)>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(TrackerError::io(&self.root, source)),
        };

        let mut days: Vec<(NaiveDate, PathBuf)> = entries
            .filter_map(std::result::Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name();
                let date = parse_day_file_name(name.to_str()?)?;
                Some((date, entry.path()))
            })
            .collect();
        days.sort_by_key(|(date, _)| *date);
        Ok(days)
    }
}

/// Replace `path` with `contents` via a sibling `.tmp` file and `rename()`.
///
/// Readers observe either the previous file or the new one, never a partial
/// write. The temp file is removed if any step fails.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut tmp_name = path.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let result = (|| {
        {
            let mut file = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp_path)?;
            file.write_all(contents)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

/// Extract the date from an `activity_<YYYY-MM-DD>.json` file name.
#[must_use]
pub fn parse_day_file_name(name: &str) -> Option<NaiveDate> {
    let stem = name
        .strip_prefix(DAY_FILE_PREFIX)?
        .strip_suffix(DAY_FILE_SUFFIX)?;
    NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn day_log_uses_iso_date() {
        let paths = TrackerPaths::new("/data/tracker");
        assert_eq!(
            paths.day_log(date(2025, 3, 7)),
            PathBuf::from("/data/tracker/activity_2025-03-07.json")
        );
        assert_eq!(
            paths.daily_report(date(2025, 3, 7)),
            PathBuf::from("/data/tracker/report_2025-03-07.txt")
        );
    }

    #[test]
    fn parses_only_well_formed_day_files() {
        assert_eq!(
            parse_day_file_name("activity_2024-12-31.json"),
            Some(date(2024, 12, 31))
        );
        assert_eq!(parse_day_file_name("activity_config.json"), None);
        assert_eq!(parse_day_file_name("activity_2024-13-01.json"), None);
        assert_eq!(parse_day_file_name("report_2024-12-31.txt"), None);
    }

    #[test]
    fn day_logs_are_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "activity_2025-02-01.json",
            "activity_2025-01-15.json",
            "activity_config.json",
            "tracker.jsonl",
        ] {
            fs::write(dir.path().join(name), "[]").unwrap();
        }

        let paths = TrackerPaths::new(dir.path());
        let days: Vec<NaiveDate> = paths.day_logs().unwrap().into_iter().map(|(d, _)| d).collect();
        assert_eq!(days, vec![date(2025, 1, 15), date(2025, 2, 1)]);
    }

    #[test]
    fn atomic_write_replaces_and_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("activity_2025-01-01.json");

        write_atomic(&path, b"[1]").unwrap();
        write_atomic(&path, b"[2]").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "[2]");
        assert!(!dir.path().join("nested").join("activity_2025-01-01.json.tmp").exists());
    }

    #[test]
    fn day_logs_of_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let paths = TrackerPaths::new(dir.path().join("absent"));
        assert!(paths.day_logs().unwrap().is_empty());
    }
}
