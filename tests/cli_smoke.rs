//! CLI smoke tests against the built binary, each with its own tool directory.

mod common;

use std::fs;

use serde_json::Value;

#[test]
fn help_command_prints_usage() {
    let home = tempfile::tempdir().unwrap();
    let result = common::run_cli_case("help_command_prints_usage", home.path(), &["--help"]);
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stdout.contains("Usage: actrack [OPTIONS]"),
        "missing help banner; log: {}",
        result.log_path.display()
    );
    assert!(result.stdout.contains("--summary"));
    assert!(!result.stdout.contains("--max-ticks"));
}

#[test]
fn version_flag_prints_version() {
    let home = tempfile::tempdir().unwrap();
    let result = common::run_cli_case("version_flag_prints_version", home.path(), &["--version"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn configure_writes_default_config() {
    let home = tempfile::tempdir().unwrap();
    let result = common::run_cli_case("configure_writes_default_config", home.path(), &["--configure"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());

    let config_path = home.path().join("activity_config.json");
    assert!(config_path.exists());
    assert!(
        result
            .stdout
            .contains("Configuration file is located at:"),
        "log: {}",
        result.log_path.display()
    );

    let raw: Value = serde_json::from_str(&fs::read_to_string(&config_path).unwrap()).unwrap();
    assert_eq!(raw["samplingInterval"], 30);
    assert_eq!(raw["trackApplications"], true);
    let categories: Vec<&String> = raw["categories"].as_object().unwrap().keys().collect();
    assert!(categories.contains(&&"Coding".to_string()));
}

#[test]
fn configure_json_reports_existing_file() {
    let home = tempfile::tempdir().unwrap();
    common::run_cli_case("configure_json_first", home.path(), &["--configure"]);
    let result = common::run_cli_case(
        "configure_json_reports_existing_file",
        home.path(),
        &["--configure", "--json"],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());

    let payload: Value = serde_json::from_str(result.stdout.trim()).unwrap();
    assert_eq!(payload["command"], "configure");
    assert_eq!(payload["created"], false);
    assert_eq!(payload["config"]["idleThreshold"], 30);
}

#[test]
fn malformed_config_refuses_to_start() {
    let home = tempfile::tempdir().unwrap();
    fs::write(home.path().join("activity_config.json"), "{ not json").unwrap();
    let result = common::run_cli_case("malformed_config_refuses_to_start", home.path(), &[]);
    assert_eq!(result.status.code(), Some(2), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("ACT-1003"));
    assert!(!home.path().join("tracker.jsonl").exists());
}

#[test]
fn report_on_empty_directory() {
    let home = tempfile::tempdir().unwrap();
    let result = common::run_cli_case(
        "report_on_empty_directory",
        home.path(),
        &["--date", "2025-03-07"],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stdout.contains("No activities logged for 2025-03-07."));
    assert!(result.stdout.contains("Report saved to"));

    let saved = fs::read_to_string(home.path().join("report_2025-03-07.txt")).unwrap();
    assert_eq!(saved, "No activities logged for 2025-03-07.");
}

#[test]
fn report_renders_day_file() {
    let home = tempfile::tempdir().unwrap();
    fs::write(
        home.path().join("activity_2025-03-07.json"),
        r#"[
  {
    "timestamp": "2025-03-07T09:00:00+00:00",
    "app": "Editor",
    "title": "main.rs",
    "category": "Coding",
    "durationSeconds": 3600,
    "isTyping": false
  }
]"#,
    )
    .unwrap();

    let result = common::run_cli_case(
        "report_renders_day_file",
        home.path(),
        &["--report", "--date", "2025-03-07", "--no-color"],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stdout.contains("Activity Report for 2025-03-07"));
    assert!(result.stdout.contains("Coding: 1.00 hours (100.0%)"));
    assert!(result.stdout.contains("Editor: 60.0 minutes"));
    assert!(result.stdout.contains("  - Editor: main.rs (60.0 min)"));
}

#[test]
fn report_json_mode() {
    let home = tempfile::tempdir().unwrap();
    fs::write(home.path().join("activity_2025-03-07.json"), "{broken").unwrap();

    let result = common::run_cli_case(
        "report_json_mode",
        home.path(),
        &["--date", "2025-03-07", "--json"],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let payload: Value = serde_json::from_str(result.stdout.trim()).unwrap();
    assert_eq!(payload["command"], "report");
    assert_eq!(payload["status"], "invalid");
    assert!(result.stderr.contains("ACT-3001"));
}

#[test]
fn invalid_date_is_user_error() {
    let home = tempfile::tempdir().unwrap();
    let result = common::run_cli_case(
        "invalid_date_is_user_error",
        home.path(),
        &["--date", "2025-02-30"],
    );
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("invalid date"));
    assert!(fs::read_dir(home.path()).unwrap().next().is_none());
}

#[test]
fn summary_without_data() {
    let home = tempfile::tempdir().unwrap();
    let result = common::run_cli_case("summary_without_data", home.path(), &["--summary"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stdout.contains("No activity data found."));
    assert!(result.stdout.contains("Summary saved to"));
    assert!(home.path().join("complete_summary.txt").exists());
}

#[test]
fn summary_json_lists_days() {
    let home = tempfile::tempdir().unwrap();
    for (date, secs) in [("2025-03-07", 1800), ("2025-03-08", 5400)] {
        fs::write(
            home.path().join(format!("activity_{date}.json")),
            format!(
                r#"[{{"timestamp":"{date}T09:00:00+00:00","app":"Editor","title":"x","category":"Coding","durationSeconds":{secs}}}]"#
            ),
        )
        .unwrap();
    }

    let result = common::run_cli_case("summary_json_lists_days", home.path(), &["--summary", "--json"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let payload: Value = serde_json::from_str(result.stdout.trim()).unwrap();
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["summary"]["totalSeconds"], 7200);
    assert_eq!(payload["summary"]["days"][0]["date"], "2025-03-07");
    assert_eq!(payload["summary"]["days"][1]["seconds"], 5400);
}

#[test]
fn completions_for_bash() {
    let home = tempfile::tempdir().unwrap();
    let result = common::run_cli_case("completions_for_bash", home.path(), &["--completions", "bash"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stdout.contains("actrack"));
}

#[test]
fn bounded_tracking_run_writes_day_file_and_event_log() {
    let home = tempfile::tempdir().unwrap();
    let result = common::run_cli_case(
        "bounded_tracking_run",
        home.path(),
        &["--max-ticks", "1", "--no-keys", "--no-color"],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("[ACT-DAEMON] tracking stopped"));

    let day_files: Vec<_> = fs::read_dir(home.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            name.starts_with("activity_20") && name.ends_with(".json")
        })
        .collect();
    assert_eq!(day_files.len(), 1, "log: {}", result.log_path.display());
    let records: Value =
        serde_json::from_str(&fs::read_to_string(day_files[0].path()).unwrap()).unwrap();
    assert_eq!(records.as_array().unwrap().len(), 1);

    let events = fs::read_to_string(home.path().join("tracker.jsonl")).unwrap();
    assert!(events.contains("\"tracker_start\""));
    assert!(events.contains("\"tracker_stop\""));
}
