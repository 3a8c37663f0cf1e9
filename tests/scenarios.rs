//! End-to-end sampling scenarios: a scripted window probe drives the sampler
//! through the public API and the day file on disk is checked afterwards.

use std::collections::VecDeque;
use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use parking_lot::Mutex;

use activity_tracker::core::config::{CategoryRule, CategoryRules, Config};
use activity_tracker::core::errors::{Result, TrackerError};
use activity_tracker::core::paths::TrackerPaths;
use activity_tracker::logger::events::EventLoggerHandle;
use activity_tracker::platform::pal::{PointerPosition, WindowObservation, WindowProbe};
use activity_tracker::tracker::classifier::{Category, CategoryConfig, classify};
use activity_tracker::tracker::idle::IdleDetector;
use activity_tracker::tracker::input::InputActivityMonitor;
use activity_tracker::tracker::runtime::SharedRuntimeState;
use activity_tracker::tracker::sampler::{ActivitySampler, TickOutcome};
use activity_tracker::tracker::store::{ActivityStore, DailyTimeline, LoadOutcome, MergeOutcome};

type Script = Arc<Mutex<VecDeque<Result<Option<WindowObservation>>>>>;

struct ScriptedProbe {
    windows: Script,
}

impl WindowProbe for ScriptedProbe {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn probe_active_window(&self) -> Result<Option<WindowObservation>> {
        self.windows.lock().pop_front().unwrap_or(Ok(None))
    }

    fn pointer_position(&self) -> Result<Option<PointerPosition>> {
        Ok(None)
    }
}

struct Session {
    sampler: ActivitySampler,
    script: Script,
    paths: TrackerPaths,
    t0: Instant,
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 7).unwrap()
}

/// Config whose idle threshold is out of reach, so only the probe decides.
fn steady_config() -> Config {
    Config {
        idle_threshold: 3_600,
        ..Config::default()
    }
}

impl Session {
    /// A fresh sampler process over the tool directory at `paths`.
    fn start(paths: &TrackerPaths, config: &Config) -> Self {
        let t0 = Instant::now();
        let shared = SharedRuntimeState::new(t0);
        let script: Script = Arc::default();
        let (store, _) = ActivityStore::open(paths.clone(), date());
        let sampler = ActivitySampler::new(
            Box::new(ScriptedProbe {
                windows: Arc::clone(&script),
            }),
            InputActivityMonitor::manual(
                shared.clone(),
                Duration::from_secs_f64(config.typing_threshold),
            ),
            IdleDetector::new(shared, Duration::from_secs(config.idle_threshold)),
            store,
            config,
            EventLoggerHandle::detached(),
        );
        Self {
            sampler,
            script,
            paths: paths.clone(),
            t0,
        }
    }

    fn window(&self, app: &str, title: &str) {
        self.script
            .lock()
            .push_back(Ok(Some(WindowObservation::new(app, title))));
    }

    fn nothing(&self) {
        self.script.lock().push_back(Ok(None));
    }

    fn wall(at_secs: u64) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 7, 9, 0, 0).unwrap()
            + chrono::Duration::seconds(i64::try_from(at_secs).unwrap())
    }

    fn tick(&mut self, at_secs: u64) -> TickOutcome {
        self.sampler
            .tick_at(self.t0 + Duration::from_secs(at_secs), Self::wall(at_secs))
    }

    fn on_disk(&self) -> DailyTimeline {
        match DailyTimeline::load(&self.paths.day_log(date())) {
            LoadOutcome::Loaded(timeline) => timeline,
            other => panic!("day file not loadable: {other:?}"),
        }
    }
}

fn home() -> (tempfile::TempDir, TrackerPaths) {
    let dir = tempfile::tempdir().unwrap();
    let paths = TrackerPaths::new(dir.path());
    (dir, paths)
}

#[test]
fn scenario_a_identical_ticks_merge_into_one_span() {
    let (_dir, paths) = home();
    let mut session = Session::start(&paths, &steady_config());
    for i in 0..3 {
        session.window("Editor", "file.py");
        session.tick(30 * i);
    }

    let timeline = session.on_disk();
    assert_eq!(timeline.len(), 1);
    let record = &timeline.records()[0];
    assert_eq!(record.app, "Editor");
    assert_eq!(record.title, "file.py");
    assert_eq!(record.duration_seconds, 90);
    assert_eq!(record.category, "Coding");
}

#[test]
fn scenario_b_probe_returning_nothing_appends_idle_span() {
    let (_dir, paths) = home();
    let mut session = Session::start(&paths, &steady_config());
    session.window("Editor", "a.py");
    session.tick(0);
    session.nothing();
    let out = session.tick(30);
    assert!(out.idle);
    assert_eq!(out.merge, MergeOutcome::Appended);

    let timeline = session.on_disk();
    let summary: Vec<(&str, &str, &str, u64)> = timeline
        .records()
        .iter()
        .map(|r| {
            (
                r.app.as_str(),
                r.title.as_str(),
                r.category.as_str(),
                r.duration_seconds,
            )
        })
        .collect();
    assert_eq!(
        summary,
        [
            ("Editor", "a.py", "Coding", 30),
            ("Idle", "User inactive", "Idle", 30),
        ]
    );
}

#[test]
fn scenario_c_ignored_app_is_system() {
    let config = CategoryConfig {
        ignored_apps: vec!["explorer.exe".to_string()],
        categories: CategoryRules::default(),
    };
    let obs = WindowObservation::new("explorer.exe", "x");
    assert_eq!(classify(Some(&obs), &config), "System");

    let (_dir, paths) = home();
    let mut session = Session::start(
        &paths,
        &Config {
            ignored_apps: vec!["explorer.exe".to_string()],
            ..steady_config()
        },
    );
    session.window("Explorer.EXE", "x");
    assert_eq!(session.tick(0).record.category, "System");
}

#[test]
fn scenario_d_title_heuristic_when_no_keyword_matches() {
    let config = CategoryConfig {
        ignored_apps: Vec::new(),
        categories: CategoryRules::new(vec![CategoryRule {
            name: "Coding".to_string(),
            keywords: vec!["vscode".to_string()],
        }]),
    };
    let obs = WindowObservation::new("Code.exe", "main.py — VS Code");
    assert_eq!(classify(Some(&obs), &config), Category::new("Coding"));
    assert_eq!(classify(None, &config), "Idle");
}

#[test]
fn scenario_e_invalid_day_file_starts_empty() {
    let (_dir, paths) = home();
    fs::write(paths.day_log(date()), "[{\"timestamp\": ").unwrap();

    let (store, warning) = ActivityStore::open(paths.clone(), date());
    assert!(store.timeline().is_empty());
    let warning = warning.expect("a load warning");
    assert_eq!(warning.code(), "ACT-3001");

    let mut session = Session::start(&paths, &steady_config());
    session.window("Editor", "a.py");
    let out = session.tick(0);
    assert!(out.persist_error.is_none());
    assert_eq!(session.on_disk().len(), 1);
}

#[test]
fn restart_resumes_existing_day_but_starts_a_new_span() {
    let (_dir, paths) = home();
    {
        let mut first = Session::start(&paths, &steady_config());
        first.window("Editor", "a.py");
        first.tick(0);
        first.window("Editor", "a.py");
        first.tick(30);
        assert_eq!(first.on_disk().len(), 1);
    }

    let (store, warning) = ActivityStore::open(paths.clone(), date());
    assert!(warning.is_none());
    assert_eq!(store.timeline().len(), 1);
    assert_eq!(store.timeline().records()[0].duration_seconds, 60);

    let mut second = Session::start(&paths, &steady_config());
    second.window("Editor", "a.py");
    let out = second.tick(60);
    assert_eq!(out.merge, MergeOutcome::Appended);

    let timeline = second.on_disk();
    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline.total_seconds(), 90);
}

#[test]
fn typing_span_updates_in_place() {
    let (_dir, paths) = home();
    let mut session = Session::start(&paths, &steady_config());
    session.window("Editor", "notes.txt");
    session.tick(0);

    session
        .sampler
        .input()
        .record_key_press(session.t0 + Duration::from_secs(29));
    session.window("Editor", "notes.txt");
    session.tick(30);

    session.window("Editor", "notes.txt");
    session.tick(60);

    let timeline = session.on_disk();
    assert_eq!(timeline.len(), 1);
    let record = &timeline.records()[0];
    assert_eq!(record.duration_seconds, 90);
    assert_eq!(record.title, "notes.txt");
    assert_eq!(record.is_typing, Some(false));
}

#[test]
fn idle_threshold_synthesizes_idle_then_recovers_on_title_change() {
    let (_dir, paths) = home();
    let mut session = Session::start(
        &paths,
        &Config {
            idle_threshold: 60,
            ..Config::default()
        },
    );
    for at in [0, 30, 60, 90] {
        session.window("Player", "movie.mkv");
        session.tick(at);
    }
    session.window("Player", "next.mkv");
    let back = session.tick(120);
    assert!(!back.idle);

    let apps: Vec<(String, u64)> = session
        .on_disk()
        .records()
        .iter()
        .map(|r| (r.app.clone(), r.duration_seconds))
        .collect();
    assert_eq!(
        apps,
        [
            ("Player".to_string(), 60),
            ("Idle".to_string(), 30),
            ("Idle".to_string(), 30),
            ("Player".to_string(), 30),
        ]
    );
}

#[test]
fn probe_error_does_not_stop_sampling() {
    let (_dir, paths) = home();
    let mut session = Session::start(&paths, &steady_config());
    session.script.lock().push_back(Err(TrackerError::ProbeFailure {
        backend: "scripted",
        details: "display went away".to_string(),
    }));
    let out = session.tick(0);
    assert!(out.idle);
    session.window("Editor", "a.py");
    assert!(!session.tick(30).idle);
    assert_eq!(session.on_disk().len(), 2);
}

#[test]
fn write_failure_keeps_timeline_in_memory() {
    let (dir, _) = home();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, "").unwrap();

    let t0 = Instant::now();
    let shared = SharedRuntimeState::new(t0);
    let script: Script = Arc::default();
    let (store, _) = ActivityStore::open(TrackerPaths::new(blocker.join("tool")), date());
    let config = steady_config();
    let mut sampler = ActivitySampler::new(
        Box::new(ScriptedProbe {
            windows: Arc::clone(&script),
        }),
        InputActivityMonitor::manual(shared.clone(), Duration::from_secs(2)),
        IdleDetector::new(shared, Duration::from_secs(config.idle_threshold)),
        store,
        &config,
        EventLoggerHandle::detached(),
    );

    for at in [0, 30] {
        script
            .lock()
            .push_back(Ok(Some(WindowObservation::new("Editor", "a.py"))));
        let out = sampler.tick_at(t0 + Duration::from_secs(at), Session::wall(at));
        let err = out.persist_error.expect("write should fail");
        assert_eq!(err.code(), "ACT-3002");
    }
    assert_eq!(sampler.store().timeline().records()[0].duration_seconds, 60);
}

#[test]
fn persisted_file_round_trips_byte_identical() {
    let (_dir, paths) = home();
    let mut session = Session::start(&paths, &steady_config());
    session.window("Editor", "a.py");
    session.tick(0);
    session.window("firefox", "Docs (typing) draft");
    session.tick(30);

    let path = session.paths.day_log(date());
    let first = fs::read_to_string(&path).unwrap();
    let reloaded = session.on_disk();
    assert_eq!(reloaded.to_json_pretty().unwrap(), first);

    let value: serde_json::Value = serde_json::from_str(&first).unwrap();
    let keys: Vec<&String> = value[0].as_object().unwrap().keys().collect();
    for key in ["timestamp", "app", "title", "category", "durationSeconds", "isTyping"] {
        assert!(keys.iter().any(|k| k.as_str() == key), "missing {key}");
    }
}
