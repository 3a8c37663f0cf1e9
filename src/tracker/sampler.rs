//! One sampling tick: observe, infer idleness, classify, merge, persist.
//!
//! The sampler owns every collaborator it needs (probe, input monitor, idle
//! detector, store) and is driven by a single caller, so ticks are strictly
//! sequential and the timeline has exactly one writer.

#![allow(missing_docs)]

use std::time::{Duration, Instant};

use chrono::{DateTime, Local, NaiveDate, SecondsFormat};

use crate::core::config::Config;
use crate::core::errors::TrackerError;
use crate::logger::events::{EventLoggerHandle, TrackerEvent};
use crate::platform::pal::{WindowObservation, WindowProbe};
use crate::tracker::classifier::{CategoryConfig, classify};
use crate::tracker::idle::{IdleDetector, IdleTransition};
use crate::tracker::input::InputActivityMonitor;
use crate::tracker::store::{ActivityRecord, ActivityStore, MergeOutcome, TYPING_SUFFIX};

/// What one tick produced.
#[derive(Debug)]
pub struct TickOutcome {
    /// Day the record was written to.
    pub date: NaiveDate,
    /// The record sampled this tick, before merging.
    pub record: ActivityRecord,
    pub idle: bool,
    pub merge: MergeOutcome,
    pub transition: IdleTransition,
    pub rolled_over: bool,
    /// Set when the day file could not be written; the tick stays in memory.
    pub persist_error: Option<TrackerError>,
}

pub struct ActivitySampler {
    probe: Box<dyn WindowProbe>,
    input: InputActivityMonitor,
    idle: IdleDetector,
    store: ActivityStore,
    categories: CategoryConfig,
    sampling_interval: u64,
    events: EventLoggerHandle,
    probe_failing: bool,
    verbose: bool,
}

impl ActivitySampler {
    #[must_use]
    pub fn new(
        probe: Box<dyn WindowProbe>,
        input: InputActivityMonitor,
        idle: IdleDetector,
        store: ActivityStore,
        config: &Config,
        events: EventLoggerHandle,
    ) -> Self {
        Self {
            probe,
            input,
            idle,
            store,
            categories: CategoryConfig::from(config),
            sampling_interval: config.sampling_interval,
            events,
            probe_failing: false,
            verbose: false,
        }
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Adopt a reloaded configuration. Takes effect from the next tick.
    pub fn apply_config(&mut self, config: &Config) {
        self.categories = CategoryConfig::from(config);
        self.sampling_interval = config.sampling_interval;
        self.idle
            .set_threshold(Duration::from_secs(config.idle_threshold));
        self.input
            .set_typing_threshold(Duration::from_secs_f64(config.typing_threshold));
    }

    #[must_use]
    pub const fn sampling_interval(&self) -> Duration {
        Duration::from_secs(self.sampling_interval)
    }

    #[must_use]
    pub const fn store(&self) -> &ActivityStore {
        &self.store
    }

    #[must_use]
    pub const fn input(&self) -> &InputActivityMonitor {
        &self.input
    }

    #[must_use]
    pub fn probe_name(&self) -> &'static str {
        self.probe.name()
    }

    /// Stop the key-press listener. Further ticks report "not typing".
    pub fn stop_input(&self) {
        self.input.stop();
    }

    pub fn tick(&mut self) -> TickOutcome {
        self.tick_at(Instant::now(), Local::now())
    }

    /// Run one tick as if it happened at `now` (monotonic) and `wall` (local time).
    pub fn tick_at(&mut self, now: Instant, wall: DateTime<Local>) -> TickOutcome {
        let date = wall.date_naive();
        let rolled_over = self.roll_over_if_needed(date);

        // Refresh change-detection inputs. The same observation is reused as
        // the tick's window sample below.
        self.poll_pointer(now);
        let observed = self.poll_window();
        if let Some(window) = &observed {
            self.idle.observe_window_title(&window.title, now);
        }

        let transition = self.idle.check(now);
        self.report_transition(transition);

        let timestamp = wall.to_rfc3339_opts(SecondsFormat::Secs, false);
        let observation = if self.idle.is_idle() { None } else { observed };
        let (record, idle) = match observation {
            None => (
                ActivityRecord::idle(timestamp, self.sampling_interval),
                true,
            ),
            Some(window) => (self.active_record(window, timestamp, now), false),
        };

        let merge = self.store.append_or_merge_last(record.clone(), idle);
        if merge == MergeOutcome::Appended {
            self.events.send(TrackerEvent::SpanStarted {
                date: date.to_string(),
                app: record.app.clone(),
                title: record.title.clone(),
                category: record.category.to_string(),
            });
        }
        if self.verbose {
            eprintln!(
                "[ACT-SAMPLER] {} - {} [{}] {:?}",
                record.app, record.title, record.category, merge
            );
        }

        let persist_error = self.persist();

        TickOutcome {
            date,
            record,
            idle,
            merge,
            transition,
            rolled_over,
            persist_error,
        }
    }

    fn active_record(
        &self,
        window: WindowObservation,
        timestamp: String,
        now: Instant,
    ) -> ActivityRecord {
        let category = classify(Some(&window), &self.categories);
        let typing = self.input.is_currently_typing(now);
        let title = if typing {
            format!("{}{TYPING_SUFFIX}", window.title)
        } else {
            window.title
        };
        ActivityRecord {
            timestamp,
            app: window.app,
            title,
            category,
            duration_seconds: self.sampling_interval,
            is_typing: Some(typing),
        }
    }

    fn roll_over_if_needed(&mut self, date: NaiveDate) -> bool {
        let from = self.store.date();
        if from == date {
            return false;
        }
        eprintln!("[ACT-SAMPLER] day changed {from} -> {date}, switching timeline");
        if let Some(warning) = self.store.roll_over(date) {
            self.events.send(TrackerEvent::TimelineLoadWarning {
                date: date.to_string(),
                code: warning.code().to_string(),
                message: warning.to_string(),
            });
        }
        self.events.send(TrackerEvent::DayRolledOver {
            from: from.to_string(),
            to: date.to_string(),
        });
        true
    }

    fn poll_pointer(&mut self, now: Instant) {
        match self.probe.pointer_position() {
            Ok(Some(position)) => {
                self.idle.observe_pointer(position, now);
            }
            Ok(None) => {}
            Err(err) => {
                if self.verbose {
                    eprintln!("[ACT-PROBE] pointer query failed: {err}");
                }
            }
        }
    }

    /// Query the foreground window. Failures degrade to `None` and are
    /// reported once per failure streak.
    fn poll_window(&mut self) -> Option<WindowObservation> {
        match self.probe.probe_active_window() {
            Ok(observed) => {
                if self.probe_failing {
                    self.probe_failing = false;
                    eprintln!("[ACT-PROBE] {} recovered", self.probe.name());
                    self.events.send(TrackerEvent::ProbeRecovered {
                        backend: self.probe.name().to_string(),
                    });
                }
                observed.and_then(WindowObservation::non_empty)
            }
            Err(err) => {
                if !self.probe_failing {
                    self.probe_failing = true;
                    eprintln!("[ACT-PROBE] {err}; recording idle until it recovers");
                    self.events.send(TrackerEvent::ProbeFailed {
                        backend: self.probe.name().to_string(),
                        code: err.code().to_string(),
                        message: err.to_string(),
                    });
                }
                None
            }
        }
    }

    fn report_transition(&self, transition: IdleTransition) {
        match transition {
            IdleTransition::BecameIdle { idle_for } => {
                self.events.send(TrackerEvent::IdleEntered {
                    idle_for_secs: idle_for.as_secs(),
                });
            }
            IdleTransition::BecameActive { cause } => {
                self.events.send(TrackerEvent::IdleExited {
                    cause: cause.to_string(),
                });
            }
            IdleTransition::Unchanged => {}
        }
    }

    fn persist(&self) -> Option<TrackerError> {
        let err = self.store.persist().err()?;
        if err.is_retryable() {
            eprintln!(
                "[ACT-STORE] failed to persist {} (keeping data in memory, retrying next tick): {err}",
                self.store.date()
            );
        } else {
            eprintln!(
                "[ACT-STORE] failed to persist {} and retrying will not help: {err}",
                self.store.date()
            );
        }
        self.events
            .send(TrackerEvent::timeline_write_failed(&self.store.path(), &err));
        Some(err)
    }
}
