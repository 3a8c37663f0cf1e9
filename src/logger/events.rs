//! Structured tracker events and the logger thread that records them.
//!
//! A dedicated thread owns the [`JsonlWriter`]. The tick loop and the
//! key-press listener send [`TrackerEvent`]s through a bounded crossbeam
//! channel with `try_send()`, so a slow disk never delays a tick.

#![allow(missing_docs)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::core::errors::{Result, TrackerError};
use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub enum TrackerEvent {
    TrackerStarted {
        version: String,
        config_hash: String,
        probe: String,
        typing_available: bool,
    },
    TrackerStopped {
        reason: String,
        uptime_secs: u64,
    },
    /// A new record was appended to the day's timeline.
    SpanStarted {
        date: String,
        app: String,
        title: String,
        category: String,
    },
    IdleEntered {
        idle_for_secs: u64,
    },
    IdleExited {
        cause: String,
    },
    TypingUnavailable {
        code: String,
        message: String,
    },
    ProbeFailed {
        backend: String,
        code: String,
        message: String,
    },
    ProbeRecovered {
        backend: String,
    },
    TimelineLoadWarning {
        date: String,
        code: String,
        message: String,
    },
    TimelineWriteFailed {
        path: String,
        code: String,
        message: String,
        /// The record stays in memory and the next tick writes it again.
        retryable: bool,
    },
    DayRolledOver {
        from: String,
        to: String,
    },
    ConfigReloaded {
        details: String,
    },
    Error {
        code: String,
        message: String,
    },
    /// Sentinel asking the logger thread to flush and exit.
    Shutdown,
}

impl TrackerEvent {
    /// Generic error event for any tracker error.
    #[must_use]
    pub fn error(err: &TrackerError) -> Self {
        Self::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }

    /// Failed day-file write, classified by whether a later tick can recover.
    #[must_use]
    pub fn timeline_write_failed(path: &Path, err: &TrackerError) -> Self {
        Self::TimelineWriteFailed {
            path: path.display().to_string(),
            code: err.code().to_string(),
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

/// Cloneable, non-blocking sender side of the event log.
#[derive(Clone)]
pub struct EventLoggerHandle {
    tx: Sender<TrackerEvent>,
    dropped_events: Arc<AtomicU64>,
}

impl EventLoggerHandle {
    /// Handle with no logger thread behind it. Every event is discarded.
    #[must_use]
    pub fn detached() -> Self {
        let (tx, _rx) = bounded(1);
        Self {
            tx,
            dropped_events: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Queue an event. Drops it (and counts the drop) if the channel is full.
    pub fn send(&self, event: TrackerEvent) {
        if let Err(TrySendError::Full(_)) = self.tx.try_send(event) {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Ask the logger thread to flush and exit. Join its handle afterwards.
    pub fn shutdown(&self) {
        let _ = self.tx.send(TrackerEvent::Shutdown);
    }
}

pub struct EventLoggerConfig {
    pub jsonl: JsonlConfig,
    pub channel_capacity: usize,
}

impl EventLoggerConfig {
    #[must_use]
    pub fn new(jsonl: JsonlConfig) -> Self {
        Self {
            jsonl,
            channel_capacity: CHANNEL_CAPACITY,
        }
    }
}

/// Spawn the logger thread.
///
/// It runs until `shutdown()` is called or every handle has been dropped.
pub fn spawn_logger(config: EventLoggerConfig) -> Result<(EventLoggerHandle, thread::JoinHandle<()>)> {
    let (tx, rx) = bounded::<TrackerEvent>(config.channel_capacity);
    let dropped = Arc::new(AtomicU64::new(0));
    let dropped_clone = Arc::clone(&dropped);

    let handle = EventLoggerHandle {
        tx,
        dropped_events: dropped,
    };

    let join = thread::Builder::new()
        .name("actrack-logger".to_string())
        .spawn(move || logger_thread_main(&rx, config.jsonl, &dropped_clone))
        .map_err(|e| TrackerError::Runtime {
            details: format!("failed to spawn logger thread: {e}"),
        })?;

    Ok((handle, join))
}

fn logger_thread_main(rx: &Receiver<TrackerEvent>, jsonl_config: JsonlConfig, dropped: &AtomicU64) {
    let mut jsonl = JsonlWriter::open(jsonl_config);

    while let Ok(event) = rx.recv() {
        let d = dropped.swap(0, Ordering::Relaxed);
        if d > 0 {
            let mut warn = LogEntry::new(EventType::Error, Severity::Warning);
            warn.details = Some(format!("{d} events dropped due to back-pressure"));
            jsonl.write_entry(&warn);
        }

        if matches!(event, TrackerEvent::Shutdown) {
            break;
        }
        if jsonl.state() != "normal" {
            jsonl.try_recover();
        }
        jsonl.write_entry(&event_to_log_entry(&event));
    }

    jsonl.flush();
    jsonl.fsync();
}

fn event_to_log_entry(event: &TrackerEvent) -> LogEntry {
    match event {
        TrackerEvent::TrackerStarted {
            version,
            config_hash,
            probe,
            typing_available,
        } => {
            let mut e = LogEntry::new(EventType::TrackerStart, Severity::Info);
            e.details = Some(format!(
                "version={version} config_hash={config_hash} probe={probe} typing={typing_available}"
            ));
            e.ok = Some(true);
            e
        }
        TrackerEvent::TrackerStopped {
            reason,
            uptime_secs,
        } => {
            let mut e = LogEntry::new(EventType::TrackerStop, Severity::Info);
            e.details = Some(format!("reason={reason}"));
            e.duration_secs = Some(*uptime_secs);
            e.ok = Some(true);
            e
        }
        TrackerEvent::SpanStarted {
            date,
            app,
            title,
            category,
        } => {
            let mut e = LogEntry::new(EventType::SpanStart, Severity::Info);
            e.date = Some(date.clone());
            e.app = Some(app.clone());
            e.title = Some(title.clone());
            e.category = Some(category.clone());
            e
        }
        TrackerEvent::IdleEntered { idle_for_secs } => {
            let mut e = LogEntry::new(EventType::IdleEnter, Severity::Info);
            e.duration_secs = Some(*idle_for_secs);
            e
        }
        TrackerEvent::IdleExited { cause } => {
            let mut e = LogEntry::new(EventType::IdleExit, Severity::Info);
            e.cause = Some(cause.clone());
            e
        }
        TrackerEvent::TypingUnavailable { code, message } => {
            let mut e = LogEntry::new(EventType::TypingUnavailable, Severity::Warning);
            e.error_code = Some(code.clone());
            e.error_message = Some(message.clone());
            e
        }
        TrackerEvent::ProbeFailed {
            backend,
            code,
            message,
        } => {
            let mut e = LogEntry::new(EventType::ProbeFailure, Severity::Warning);
            e.cause = Some(backend.clone());
            e.error_code = Some(code.clone());
            e.error_message = Some(message.clone());
            e.ok = Some(false);
            e
        }
        TrackerEvent::ProbeRecovered { backend } => {
            let mut e = LogEntry::new(EventType::ProbeRecovered, Severity::Info);
            e.cause = Some(backend.clone());
            e.ok = Some(true);
            e
        }
        TrackerEvent::TimelineLoadWarning {
            date,
            code,
            message,
        } => {
            let mut e = LogEntry::new(EventType::TimelineLoadWarning, Severity::Warning);
            e.date = Some(date.clone());
            e.error_code = Some(code.clone());
            e.error_message = Some(message.clone());
            e
        }
        TrackerEvent::TimelineWriteFailed {
            path,
            code,
            message,
            retryable,
        } => {
            let severity = if *retryable {
                Severity::Warning
            } else {
                Severity::Error
            };
            let mut e = LogEntry::new(EventType::TimelineWriteFailure, severity);
            e.path = Some(path.clone());
            e.error_code = Some(code.clone());
            e.error_message = Some(message.clone());
            e.ok = Some(false);
            e.details = Some(if *retryable { "retry=next_tick" } else { "retry=none" }.to_string());
            e
        }
        TrackerEvent::DayRolledOver { from, to } => {
            let mut e = LogEntry::new(EventType::DayRollover, Severity::Info);
            e.date = Some(to.clone());
            e.details = Some(format!("from={from}"));
            e
        }
        TrackerEvent::ConfigReloaded { details } => {
            let mut e = LogEntry::new(EventType::ConfigReload, Severity::Info);
            e.details = Some(details.clone());
            e
        }
        TrackerEvent::Error { code, message } => {
            let mut e = LogEntry::new(EventType::Error, Severity::Error);
            e.error_code = Some(code.clone());
            e.error_message = Some(message.clone());
            e.ok = Some(false);
            e
        }
        TrackerEvent::Shutdown => LogEntry::new(EventType::TrackerStop, Severity::Info),
    }
}
