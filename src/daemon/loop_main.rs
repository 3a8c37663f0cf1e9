//! Tracking loop: drives sampler ticks at the configured interval until a
//! shutdown signal arrives.
//!
//! Threads:
//! - **Main thread**: ticks, sleeps between ticks in short slices, handles
//!   reload and shutdown flags between ticks
//! - **Key listener**: OS key-press hook feeding the shared runtime state
//! - **Logger thread**: writes the JSONL event log (see `logger::events`)

#![allow(missing_docs)]

use std::thread;
use std::time::{Duration, Instant};

use chrono::Local;

use crate::core::config::Config;
use crate::core::errors::Result;
use crate::core::paths::TrackerPaths;
use crate::daemon::signals::SignalHandler;
use crate::logger::events::{EventLoggerConfig, EventLoggerHandle, TrackerEvent, spawn_logger};
use crate::logger::jsonl::JsonlConfig;
use crate::platform::pal::{WindowProbe, detect_probe};
use crate::tracker::idle::IdleDetector;
use crate::tracker::input::InputActivityMonitor;
use crate::tracker::runtime::SharedRuntimeState;
use crate::tracker::sampler::ActivitySampler;
use crate::tracker::store::ActivityStore;

/// Granularity at which the inter-tick sleep checks for shutdown.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct DaemonArgs {
    /// Print one line per tick to stderr.
    pub verbose: bool,
    /// Start the OS key-press listener.
    pub listen_keys: bool,
    /// Stop after this many ticks. `None` runs until signalled.
    pub max_ticks: Option<u64>,
}

impl Default for DaemonArgs {
    fn default() -> Self {
        Self {
            verbose: false,
            listen_keys: true,
            max_ticks: None,
        }
    }
}

pub struct TrackerDaemon {
    config: Config,
    paths: TrackerPaths,
    args: DaemonArgs,
    sampler: ActivitySampler,
    logger_handle: EventLoggerHandle,
    logger_join: Option<thread::JoinHandle<()>>,
    signal_handler: SignalHandler,
    start_time: Instant,
    ticks: u64,
}

impl TrackerDaemon {
    /// Build the daemon with the platform's window probe and OS signal hooks.
    pub fn init(config: Config, paths: TrackerPaths, args: DaemonArgs) -> Result<Self> {
        let probe = detect_probe(Duration::from_millis(config.probe_timeout_ms));
        Self::init_with(config, paths, args, probe, SignalHandler::new())
    }

    /// Build the daemon around an explicit probe and signal handler.
    pub fn init_with(
        config: Config,
        paths: TrackerPaths,
        args: DaemonArgs,
        probe: Box<dyn WindowProbe>,
        signal_handler: SignalHandler,
    ) -> Result<Self> {
        let start_time = Instant::now();
        paths.ensure_root()?;

        // 1. Logger.
        let logger_config = EventLoggerConfig::new(JsonlConfig::new(paths.event_log()));
        let (logger_handle, logger_join) = spawn_logger(logger_config)?;

        // 2. Shared state and key listener.
        let shared = SharedRuntimeState::new(start_time);
        let input = InputActivityMonitor::new(
            shared.clone(),
            Duration::from_secs_f64(config.typing_threshold),
        );
        if args.listen_keys {
            if let Err(err) = input.start() {
                eprintln!("[ACT-INPUT] typing detection disabled: {err}");
                logger_handle.send(TrackerEvent::TypingUnavailable {
                    code: err.code().to_string(),
                    message: err.to_string(),
                });
            }
        } else if args.verbose {
            eprintln!("[ACT-INPUT] key-press listener not started");
        }

        // 3. Idle detection.
        let idle = IdleDetector::new(shared, Duration::from_secs(config.idle_threshold));

        // 4. Today's timeline.
        let today = Local::now().date_naive();
        let (store, warning) = ActivityStore::open(paths.clone(), today);
        if let Some(err) = warning {
            logger_handle.send(TrackerEvent::TimelineLoadWarning {
                date: today.to_string(),
                code: err.code().to_string(),
                message: err.to_string(),
            });
        }

        let mut sampler =
            ActivitySampler::new(probe, input, idle, store, &config, logger_handle.clone());
        sampler.set_verbose(args.verbose);

        Ok(Self {
            config,
            paths,
            args,
            sampler,
            logger_handle,
            logger_join: Some(logger_join),
            signal_handler,
            start_time,
            ticks: 0,
        })
    }

    #[must_use]
    pub const fn sampler(&self) -> &ActivitySampler {
        &self.sampler
    }

    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run ticks until shutdown is requested (or `max_ticks` is reached),
    /// then stop the listener and flush the event log.
    pub fn run(&mut self) -> Result<()> {
        let config_hash = self.config.stable_hash().unwrap_or_default();
        self.logger_handle.send(TrackerEvent::TrackerStarted {
            version: env!("CARGO_PKG_VERSION").to_string(),
            config_hash: config_hash.clone(),
            probe: self.sampler.probe_name().to_string(),
            typing_available: self.sampler.input().is_listening(),
        });
        eprintln!(
            "[ACT-DAEMON] tracking started: interval={}s idle_threshold={}s probe={} config_hash={config_hash}",
            self.config.sampling_interval,
            self.config.idle_threshold,
            self.sampler.probe_name(),
        );
        eprintln!("[ACT-DAEMON] writing to {}", self.paths.root().display());

        let reason = loop {
            if self.signal_handler.should_shutdown() {
                break "signal";
            }
            if self.signal_handler.should_reload() {
                self.handle_config_reload();
            }

            let tick_started = Instant::now();
            let _ = self.sampler.tick();
            self.ticks += 1;

            if self.args.max_ticks.is_some_and(|max| self.ticks >= max) {
                break "tick limit reached";
            }
            if self.sleep_until(tick_started + self.sampler.sampling_interval()) {
                break "signal";
            }
        };

        self.shutdown(reason);
        Ok(())
    }

    /// Sleep until `deadline`, waking early on shutdown. Returns `true` if
    /// shutdown was requested.
    fn sleep_until(&self, deadline: Instant) -> bool {
        loop {
            if self.signal_handler.should_shutdown() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }

    fn handle_config_reload(&mut self) {
        eprintln!("[ACT-DAEMON] config reload requested (SIGHUP)");

        match Config::load(&self.paths.config_file()) {
            Ok(new_config) => {
                let old_hash = self.config.stable_hash().unwrap_or_default();
                let new_hash = new_config.stable_hash().unwrap_or_default();
                if old_hash == new_hash {
                    eprintln!("[ACT-DAEMON] config unchanged, skipping reload");
                    return;
                }
                self.sampler.apply_config(&new_config);
                self.logger_handle.send(TrackerEvent::ConfigReloaded {
                    details: format!("config hash: {old_hash} -> {new_hash}"),
                });
                self.config = new_config;
                eprintln!("[ACT-DAEMON] config reloaded successfully");
            }
            Err(err) => {
                eprintln!("[ACT-DAEMON] config reload failed, keeping previous config: {err}");
                self.logger_handle.send(TrackerEvent::error(&err));
            }
        }
    }

    fn shutdown(&mut self, reason: &str) {
        let uptime_secs = self.start_time.elapsed().as_secs();

        // 1. Stop reacting to key events.
        self.sampler.stop_input();

        // 2. Log shutdown.
        self.logger_handle.send(TrackerEvent::TrackerStopped {
            reason: reason.to_string(),
            uptime_secs,
        });

        // 3. Flush and join the logger thread.
        self.logger_handle.shutdown();
        if let Some(join) = self.logger_join.take() {
            let _ = join.join();
        }

        let dropped = self.logger_handle.dropped_events();
        if dropped > 0 {
            eprintln!("[ACT-DAEMON] {dropped} log events dropped under back-pressure");
        }
        eprintln!(
            "[ACT-DAEMON] tracking stopped ({reason}, {} ticks, uptime={uptime_secs}s)",
            self.ticks
        );
    }
}
