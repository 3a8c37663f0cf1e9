//! Top-level CLI definition and dispatch.

use std::io::{self, Write};
use std::path::Path;

use chrono::{Local, NaiveDate};
use clap::{CommandFactory, Parser};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use activity_tracker::core::config::Config;
use activity_tracker::core::errors::TrackerError;
use activity_tracker::core::paths::TrackerPaths;
use activity_tracker::daemon::loop_main::{DaemonArgs, TrackerDaemon};
use activity_tracker::report::daily::{DailyOutcome, build_daily_report};
use activity_tracker::report::save_report;
use activity_tracker::report::summary::{SummaryOutcome, build_summary};

/// Activity Tracker: records which application has focus, and for how long.
#[derive(Debug, Parser)]
#[command(
    name = "actrack",
    author,
    version,
    about = "Activity Tracker - foreground window time tracking",
    long_about = None
)]
pub struct Cli {
    /// Generate today's report without tracking.
    #[arg(long)]
    report: bool,
    /// Generate the report for a specific date (YYYY-MM-DD). Implies --report.
    #[arg(long, value_name = "YYYY-MM-DD")]
    date: Option<String>,
    /// Generate a summary of every recorded day.
    #[arg(long)]
    summary: bool,
    /// Show the configuration file location, creating it with defaults if missing.
    #[arg(long)]
    configure: bool,
    /// Print shell completions and exit.
    #[arg(long, value_name = "SHELL")]
    completions: Option<CompletionShell>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Print one line per tick while tracking.
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Stop tracking after N ticks.
    #[arg(long, value_name = "N", hide = true)]
    max_ticks: Option<u64>,
    /// Do not start the key-press listener.
    #[arg(long, hide = true)]
    no_keys: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Track,
    Report(Option<String>),
    Summary,
    Configure,
    Completions(CompletionShell),
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Internal(_) | Self::Json(_) => 3,
        }
    }
}

impl From<TrackerError> for CliError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::Serialization { .. } => Self::Internal(err.to_string()),
            other => Self::Runtime(other.to_string()),
        }
    }
}

/// Dispatch in the same precedence the flags have always had: summary, then
/// report, then configure, then tracking.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match cli.action() {
        Action::Completions(shell) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
        Action::Summary => run_summary(cli),
        Action::Report(date) => run_report(cli, date.as_deref()),
        Action::Configure => run_configure(cli),
        Action::Track => run_track(cli),
    }
}

impl Cli {
    fn action(&self) -> Action {
        if let Some(shell) = self.completions {
            Action::Completions(shell)
        } else if self.summary {
            Action::Summary
        } else if self.report || self.date.is_some() {
            Action::Report(self.date.clone())
        } else if self.configure {
            Action::Configure
        } else {
            Action::Track
        }
    }
}

fn run_track(cli: &Cli) -> Result<(), CliError> {
    let paths = TrackerPaths::discover();
    paths.ensure_root()?;
    let config = Config::load_or_init(&paths)?;

    match output_mode(cli) {
        OutputMode::Human => {
            println!(
                "{} tracking into {} (every {}s). Press Ctrl+C to stop.",
                "actrack".bold(),
                paths.root().display(),
                config.sampling_interval
            );
        }
        OutputMode::Json => {
            write_json_line(&json!({
                "command": "track",
                "root": paths.root(),
                "samplingInterval": config.sampling_interval,
                "idleThreshold": config.idle_threshold,
            }))?;
        }
    }

    let args = DaemonArgs {
        verbose: cli.verbose,
        listen_keys: !cli.no_keys,
        max_ticks: cli.max_ticks,
    };
    let mut daemon = TrackerDaemon::init(config, paths, args)?;
    daemon.run()?;
    Ok(())
}

fn run_report(cli: &Cli, date: Option<&str>) -> Result<(), CliError> {
    let date = match date {
        Some(raw) => parse_report_date(raw)?,
        None => Local::now().date_naive(),
    };
    let paths = TrackerPaths::discover();
    let outcome = build_daily_report(&paths, date);
    if let DailyOutcome::Invalid { error, .. } = &outcome {
        eprintln!("[ACT-REPORT] {error}");
    }

    let text = outcome.render();
    let target = paths.daily_report(date);
    paths.ensure_root()?;
    save_report(&target, &text)?;

    match output_mode(cli) {
        OutputMode::Human => {
            println!("{text}");
            println!("\nReport saved to {}", target.display());
        }
        OutputMode::Json => {
            let (status, report) = match &outcome {
                DailyOutcome::Report(report) => ("ok", serde_json::to_value(report)?),
                DailyOutcome::NoActivities(_) => ("no_activities", Value::Null),
                DailyOutcome::Invalid { .. } => ("invalid", Value::Null),
            };
            write_json_line(&json!({
                "command": "report",
                "date": date.to_string(),
                "status": status,
                "report": report,
                "savedTo": target,
            }))?;
        }
    }
    Ok(())
}

fn run_summary(cli: &Cli) -> Result<(), CliError> {
    let paths = TrackerPaths::discover();
    let outcome = build_summary(&paths)?;

    let text = outcome.render();
    let target = paths.summary_report();
    paths.ensure_root()?;
    save_report(&target, &text)?;

    match output_mode(cli) {
        OutputMode::Human => {
            println!("{text}");
            println!("\nSummary saved to {}", target.display());
        }
        OutputMode::Json => {
            let (status, summary) = match &outcome {
                SummaryOutcome::Report(report) => ("ok", serde_json::to_value(report)?),
                SummaryOutcome::NoData => ("no_data", Value::Null),
            };
            write_json_line(&json!({
                "command": "summary",
                "status": status,
                "summary": summary,
                "savedTo": target,
            }))?;
        }
    }
    Ok(())
}

fn run_configure(cli: &Cli) -> Result<(), CliError> {
    let paths = TrackerPaths::discover();
    paths.ensure_root()?;
    let config_path = paths.config_file();
    let created = !config_path.exists();
    let config = Config::load_or_init(&paths)?;

    match output_mode(cli) {
        OutputMode::Human => {
            print_config_location(&config_path, created);
            if cli.verbose {
                println!(
                    "  samplingInterval={}s idleThreshold={}s categories={}",
                    config.sampling_interval,
                    config.idle_threshold,
                    config.categories.len()
                );
            }
        }
        OutputMode::Json => {
            write_json_line(&json!({
                "command": "configure",
                "configPath": config_path,
                "created": created,
                "config": serde_json::to_value(&config)?,
            }))?;
        }
    }
    Ok(())
}

fn print_config_location(path: &Path, created: bool) {
    println!(
        "Configuration file is located at: {}",
        path.display().to_string().cyan()
    );
    if created {
        println!("{}", "A default configuration was written.".green());
    }
    println!("You can edit this file with a text editor to customize tracking settings.");
}

fn parse_report_date(raw: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| CliError::User(format!("invalid date {raw:?}: expected YYYY-MM-DD")))
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("ACTRACK_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref())
}

/// Text unless JSON is asked for, whether or not stdout is a terminal.
fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        _ => OutputMode::Human,
    }
}
