//! ACT-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Top-level error type for the activity tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("[ACT-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[ACT-1003] configuration parse failure in {path}: {details}")]
    ConfigParse { path: PathBuf, details: String },

    #[error("[ACT-2001] window probe {backend} failed: {details}")]
    ProbeFailure {
        backend: &'static str,
        details: String,
    },

    #[error("[ACT-2002] window probe {backend} timed out after {timeout_ms}ms")]
    ProbeTimeout {
        backend: &'static str,
        timeout_ms: u64,
    },

    #[error("[ACT-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[ACT-3001] unreadable timeline {path}: {details}")]
    TimelineRead { path: PathBuf, details: String },

    #[error("[ACT-3002] failed to persist timeline {path}: {source}")]
    TimelineWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[ACT-3003] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[ACT-3101] key-press listener unavailable: {details}")]
    InputUnavailable { details: String },

    #[error("[ACT-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl TrackerError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "ACT-1001",
            Self::ConfigParse { .. } => "ACT-1003",
            Self::ProbeFailure { .. } => "ACT-2001",
            Self::ProbeTimeout { .. } => "ACT-2002",
            Self::Serialization { .. } => "ACT-2101",
            Self::TimelineRead { .. } => "ACT-3001",
            Self::TimelineWrite { .. } => "ACT-3002",
            Self::Io { .. } => "ACT-3003",
            Self::InputUnavailable { .. } => "ACT-3101",
            Self::Runtime { .. } => "ACT-3900",
        }
    }

    /// Whether the next tick might succeed where this one failed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProbeFailure { .. }
                | Self::ProbeTimeout { .. }
                | Self::TimelineWrite { .. }
                | Self::Io { .. }
                | Self::Runtime { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<TrackerError> {
        vec![
            TrackerError::InvalidConfig {
                details: String::new(),
            },
            TrackerError::ConfigParse {
                path: PathBuf::new(),
                details: String::new(),
            },
            TrackerError::ProbeFailure {
                backend: "",
                details: String::new(),
            },
            TrackerError::ProbeTimeout {
                backend: "",
                timeout_ms: 0,
            },
            TrackerError::Serialization {
                context: "",
                details: String::new(),
            },
            TrackerError::TimelineRead {
                path: PathBuf::new(),
                details: String::new(),
            },
            TrackerError::TimelineWrite {
                path: PathBuf::new(),
                source: std::io::Error::other("test"),
            },
            TrackerError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other("test"),
            },
            TrackerError::InputUnavailable {
                details: String::new(),
            },
            TrackerError::Runtime {
                details: String::new(),
            },
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let errors = all_variants();
        let codes: Vec<&str> = errors.iter().map(TrackerError::code).collect();
        let unique: std::collections::HashSet<&&str> = codes.iter().collect();
        assert_eq!(
            codes.len(),
            unique.len(),
            "error codes must be unique: {codes:?}"
        );
    }

    #[test]
    fn error_display_includes_code() {
        for err in all_variants() {
            let msg = err.to_string();
            assert!(
                msg.contains(err.code()),
                "display should contain error code: {msg}"
            );
        }
    }

    #[test]
    fn configuration_errors_are_not_retryable() {
        assert!(
            !TrackerError::InvalidConfig {
                details: "bad".to_string()
            }
            .is_retryable()
        );
        assert!(
            !TrackerError::ConfigParse {
                path: PathBuf::new(),
                details: String::new()
            }
            .is_retryable()
        );
    }

    #[test]
    fn write_and_probe_failures_are_retryable() {
        assert!(
            TrackerError::TimelineWrite {
                path: PathBuf::from("/tmp/activity_2025-01-01.json"),
                source: std::io::Error::other("disk full"),
            }
            .is_retryable()
        );
        assert!(
            TrackerError::ProbeTimeout {
                backend: "xdotool",
                timeout_ms: 2000
            }
            .is_retryable()
        );
    }

    #[test]
    fn io_convenience_constructor() {
        let err = TrackerError::io(
            "/tmp/test.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.code(), "ACT-3003");
        assert!(err.to_string().contains("/tmp/test.json"));
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: TrackerError = json_err.into();
        assert_eq!(err.code(), "ACT-2101");
    }
}
