//! Configuration system: JSON file + env var overrides + hard-coded defaults.

#![allow(missing_docs)]

use std::env;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::errors::{Result, TrackerError};
use crate::core::paths::{TrackerPaths, write_atomic};

/// Full tracker configuration, as stored in `activity_config.json`.
///
/// Files written by older releases use snake_case keys. Those are accepted as
/// aliases on load; saving always writes camelCase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    #[serde(alias = "track_applications")]
    pub track_applications: bool,
    #[serde(alias = "track_documents")]
    pub track_documents: bool,
    #[serde(alias = "ignored_apps")]
    pub ignored_apps: Vec<String>,
    pub categories: CategoryRules,
    /// Seconds between ticks.
    #[serde(alias = "sampling_interval")]
    pub sampling_interval: u64,
    /// Seconds without interaction before the user is considered idle.
    #[serde(alias = "idle_threshold")]
    pub idle_threshold: u64,
    /// Seconds after the last key-press during which the user counts as typing.
    #[serde(alias = "typing_threshold")]
    pub typing_threshold: f64,
    /// Upper bound for a single external window-probe call.
    #[serde(alias = "probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

/// One configured category and the app-name keywords that select it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRule {
    pub name: String,
    pub keywords: Vec<String>,
}

/// Categories in declaration order. The first matching rule wins, so order
/// must survive both load and save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryRules(Vec<CategoryRule>);

impl CategoryRules {
    #[must_use]
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        Self(rules)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryRule> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Insert or replace a rule. A replaced rule keeps its original position.
    pub fn upsert(&mut self, name: &str, keywords: Vec<String>) {
        if let Some(rule) = self.0.iter_mut().find(|r| r.name == name) {
            rule.keywords = keywords;
        } else {
            self.0.push(CategoryRule {
                name: name.to_string(),
                keywords,
            });
        }
    }
}

impl Serialize for CategoryRules {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for rule in &self.0 {
            map.serialize_entry(&rule.name, &rule.keywords)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CategoryRules {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct RulesVisitor;

        impl<'de> Visitor<'de> for RulesVisitor {
            type Value = CategoryRules;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping category names to keyword lists")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut rules = CategoryRules::default();
                while let Some((name, keywords)) = access.next_entry::<String, Vec<String>>()? {
                    rules.upsert(&name, keywords);
                }
                Ok(rules)
            }
        }

        deserializer.deserialize_map(RulesVisitor)
    }
}

fn default_categories() -> CategoryRules {
    let table: [(&str, &[&str]); 8] = [
        (
            "Coding",
            &["vscode", "pycharm", "intellij", "sublime_text", "vim", "atom", "code"],
        ),
        (
            "Communication",
            &["outlook", "thunderbird", "slack", "teams", "discord", "zoom"],
        ),
        ("Browsing", &["chrome", "firefox", "safari", "edge"]),
        ("Documents", &["word", "excel", "powerpoint", "acrobat", "pdf"]),
        (
            "Terminal",
            &["terminal", "cmd", "powershell", "iterm2", "gnome-terminal", "konsole"],
        ),
        ("Design", &["photoshop", "illustrator", "figma", "sketch", "gimp"]),
        ("Media", &["vlc", "spotify", "itunes", "windows media player"]),
        ("Other", &[]),
    ];

    CategoryRules::new(
        table
            .iter()
            .map(|(name, keywords)| CategoryRule {
                name: (*name).to_string(),
                keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
            })
            .collect(),
    )
}

impl Default for Config {
    fn default() -> Self {
        Self {
            track_applications: true,
            track_documents: true,
            ignored_apps: vec![
                "explorer.exe".to_string(),
                "Finder".to_string(),
                "SystemUI".to_string(),
            ],
            categories: default_categories(),
            sampling_interval: 30,
            idle_threshold: 30,
            typing_threshold: 2.0,
            probe_timeout_ms: 2_000,
        }
    }
}

impl Config {
    /// Load the config from the tool directory, writing defaults first if the
    /// file does not exist yet.
    ///
    /// A file that exists but cannot be parsed is an error: the tracker must
    /// not guess category rules from corrupt state.
    pub fn load_or_init(paths: &TrackerPaths) -> Result<Self> {
        let path = paths.config_file();
        let mut cfg = if path.exists() {
            Self::read_file(&path)?
        } else {
            let defaults = Self::default();
            defaults.save(&path)?;
            eprintln!("[ACT-CONFIG] wrote default configuration to {}", path.display());
            defaults
        };

        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load an existing config file (used for SIGHUP reload).
    pub fn load(path: &Path) -> Result<Self> {
        let mut cfg = Self::read_file(path)?;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn read_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| TrackerError::io(path, source))?;
        serde_json::from_str(&raw).map_err(|err| TrackerError::ConfigParse {
            path: path.to_path_buf(),
            details: err.to_string(),
        })
    }

    /// Write the config as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(path, json.as_bytes()).map_err(|source| TrackerError::io(path, source))
    }

    /// Deterministic hash of the effective config for logging.
    ///
    /// FNV-1a over the canonical JSON so the value is stable across runs.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("ACTRACK_SAMPLING_INTERVAL") {
            self.sampling_interval = parse_env_u64("ACTRACK_SAMPLING_INTERVAL", &raw)?;
        }
        if let Some(raw) = lookup("ACTRACK_IDLE_THRESHOLD") {
            self.idle_threshold = parse_env_u64("ACTRACK_IDLE_THRESHOLD", &raw)?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.sampling_interval == 0 {
            return Err(TrackerError::InvalidConfig {
                details: "samplingInterval must be >= 1 second".to_string(),
            });
        }
        if self.idle_threshold == 0 {
            return Err(TrackerError::InvalidConfig {
                details: "idleThreshold must be >= 1 second".to_string(),
            });
        }
        if !(self.typing_threshold.is_finite() && self.typing_threshold > 0.0) {
            return Err(TrackerError::InvalidConfig {
                details: format!(
                    "typingThreshold must be a positive number of seconds, got {}",
                    self.typing_threshold
                ),
            });
        }
        if self.probe_timeout_ms == 0 {
            return Err(TrackerError::InvalidConfig {
                details: "probeTimeoutMs must be >= 1".to_string(),
            });
        }
        if let Some(rule) = self.categories.iter().find(|r| r.name.trim().is_empty()) {
            return Err(TrackerError::InvalidConfig {
                details: format!("category names must not be empty (keywords {:?})", rule.keywords),
            });
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn parse_env_u64(name: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|err| TrackerError::InvalidConfig {
            details: format!("{name}={raw:?} is not a non-negative integer: {err}"),
        })
}
