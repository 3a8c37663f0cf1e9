//! Window → category classification.
//!
//! Pure and deterministic: the same observation and configuration always
//! yield the same category. Precedence:
//! 1. no observation → `Idle`
//! 2. app in `ignoredApps` (case-insensitive, exact) → `System`
//! 3. first configured category whose keyword is a substring of the app name
//! 4. title heuristics: mail → `Communication`, documents → `Documents`,
//!    code/script/source extensions → `Coding`
//! 5. `Other`

#![allow(missing_docs)]

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::config::{CategoryRules, Config};
use crate::platform::pal::WindowObservation;

/// Activity label. Configuration may add names beyond the built-in ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub const IDLE: &'static str = "Idle";
    pub const SYSTEM: &'static str = "System";
    pub const OTHER: &'static str = "Other";
    pub const CODING: &'static str = "Coding";
    pub const COMMUNICATION: &'static str = "Communication";
    pub const DOCUMENTS: &'static str = "Documents";

    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn idle() -> Self {
        Self::new(Self::IDLE)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.0 == Self::IDLE
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for Category {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// The slice of configuration that classification depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryConfig {
    pub ignored_apps: Vec<String>,
    pub categories: CategoryRules,
}

impl From<&Config> for CategoryConfig {
    fn from(config: &Config) -> Self {
        Self {
            ignored_apps: config.ignored_apps.clone(),
            categories: config.categories.clone(),
        }
    }
}

const SOURCE_EXTENSIONS: [&str; 8] = [".py", ".js", ".html", ".css", ".java", ".go", ".c", ".cpp"];

/// Map an observation to its category under `config`.
#[must_use]
pub fn classify(observation: Option<&WindowObservation>, config: &CategoryConfig) -> Category {
    let Some(observation) = observation else {
        return Category::idle();
    };

    let app = observation.app.to_lowercase();
    let title = observation.title.to_lowercase();

    if config
        .ignored_apps
        .iter()
        .any(|ignored| ignored.to_lowercase() == app)
    {
        return Category::new(Category::SYSTEM);
    }

    for rule in config.categories.iter() {
        if rule
            .keywords
            .iter()
            .any(|keyword| app.contains(&keyword.to_lowercase()))
        {
            return Category::new(rule.name.clone());
        }
    }

    if title.contains("email") || title.contains("mail") {
        return Category::new(Category::COMMUNICATION);
    }
    if title.contains("document") || title.contains(".doc") || title.contains(".txt") {
        return Category::new(Category::DOCUMENTS);
    }
    if title.contains("code")
        || title.contains("script")
        || SOURCE_EXTENSIONS.iter().any(|ext| title.contains(ext))
    {
        return Category::new(Category::CODING);
    }

    Category::new(Category::OTHER)
}
