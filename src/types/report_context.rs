//! Structured context attached to telemetry reports.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Severity level of a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Fatal,
    #[default]
    Error,
    Warning,
    Info,
    Debug,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fatal => "fatal",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

/// Tags, extra data and level sent alongside an exception or message.
///
/// Tags are short indexed strings used for filtering; extra data is free-form
/// JSON.
///
/// # Examples
///
/// ```
/// use voisin_rail::{Level, ReportContext};
///
/// let ctx = ReportContext::new()
///     .tag("errorContext", "récupération des missions")
///     .extra("attempt", 1)
///     .level(Level::Warning);
///
/// let label = ctx.tags().get("errorContext").map(String::as_str);
/// assert_eq!(label, Some("récupération des missions"));
/// assert_eq!(ctx.get_level(), Level::Warning);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportContext {
    tags: BTreeMap<String, String>,
    extra: Map<String, Value>,
    level: Level,
}

impl ReportContext {
    /// Creates an empty context at level `error`.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a tag.
    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.tags.insert(key.into(), value.to_string());
        self
    }

    /// Adds a tag only when a value is present.
    #[must_use]
    pub fn tag_opt(self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.tag(key, value),
            None => self,
        }
    }

    /// Adds or replaces an extra value.
    #[must_use]
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    #[inline]
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    #[inline]
    pub fn extras(&self) -> &Map<String, Value> {
        &self.extra
    }

    #[inline]
    pub fn get_level(&self) -> Level {
        self.level
    }
}
