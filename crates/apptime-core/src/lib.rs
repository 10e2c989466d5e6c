//! AppTime Core Library
//!
//! Provides the active-time accumulator, JSON file storage, range summaries,
//! and export functionality for the AppTime foreground application tracker.

pub mod accumulator;
pub mod export;
pub mod store;
pub mod summary;

pub use accumulator::{Accumulator, Closeout, Snapshot, Transition};
pub use export::{ExportFormat, Exporter};
pub use store::{Store, StoreError};
pub use summary::{AppTotal, Summary, TimeRange};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier recorded when the foreground application cannot be resolved
pub const UNKNOWN_APP: &str = "Unknown";

/// Accumulated active seconds per application for a single calendar day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityLog(BTreeMap<String, f64>);

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add seconds to an application's total, starting from zero if absent
    pub fn add(&mut self, app: &str, seconds: f64) {
        *self.0.entry(app.to_string()).or_insert(0.0) += seconds;
    }

    /// Accumulated seconds for an application (zero if never seen)
    pub fn seconds(&self, app: &str) -> f64 {
        self.0.get(app).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, app: &str) -> bool {
        self.0.contains_key(app)
    }

    pub fn total_seconds(&self) -> f64 {
        self.0.values().sum()
    }

    /// Fold another day's totals into this one
    pub fn merge(&mut self, other: &ActivityLog) {
        for (app, seconds) in other.iter() {
            self.add(app, seconds);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(app, seconds)| (app.as_str(), *seconds))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, f64)> for ActivityLog {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut log = ActivityLog::new();
        for (app, seconds) in iter {
            log.add(&app, seconds);
        }
        log
    }
}

/// User-editable mapping from raw process name to display name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameMap(BTreeMap<String, String>);

impl NameMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a raw process name to the identifier used in logs
    pub fn resolve(&self, process: &str) -> String {
        self.0
            .get(process)
            .cloned()
            .unwrap_or_else(|| process.to_string())
    }

    /// Map a process to a display name. A blank display name removes the
    /// mapping so the process name is shown unchanged.
    pub fn set(&mut self, process: &str, display: &str) {
        let display = display.trim();
        if display.is_empty() {
            self.0.remove(process);
        } else {
            self.0.insert(process.to_string(), display.to_string());
        }
    }

    pub fn remove(&mut self, process: &str) -> Option<String> {
        self.0.remove(process)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(p, d)| (p.as_str(), d.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Target goal time in minutes per application (`settings.json`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Goals(BTreeMap<String, u32>);

impl Goals {
    /// Goal minutes for an app, zero when no goal is set
    pub fn minutes(&self, app: &str) -> u32 {
        self.0.get(app).copied().unwrap_or(0)
    }

    pub fn set(&mut self, app: &str, minutes: u32) {
        self.0.insert(app.to_string(), minutes);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(app, minutes)| (app.as_str(), *minutes))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Per-application visibility in summaries (`display_flags.json`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayFlags(BTreeMap<String, bool>);

impl DisplayFlags {
    /// Apps without an entry are shown
    pub fn is_visible(&self, app: &str) -> bool {
        self.0.get(app).copied().unwrap_or(true)
    }

    pub fn set(&mut self, app: &str, visible: bool) {
        self.0.insert(app.to_string(), visible);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(app, visible)| (app.as_str(), *visible))
    }
}

/// Get the data directory for AppTime
pub fn data_dir() -> std::path::PathBuf {
    directories::ProjectDirs::from("com", "apptime", "apptime")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| {
            directories::BaseDirs::new()
                .map(|d| d.home_dir().join(".apptime"))
                .unwrap_or_else(|| std::path::PathBuf::from(".apptime"))
        })
}
