//! Foreground application poller for AppTime
//!
//! Samples the focused window's process, maps it through the user's name map,
//! and drives the accumulator from a background sampling thread.

pub mod platform;
pub mod tracker;

use apptime_core::{NameMap, UNKNOWN_APP};
use std::sync::{PoisonError, RwLock};

pub use platform::{ForegroundProcess, PlatformError};
pub use tracker::{Tracker, TrackerConfig, TrackerError};

/// Where foreground process information comes from
pub trait ForegroundSource: Send + Sync {
    fn foreground_process(&self) -> Result<ForegroundProcess, PlatformError>;
}

/// Queries the operating system
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeSource;

impl ForegroundSource for NativeSource {
    fn foreground_process(&self) -> Result<ForegroundProcess, PlatformError> {
        platform::foreground_process()
    }
}

/// Outcome of one foreground query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sample {
    /// Display identifier after name-map resolution
    Resolved(String),
    /// The query failed; carries the reason for logging
    Unresolved(String),
}

impl Sample {
    /// Identifier to accumulate under. Failed lookups count as [`UNKNOWN_APP`].
    pub fn identifier(&self) -> &str {
        match self {
            Sample::Resolved(app) => app,
            Sample::Unresolved(_) => UNKNOWN_APP,
        }
    }
}

/// Resolves the foreground process to an application identifier
pub struct Poller {
    source: Box<dyn ForegroundSource>,
    name_map: RwLock<NameMap>,
}

impl Poller {
    pub fn new(source: Box<dyn ForegroundSource>, name_map: NameMap) -> Self {
        Self {
            source,
            name_map: RwLock::new(name_map),
        }
    }

    /// Sample the foreground application. Never fails.
    pub fn sample(&self) -> Sample {
        match self.source.foreground_process() {
            Ok(process) => {
                let map = self.name_map.read().unwrap_or_else(PoisonError::into_inner);
                Sample::Resolved(map.resolve(&process.name))
            }
            Err(e) => Sample::Unresolved(e.to_string()),
        }
    }

    pub fn name_map(&self) -> NameMap {
        self.name_map
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the name map; applies from the next sample on
    pub fn set_name_map(&self, map: NameMap) {
        *self.name_map.write().unwrap_or_else(PoisonError::into_inner) = map;
    }
}
