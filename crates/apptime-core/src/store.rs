//! File storage for AppTime
//!
//! Every file is a flat JSON object rewritten whole on save:
//!
//! - `logs/<YYYY-MM-DD>.json`: display name to accumulated seconds
//! - `display_names.json`: process name to display name
//! - `settings.json`: display name to goal minutes
//! - `display_flags.json`: display name to visibility
//!
//! A missing file loads as an empty mapping. A malformed file is reported as
//! [`StoreError::Malformed`] and the caller decides whether to fall back.

use crate::{ActivityLog, DisplayFlags, Goals, NameMap};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const LOGS_DIR: &str = "logs";
const NAME_MAP_FILE: &str = "display_names.json";
const GOALS_FILE: &str = "settings.json";
const DISPLAY_FLAGS_FILE: &str = "display_flags.json";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed JSON in {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// JSON file store rooted at a data directory
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    /// Use the given directory. Nothing is created until the first save.
    pub fn open<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Open the default store
    pub fn open_default() -> Self {
        Self::open(crate::data_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join(LOGS_DIR)
    }

    pub fn log_path(&self, date: NaiveDate) -> PathBuf {
        self.logs_dir()
            .join(format!("{}.json", date.format(DATE_FORMAT)))
    }

    pub fn name_map_path(&self) -> PathBuf {
        self.root.join(NAME_MAP_FILE)
    }

    pub fn goals_path(&self) -> PathBuf {
        self.root.join(GOALS_FILE)
    }

    pub fn display_flags_path(&self) -> PathBuf {
        self.root.join(DISPLAY_FLAGS_FILE)
    }

    /// Load the activity log for a day
    pub fn load_log(&self, date: NaiveDate) -> Result<ActivityLog> {
        read_json(&self.log_path(date))
    }

    /// Atomically replace the activity log for a day
    pub fn save_log(&self, date: NaiveDate, log: &ActivityLog) -> Result<()> {
        write_json(&self.log_path(date), log)
    }

    pub fn load_name_map(&self) -> Result<NameMap> {
        read_json(&self.name_map_path())
    }

    pub fn save_name_map(&self, map: &NameMap) -> Result<()> {
        write_json(&self.name_map_path(), map)
    }

    pub fn load_goals(&self) -> Result<Goals> {
        read_json(&self.goals_path())
    }

    pub fn save_goals(&self, goals: &Goals) -> Result<()> {
        write_json(&self.goals_path(), goals)
    }

    pub fn load_display_flags(&self) -> Result<DisplayFlags> {
        read_json(&self.display_flags_path())
    }

    pub fn save_display_flags(&self, flags: &DisplayFlags) -> Result<()> {
        write_json(&self.display_flags_path(), flags)
    }

    /// Dates that have a log file, oldest first. Files whose name is not a
    /// `YYYY-MM-DD.json` date are skipped.
    pub fn list_log_dates(&self) -> Result<Vec<NaiveDate>> {
        let dir = self.logs_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&dir, e)),
        };

        let mut dates = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StoreError::io(&dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match NaiveDate::parse_from_str(stem, DATE_FORMAT) {
                Ok(date) => dates.push(date),
                Err(_) => debug!("Skipping non-log file {:?}", path),
            }
        }

        dates.sort();
        Ok(dates)
    }
}

/// Read a JSON mapping. Missing or blank files yield the default value.
fn read_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => return Err(StoreError::io(path, e)),
    };

    if content.trim().is_empty() {
        return Ok(T::default());
    }

    serde_json::from_str(&content).map_err(|source| StoreError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a JSON mapping via temp file + rename so readers never see a torn file
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

    let content = serde_json::to_string_pretty(value)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    tmp.write_all(content.as_bytes())
        .map_err(|e| StoreError::io(path, e))?;
    tmp.flush().map_err(|e| StoreError::io(path, e))?;
    tmp.persist(path)
        .map_err(|e| StoreError::io(path, e.error))?;

    Ok(())
}
