//! Export functionality for CSV and JSON formats

use crate::{store::Store, summary::Summary, ActivityLog, AppTotal, TimeRange};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::io::Write;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Storage error: {0}")]
    Store(#[from] crate::store::StoreError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DayExport {
    pub date: NaiveDate,
    pub apps: ActivityLog,
}

/// Export data structure for JSON
#[derive(Debug, Serialize)]
pub struct ExportData {
    pub exported_at: DateTime<Utc>,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub totals: Vec<AppTotal>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub days: Vec<DayExport>,
}

pub struct Exporter<'a> {
    store: &'a Store,
}

impl<'a> Exporter<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Export every day's per-app seconds for a range
    pub fn export<W: Write>(
        &self,
        writer: W,
        range: TimeRange,
        today: NaiveDate,
        format: ExportFormat,
    ) -> Result<()> {
        let days = Summary::new(self.store).daily_logs(range, today)?;

        match format {
            ExportFormat::Csv => {
                let mut csv_writer = csv::Writer::from_writer(writer);
                csv_writer.write_record(["date", "app", "seconds"])?;
                for (date, log) in &days {
                    let date = date.to_string();
                    for (app, seconds) in log.iter() {
                        csv_writer.write_record([date.as_str(), app, &format!("{:.3}", seconds)])?;
                    }
                }
                csv_writer.flush()?;
                Ok(())
            }
            ExportFormat::Json => {
                let days = days
                    .into_iter()
                    .map(|(date, apps)| DayExport { date, apps })
                    .collect();
                self.write_json(writer, range, today, days)
            }
        }
    }

    /// Export range totals only (no per-day breakdown)
    pub fn export_summary<W: Write>(
        &self,
        writer: W,
        range: TimeRange,
        today: NaiveDate,
        format: ExportFormat,
    ) -> Result<()> {
        match format {
            ExportFormat::Csv => {
                let totals = Summary::new(self.store).app_totals(range, today)?;
                let mut csv_writer = csv::Writer::from_writer(writer);
                csv_writer.write_record(["app", "seconds", "goal_minutes", "progress"])?;
                for total in totals {
                    csv_writer.write_record([
                        total.app.clone(),
                        format!("{:.3}", total.seconds),
                        total.goal_minutes.to_string(),
                        Summary::format_progress(total.seconds, total.goal_minutes),
                    ])?;
                }
                csv_writer.flush()?;
                Ok(())
            }
            ExportFormat::Json => self.write_json(writer, range, today, Vec::new()),
        }
    }

    fn write_json<W: Write>(
        &self,
        mut writer: W,
        range: TimeRange,
        today: NaiveDate,
        days: Vec<DayExport>,
    ) -> Result<()> {
        let totals = Summary::new(self.store).app_totals(range, today)?;
        let bounds = range.bounds(today);

        let export_data = ExportData {
            exported_at: Utc::now(),
            period_start: bounds.map(|(start, _)| start),
            period_end: bounds.map(|(_, end)| end),
            totals,
            days,
        };

        let json = serde_json::to_string_pretty(&export_data)?;
        writer.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seeded_store(dir: &std::path::Path, today: NaiveDate) -> Store {
        let store = Store::open(dir);
        let log: ActivityLog = [("Editor".to_string(), 90.0), ("Browser".to_string(), 30.5)]
            .into_iter()
            .collect();
        store.save_log(today, &log).unwrap();
        store
    }

    #[test]
    fn test_csv_export_rows() {
        let dir = tempdir().unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let store = seeded_store(dir.path(), today);

        let mut out = Vec::new();
        Exporter::new(&store)
            .export(&mut out, TimeRange::Today, today, ExportFormat::Csv)
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "date,app,seconds");
        assert!(lines.contains(&"2024-05-01,Editor,90.000"));
        assert!(lines.contains(&"2024-05-01,Browser,30.500"));
    }

    #[test]
    fn test_json_summary_export() {
        let dir = tempdir().unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let store = seeded_store(dir.path(), today);

        let mut out = Vec::new();
        Exporter::new(&store)
            .export_summary(&mut out, TimeRange::Week, today, ExportFormat::Json)
            .unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["period_start"], "2024-04-25");
        assert_eq!(value["period_end"], "2024-05-01");
        assert_eq!(value["totals"][0]["app"], "Editor");
        assert!(value.get("days").is_none());
    }
}
