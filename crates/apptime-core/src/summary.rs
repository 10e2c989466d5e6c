//! Range summaries and formatting utilities

use crate::{store::Store, ActivityLog, DisplayFlags, Goals};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tracing::warn;

/// Range of days for querying totals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    Today,
    Yesterday,
    /// Today and the six days before it
    Week,
    /// Today and the 29 days before it
    Month,
    AllTime,
    Custom { start: NaiveDate, end: NaiveDate },
}

impl TimeRange {
    /// Inclusive first and last day relative to `today`. `None` means unbounded.
    pub fn bounds(&self, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        match self {
            TimeRange::Today => Some((today, today)),
            TimeRange::Yesterday => {
                let yesterday = today - Duration::days(1);
                Some((yesterday, yesterday))
            }
            TimeRange::Week => Some((today - Duration::days(6), today)),
            TimeRange::Month => Some((today - Duration::days(29), today)),
            TimeRange::AllTime => None,
            TimeRange::Custom { start, end } => Some((*start, *end)),
        }
    }

    pub fn contains(&self, date: NaiveDate, today: NaiveDate) -> bool {
        match self.bounds(today) {
            Some((start, end)) => date >= start && date <= end,
            None => true,
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "today" | "day" => Some(TimeRange::Today),
            "yesterday" => Some(TimeRange::Yesterday),
            "week" | "7d" | "7days" => Some(TimeRange::Week),
            "month" | "30d" | "30days" => Some(TimeRange::Month),
            "all" | "alltime" | "all-time" => Some(TimeRange::AllTime),
            _ => None,
        }
    }
}

/// One application's total over a range
#[derive(Debug, Clone, Serialize)]
pub struct AppTotal {
    pub app: String,
    pub seconds: f64,
    pub goal_minutes: u32,
    pub visible: bool,
}

impl AppTotal {
    pub fn minutes(&self) -> f64 {
        self.seconds / 60.0
    }
}

/// Read-side aggregation over the daily log files
pub struct Summary<'a> {
    store: &'a Store,
}

impl<'a> Summary<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Daily logs within a range, oldest first. Unreadable days are skipped.
    pub fn daily_logs(
        &self,
        range: TimeRange,
        today: NaiveDate,
    ) -> crate::store::Result<Vec<(NaiveDate, ActivityLog)>> {
        let mut days = Vec::new();
        for date in self.store.list_log_dates()? {
            if !range.contains(date, today) {
                continue;
            }
            match self.store.load_log(date) {
                Ok(log) => days.push((date, log)),
                Err(e) => warn!("Skipping log for {}: {}", date, e),
            }
        }
        Ok(days)
    }

    /// Totals across every day in the range
    pub fn totals(&self, range: TimeRange, today: NaiveDate) -> crate::store::Result<ActivityLog> {
        let mut totals = ActivityLog::new();
        for (_, log) in self.daily_logs(range, today)? {
            totals.merge(&log);
        }
        Ok(totals)
    }

    /// Per-app totals with goals and visibility, largest first
    pub fn app_totals(
        &self,
        range: TimeRange,
        today: NaiveDate,
    ) -> crate::store::Result<Vec<AppTotal>> {
        let totals = self.totals(range, today)?;
        let goals = self.store.load_goals().unwrap_or_else(|e| {
            warn!("Ignoring goals: {}", e);
            Goals::default()
        });
        let flags = self.store.load_display_flags().unwrap_or_else(|e| {
            warn!("Ignoring display flags: {}", e);
            DisplayFlags::default()
        });
        Ok(Self::rank(&totals, &goals, &flags))
    }

    /// Attach goals and visibility and sort by time spent
    pub fn rank(totals: &ActivityLog, goals: &Goals, flags: &DisplayFlags) -> Vec<AppTotal> {
        let mut rows: Vec<AppTotal> = totals
            .iter()
            .map(|(app, seconds)| AppTotal {
                app: app.to_string(),
                seconds,
                goal_minutes: goals.minutes(app),
                visible: flags.is_visible(app),
            })
            .collect();

        rows.sort_by(|a, b| {
            b.seconds
                .total_cmp(&a.seconds)
                .then_with(|| a.app.cmp(&b.app))
        });
        rows
    }

    /// Format seconds as `"{minutes}m {seconds}s"`
    pub fn format_seconds(seconds: f64) -> String {
        let whole = seconds.max(0.0) as u64;
        format!("{}m {}s", whole / 60, whole % 60)
    }

    /// Progress towards a goal, capped at 100%. `"N/A"` without a goal.
    pub fn format_progress(seconds: f64, goal_minutes: u32) -> String {
        match Self::progress(seconds, goal_minutes) {
            Some(pct) => format!("{:.1}%", pct),
            None => "N/A".to_string(),
        }
    }

    pub fn progress(seconds: f64, goal_minutes: u32) -> Option<f64> {
        if goal_minutes == 0 {
            return None;
        }
        let target = goal_minutes as f64 * 60.0;
        Some((seconds / target * 100.0).min(100.0))
    }

    /// Split a bar into `limit`-sized layers plus the remainder on top
    pub fn stack_layers(minutes: f64, limit: f64) -> Vec<f64> {
        if limit <= 0.0 {
            return vec![minutes];
        }
        let mut layers = Vec::new();
        let mut remaining = minutes;
        while remaining > limit {
            layers.push(limit);
            remaining -= limit;
        }
        layers.push(remaining);
        layers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_week_range_is_seven_days() {
        let today = date(2024, 3, 10);
        let week = TimeRange::Week;

        assert!(week.contains(today, today));
        assert!(week.contains(date(2024, 3, 4), today));
        assert!(!week.contains(date(2024, 3, 3), today));
        assert!(!week.contains(date(2024, 3, 11), today));
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(TimeRange::parse("Week"), Some(TimeRange::Week));
        assert_eq!(TimeRange::parse("day"), Some(TimeRange::Today));
        assert_eq!(TimeRange::parse("fortnight"), None);
    }

    #[test]
    fn test_totals_across_days() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path());
        let today = date(2024, 3, 10);

        let monday: ActivityLog = [("A".to_string(), 60.0)].into_iter().collect();
        let sunday: ActivityLog = [("A".to_string(), 30.0), ("B".to_string(), 10.0)]
            .into_iter()
            .collect();
        let old: ActivityLog = [("A".to_string(), 999.0)].into_iter().collect();
        store.save_log(date(2024, 3, 4), &monday).unwrap();
        store.save_log(today, &sunday).unwrap();
        store.save_log(date(2024, 2, 1), &old).unwrap();
        std::fs::write(store.log_path(date(2024, 3, 9)), "garbage").unwrap();

        let summary = Summary::new(&store);
        let week = summary.totals(TimeRange::Week, today).unwrap();
        assert_eq!(week.seconds("A"), 90.0);
        assert_eq!(week.seconds("B"), 10.0);

        let day = summary.totals(TimeRange::Today, today).unwrap();
        assert_eq!(day.seconds("A"), 30.0);

        let all = summary.totals(TimeRange::AllTime, today).unwrap();
        assert_eq!(all.seconds("A"), 1089.0);
    }

    #[test]
    fn test_app_totals_ranked_with_goals() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path());
        let today = date(2024, 3, 10);

        let log: ActivityLog = [("A".to_string(), 30.0), ("B".to_string(), 90.0)]
            .into_iter()
            .collect();
        store.save_log(today, &log).unwrap();

        let mut goals = Goals::default();
        goals.set("B", 3);
        store.save_goals(&goals).unwrap();

        let mut flags = DisplayFlags::default();
        flags.set("A", false);
        store.save_display_flags(&flags).unwrap();

        let rows = Summary::new(&store).app_totals(TimeRange::Today, today).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].app, "B");
        assert_eq!(rows[0].goal_minutes, 3);
        assert!(rows[0].visible);
        assert_eq!(rows[1].app, "A");
        assert!(!rows[1].visible);
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(Summary::format_seconds(125.9), "2m 5s");
        assert_eq!(Summary::format_seconds(0.0), "0m 0s");
        assert_eq!(Summary::format_seconds(3600.0), "60m 0s");
    }

    #[test]
    fn test_format_progress() {
        assert_eq!(Summary::format_progress(1800.0, 60), "50.0%");
        assert_eq!(Summary::format_progress(1800.0, 0), "N/A");
        assert_eq!(Summary::format_progress(7200.0, 60), "100.0%");
    }

    #[test]
    fn test_stack_layers() {
        assert_eq!(Summary::stack_layers(250.0, 100.0), vec![100.0, 100.0, 50.0]);
        assert_eq!(Summary::stack_layers(40.0, 100.0), vec![40.0]);
        assert_eq!(Summary::stack_layers(100.0, 100.0), vec![100.0]);
        assert_eq!(Summary::stack_layers(10.0, 0.0), vec![10.0]);
    }
}
