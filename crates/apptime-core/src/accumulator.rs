//! Active-time accumulation
//!
//! The accumulator holds one open interval for the current foreground
//! application. Time is only added to the log when that interval is closed,
//! either because a different application was observed or because the
//! interval is closed explicitly (stop, day rollover).

use crate::ActivityLog;
use chrono::{DateTime, Local, NaiveDate};

/// Result of observing the foreground application on one tick
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Same application as before, nothing recorded
    Continued,
    /// First application seen since tracking started
    Opened { app: String },
    /// The previous interval was added to the log
    Closed(Closeout),
}

/// An interval that was added to the log
#[derive(Debug, Clone, PartialEq)]
pub struct Closeout {
    pub date: NaiveDate,
    pub app: String,
    pub elapsed: f64,
}

/// Read-only copy of the accumulator state for presentation
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub date: NaiveDate,
    pub log: ActivityLog,
    pub current_app: Option<String>,
    pub interval_start: DateTime<Local>,
}

impl Snapshot {
    /// The log as it would look if the open interval were closed at `now`
    pub fn with_open_interval(&self, now: DateTime<Local>) -> ActivityLog {
        let mut log = self.log.clone();
        if let Some(app) = &self.current_app {
            log.add(app, elapsed_seconds(self.interval_start, now));
        }
        log
    }
}

pub struct Accumulator {
    date: NaiveDate,
    log: ActivityLog,
    current_app: Option<String>,
    interval_start: DateTime<Local>,
}

impl Accumulator {
    /// Start accumulating into `log` for `date`, typically the log loaded
    /// from today's file so a same-day restart resumes its totals.
    pub fn new(date: NaiveDate, log: ActivityLog, now: DateTime<Local>) -> Self {
        Self {
            date,
            log,
            current_app: None,
            interval_start: now,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    pub fn current_app(&self) -> Option<&str> {
        self.current_app.as_deref()
    }

    pub fn interval_start(&self) -> DateTime<Local> {
        self.interval_start
    }

    /// Record the application seen at `now`
    pub fn observe(&mut self, app: &str, now: DateTime<Local>) -> Transition {
        if self.current_app.as_deref() == Some(app) {
            return Transition::Continued;
        }

        let closed = self.close_interval(now);
        self.current_app = Some(app.to_string());
        self.interval_start = now;

        match closed {
            Some(closeout) => Transition::Closed(closeout),
            None => Transition::Opened {
                app: app.to_string(),
            },
        }
    }

    /// Add the open interval up to `at` to the log and restart it from `at`.
    /// The current application stays the same.
    pub fn close_interval(&mut self, at: DateTime<Local>) -> Option<Closeout> {
        let app = self.current_app.clone()?;
        let elapsed = elapsed_seconds(self.interval_start, at);

        self.log.add(&app, elapsed);
        self.interval_start = at;

        Some(Closeout {
            date: self.date,
            app,
            elapsed,
        })
    }

    /// The day `now` falls on, if it is later than the day being recorded
    pub fn rollover_due(&self, now: DateTime<Local>) -> Option<NaiveDate> {
        let today = now.date_naive();
        (today > self.date).then_some(today)
    }

    /// Switch to a new day's log. The open interval continues from `start`,
    /// so the previous day must already have been closed at that instant.
    pub fn begin_day(&mut self, date: NaiveDate, log: ActivityLog, start: DateTime<Local>) {
        self.date = date;
        self.log = log;
        self.interval_start = start;
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            date: self.date,
            log: self.log.clone(),
            current_app: self.current_app.clone(),
            interval_start: self.interval_start,
        }
    }
}

/// Fractional seconds between two instants. A clock that moved backwards
/// counts as zero.
fn elapsed_seconds(start: DateTime<Local>, end: DateTime<Local>) -> f64 {
    let millis = (end - start).num_milliseconds();
    millis.max(0) as f64 / 1000.0
}

/// Local midnight at the start of `date`
pub fn start_of_day(date: NaiveDate) -> Option<DateTime<Local>> {
    date.and_hms_opt(0, 0, 0)?
        .and_local_timezone(Local)
        .earliest()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
    }

    fn accumulator() -> Accumulator {
        Accumulator::new(t0().date_naive(), ActivityLog::new(), t0())
    }

    #[test]
    fn test_three_tick_scenario() {
        let mut acc = accumulator();

        assert_eq!(
            acc.observe("A", t0()),
            Transition::Opened { app: "A".to_string() }
        );
        assert!(acc.log().is_empty());

        let closed = acc.observe("B", t0() + Duration::seconds(5));
        assert!(matches!(closed, Transition::Closed(ref c) if c.app == "A" && c.elapsed == 5.0));

        acc.observe("A", t0() + Duration::seconds(15));

        assert_eq!(acc.log().seconds("A"), 5.0);
        assert_eq!(acc.log().seconds("B"), 10.0);
        assert_eq!(acc.log().len(), 2);
        assert_eq!(acc.current_app(), Some("A"));
        assert_eq!(acc.interval_start(), t0() + Duration::seconds(15));
    }

    #[test]
    fn test_first_transition_has_no_sentinel_entry() {
        let mut acc = accumulator();

        acc.observe("A", t0() + Duration::seconds(3));
        acc.observe("B", t0() + Duration::seconds(4));

        assert_eq!(acc.log().len(), 1);
        assert_eq!(acc.log().seconds("A"), 1.0);
        assert!(!acc.log().contains(""));
    }

    #[test]
    fn test_same_app_does_not_close() {
        let mut acc = accumulator();

        acc.observe("A", t0());
        for i in 1..10 {
            assert_eq!(
                acc.observe("A", t0() + Duration::seconds(i)),
                Transition::Continued
            );
        }

        assert!(acc.log().is_empty());
        assert_eq!(acc.interval_start(), t0());
    }

    #[test]
    fn test_additivity() {
        let mut acc = accumulator();
        let durations = [("A", 1.5), ("B", 2.25), ("C", 3.0), ("A", 4.0), ("B", 0.5), ("A", 7.75)];

        let mut now = t0();
        for (app, secs) in durations {
            acc.observe(app, now);
            now = now + Duration::milliseconds((secs * 1000.0) as i64);
        }
        acc.observe("end", now);

        assert!((acc.log().seconds("A") - 13.25).abs() < 1e-9);
        assert!((acc.log().seconds("B") - 2.75).abs() < 1e-9);
        assert!((acc.log().seconds("C") - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_resumes_existing_totals() {
        let existing: ActivityLog = [("A".to_string(), 100.0)].into_iter().collect();
        let mut acc = Accumulator::new(t0().date_naive(), existing, t0());

        acc.observe("A", t0());
        acc.observe("B", t0() + Duration::seconds(20));

        assert_eq!(acc.log().seconds("A"), 120.0);
    }

    #[test]
    fn test_backwards_clock_counts_zero() {
        let mut acc = accumulator();

        acc.observe("A", t0());
        acc.observe("B", t0() - Duration::seconds(30));

        assert_eq!(acc.log().seconds("A"), 0.0);
    }

    #[test]
    fn test_close_interval_keeps_app() {
        let mut acc = accumulator();
        assert!(acc.close_interval(t0()).is_none());

        acc.observe("A", t0());
        let closeout = acc.close_interval(t0() + Duration::seconds(8)).unwrap();

        assert_eq!(closeout.elapsed, 8.0);
        assert_eq!(acc.current_app(), Some("A"));
        assert_eq!(acc.interval_start(), t0() + Duration::seconds(8));

        // Closing again only counts the new interval
        acc.observe("B", t0() + Duration::seconds(10));
        assert_eq!(acc.log().seconds("A"), 10.0);
    }

    #[test]
    fn test_rollover_split_at_midnight() {
        let evening = Local.with_ymd_and_hms(2024, 1, 15, 23, 59, 50).unwrap();
        let mut acc = Accumulator::new(evening.date_naive(), ActivityLog::new(), evening);
        acc.observe("A", evening);

        let after = evening + Duration::seconds(25);
        let new_day = acc.rollover_due(after).unwrap();
        assert_eq!(new_day, NaiveDate::from_ymd_opt(2024, 1, 16).unwrap());

        let midnight = start_of_day(new_day).unwrap();
        acc.close_interval(midnight);
        assert_eq!(acc.log().seconds("A"), 10.0);

        acc.begin_day(new_day, ActivityLog::new(), midnight);
        acc.observe("B", after);

        assert_eq!(acc.date(), new_day);
        assert_eq!(acc.log().seconds("A"), 15.0);
    }

    #[test]
    fn test_no_rollover_same_day() {
        let acc = accumulator();
        assert!(acc.rollover_due(t0() + Duration::hours(2)).is_none());
    }

    #[test]
    fn test_snapshot_includes_open_interval() {
        let mut acc = accumulator();
        acc.observe("A", t0());
        acc.observe("B", t0() + Duration::seconds(5));

        let snapshot = acc.snapshot();
        let live = snapshot.with_open_interval(t0() + Duration::seconds(9));

        assert_eq!(snapshot.log.seconds("B"), 0.0);
        assert_eq!(live.seconds("A"), 5.0);
        assert_eq!(live.seconds("B"), 4.0);
    }
}
