//! Background sampling loop
//!
//! One thread samples the foreground application every poll interval and
//! feeds the accumulator. Readers get cloned snapshots through a mutex, so
//! presentation never blocks on the tick for longer than a clone.

use crate::{ForegroundSource, Poller, Sample};
use apptime_core::accumulator::{start_of_day, Accumulator, Snapshot, Transition};
use apptime_core::{ActivityLog, NameMap, Store, StoreError};
use chrono::{DateTime, Local, NaiveDate};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Granularity at which a sleeping loop notices `stop()`
const STOP_CHECK_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Tracker already running")]
    AlreadyRunning,
    #[error("Failed to spawn sampling thread: {0}")]
    Spawn(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub poll_interval: Duration,
    /// Close and save the open interval when tracking stops. When false the
    /// time since the last transition is dropped.
    pub flush_on_stop: bool,
    /// Start a new day's log at local midnight. When false everything is
    /// recorded into the log of the day tracking started.
    pub rollover_at_midnight: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            flush_on_stop: true,
            rollover_at_midnight: false,
        }
    }
}

struct Shared {
    config: TrackerConfig,
    store: Store,
    poller: Poller,
    state: Mutex<Accumulator>,
    running: AtomicBool,
    write_failing: AtomicBool,
}

pub struct Tracker {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl Tracker {
    /// Create a tracker for today, resuming today's log if it exists
    pub fn new(store: Store, source: Box<dyn ForegroundSource>, config: TrackerConfig) -> Self {
        let now = Local::now();
        let today = now.date_naive();

        let log = store.load_log(today).unwrap_or_else(|e| {
            warn!("Starting today's log empty: {}", e);
            ActivityLog::new()
        });
        let name_map = store.load_name_map().unwrap_or_else(|e| {
            warn!("Starting with an empty name map: {}", e);
            NameMap::new()
        });

        info!(
            "Tracking {} ({} apps already recorded)",
            today,
            log.len()
        );

        Self {
            shared: Arc::new(Shared {
                config,
                store,
                poller: Poller::new(source, name_map),
                state: Mutex::new(Accumulator::new(today, log, now)),
                running: AtomicBool::new(false),
                write_failing: AtomicBool::new(false),
            }),
            handle: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Start sampling on a background thread
    pub fn start(&mut self) -> Result<()> {
        if self.handle.is_some() {
            return Err(TrackerError::AlreadyRunning);
        }

        self.shared.running.store(true, Ordering::SeqCst);
        let shared = Arc::clone(&self.shared);

        let spawned = thread::Builder::new()
            .name("apptime-sampler".to_string())
            .spawn(move || shared.run());

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::SeqCst);
                Err(TrackerError::Spawn(e))
            }
        }
    }

    /// Stop sampling and wait for the loop to exit. The loop finishes its
    /// current tick; the open interval is then saved if `flush_on_stop`.
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);

        let Some(handle) = self.handle.take() else {
            return;
        };
        if handle.join().is_err() {
            warn!("Sampling thread panicked");
        }

        if self.shared.config.flush_on_stop {
            self.flush(Local::now());
        } else {
            debug!("Dropping open interval on stop");
        }
        info!("Tracking stopped");
    }

    /// Run one sampling step at `now`
    pub fn tick(&self, now: DateTime<Local>) -> Transition {
        self.shared.tick(now)
    }

    /// Close the open interval at `now` and save the log
    pub fn flush(&self, now: DateTime<Local>) {
        let pending = {
            let mut state = self.shared.lock_state();
            state
                .close_interval(now)
                .map(|_| (state.date(), state.log().clone()))
        };
        if let Some((date, log)) = pending {
            self.shared.persist(date, &log);
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.shared.lock_state().snapshot()
    }

    pub fn name_map(&self) -> NameMap {
        self.shared.poller.name_map()
    }

    /// Replace the name map and save it
    pub fn set_name_map(&self, map: NameMap) -> std::result::Result<(), StoreError> {
        self.shared.store.save_name_map(&map)?;
        self.shared.poller.set_name_map(map);
        Ok(())
    }

    /// Pick up name map edits made by another process
    pub fn reload_name_map(&self) -> std::result::Result<(), StoreError> {
        let map = self.shared.store.load_name_map()?;
        info!("Reloaded name map ({} entries)", map.len());
        self.shared.poller.set_name_map(map);
        Ok(())
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Shared {
    fn run(&self) {
        info!(
            "Sampling foreground application every {:?}",
            self.config.poll_interval
        );

        while self.running.load(Ordering::SeqCst) {
            self.tick(Local::now());
            self.sleep_interval();
        }
    }

    fn sleep_interval(&self) {
        let deadline = Instant::now() + self.config.poll_interval;
        while self.running.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep(STOP_CHECK_INTERVAL.min(deadline - now));
        }
    }

    fn tick(&self, now: DateTime<Local>) -> Transition {
        let sample = self.poller.sample();
        if let Sample::Unresolved(reason) = &sample {
            debug!("Foreground lookup failed: {}", reason);
        }

        let mut pending: Vec<(NaiveDate, ActivityLog)> = Vec::new();
        let transition = {
            let mut state = self.lock_state();

            if self.config.rollover_at_midnight {
                if let Some(previous) = self.roll_over(&mut state, now) {
                    pending.push(previous);
                }
            }

            let transition = state.observe(sample.identifier(), now);
            match &transition {
                Transition::Closed(closeout) => {
                    debug!(
                        "{} -> {} after {:.1}s",
                        closeout.app,
                        sample.identifier(),
                        closeout.elapsed
                    );
                    pending.push((state.date(), state.log().clone()));
                }
                Transition::Opened { app } => debug!("First application: {}", app),
                Transition::Continued => {}
            }
            transition
        };

        for (date, log) in pending {
            self.persist(date, &log);
        }
        transition
    }

    /// Move the accumulator to the current day if midnight has passed.
    /// Returns the finished day's log when closing it added time; a day
    /// with no open interval is left as it is on disk.
    fn roll_over(
        &self,
        state: &mut Accumulator,
        now: DateTime<Local>,
    ) -> Option<(NaiveDate, ActivityLog)> {
        let new_day = state.rollover_due(now)?;
        let midnight = start_of_day(new_day).unwrap_or(now).min(now);

        let previous_day = state.date();
        let finished = state
            .close_interval(midnight)
            .map(|_| (previous_day, state.log().clone()));

        let log = self.store.load_log(new_day).unwrap_or_else(|e| {
            warn!("Starting log for {} empty: {}", new_day, e);
            ActivityLog::new()
        });
        state.begin_day(new_day, log, midnight);

        info!("Day rolled over from {} to {}", previous_day, new_day);
        finished
    }

    /// Save a log. Failures leave the in-memory totals intact so the next
    /// save writes them.
    fn persist(&self, date: NaiveDate, log: &ActivityLog) {
        match self.store.save_log(date, log) {
            Ok(()) => {
                if self.write_failing.swap(false, Ordering::SeqCst) {
                    info!("Saving logs works again");
                }
            }
            Err(e) => {
                if !self.write_failing.swap(true, Ordering::SeqCst) {
                    warn!("Failed to save log for {}: {} (will retry on next change)", date, e);
                }
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, Accumulator> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
