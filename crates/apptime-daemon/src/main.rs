//! AppTime Daemon
//!
//! Background service that samples the foreground application and records
//! per-application active time into daily log files.

use anyhow::Result;
use apptime_core::{accumulator::Snapshot, Store, Summary};
use apptime_poller::{NativeSource, Tracker, TrackerConfig};
use chrono::Local;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "apptime-daemon")]
#[command(about = "Record how long each application is in the foreground")]
#[command(version)]
struct Args {
    /// Data directory (defaults to the platform data directory)
    #[arg(long, env = "APPTIME_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Poll interval (milliseconds)
    #[arg(long, default_value_t = 1000)]
    poll_ms: u64,

    /// How often to log the current totals (seconds)
    #[arg(long, default_value_t = 60)]
    status_secs: u64,

    /// Drop the time since the last app switch on shutdown instead of saving it
    #[arg(long)]
    no_flush_on_stop: bool,

    /// Start a new daily log at midnight instead of keeping the start day's log
    #[arg(long)]
    rollover_at_midnight: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("apptime=info".parse()?),
        )
        .init();

    let args = Args::parse();

    info!("AppTime daemon starting...");

    let store = match &args.data_dir {
        Some(dir) => Store::open(dir),
        None => Store::open_default(),
    };
    info!("Data directory: {:?}", store.root());

    let config = TrackerConfig {
        poll_interval: Duration::from_millis(args.poll_ms.max(1)),
        flush_on_stop: !args.no_flush_on_stop,
        rollover_at_midnight: args.rollover_at_midnight,
    };

    let name_map_path = store.name_map_path();
    let mut tracker = Tracker::new(store, Box::new(NativeSource), config);
    tracker.start()?;

    info!("Tracking foreground applications (press Ctrl+C to stop)...");

    let mut status = tokio::time::interval(Duration::from_secs(args.status_secs.max(1)));
    let mut name_map_modified = modified_time(&name_map_path);

    // Registered once so a signal arriving during a status report is not lost
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            _ = status.tick() => {
                let modified = modified_time(&name_map_path);
                if modified != name_map_modified {
                    name_map_modified = modified;
                    if let Err(e) = tracker.reload_name_map() {
                        warn!("Keeping current name map: {}", e);
                    }
                }
                report(&tracker.snapshot());
            }
        }
    }

    info!("Shutting down...");
    tokio::task::spawn_blocking(move || tracker.stop()).await?;

    info!("AppTime daemon stopped");
    Ok(())
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Log today's totals including the interval still in progress
fn report(snapshot: &Snapshot) {
    let log = snapshot.with_open_interval(Local::now());
    let current = snapshot.current_app.as_deref().unwrap_or("-");

    info!(
        "{}: {} apps, {} total, current: {}",
        snapshot.date,
        log.len(),
        Summary::format_seconds(log.total_seconds()),
        current
    );

    let mut apps: Vec<(&str, f64)> = log.iter().collect();
    apps.sort_by(|a, b| b.1.total_cmp(&a.1));
    for (app, seconds) in apps.into_iter().take(5) {
        info!("  {:<30} {}", app, Summary::format_seconds(seconds));
    }
}
