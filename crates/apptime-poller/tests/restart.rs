//! Same-day restart behaviour: totals resume from the saved log and are
//! neither lost nor counted twice.

use apptime_core::Store;
use apptime_poller::{ForegroundProcess, ForegroundSource, PlatformError, Tracker, TrackerConfig};
use chrono::{Duration, Local};
use std::sync::Mutex;

struct Sequence(Mutex<Vec<&'static str>>);

impl Sequence {
    fn boxed(names: &[&'static str]) -> Box<Self> {
        let mut names = names.to_vec();
        names.reverse();
        Box::new(Self(Mutex::new(names)))
    }
}

impl ForegroundSource for Sequence {
    fn foreground_process(&self) -> Result<ForegroundProcess, PlatformError> {
        self.0
            .lock()
            .unwrap()
            .pop()
            .map(|name| ForegroundProcess {
                pid: 7,
                name: name.to_string(),
            })
            .ok_or(PlatformError::Unsupported)
    }
}

#[test]
fn restart_resumes_without_double_counting() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path());
    let t0 = Local::now();

    let first = Tracker::new(store.clone(), Sequence::boxed(&["editor", "browser"]), TrackerConfig::default());
    let today = first.snapshot().date;
    first.tick(t0);
    first.tick(t0 + Duration::seconds(40));
    first.flush(t0 + Duration::seconds(50));
    drop(first);

    let after_first = store.load_log(today).unwrap();
    assert_eq!(after_first.seconds("editor"), 40.0);
    assert_eq!(after_first.seconds("browser"), 10.0);

    let bytes_before = std::fs::read(store.log_path(today)).unwrap();
    let second = Tracker::new(store.clone(), Sequence::boxed(&["browser", "editor"]), TrackerConfig::default());
    assert_eq!(second.snapshot().log, after_first);

    // Opening the first interval writes nothing
    second.tick(t0 + Duration::seconds(60));
    assert_eq!(std::fs::read(store.log_path(today)).unwrap(), bytes_before);

    second.tick(t0 + Duration::seconds(80));
    let resumed = store.load_log(today).unwrap();
    assert_eq!(resumed.seconds("browser"), 30.0);
    assert_eq!(resumed.seconds("editor"), 40.0);
}
