//! Control of the background `apptime-daemon` process

use anyhow::{Context, Result};
use apptime_core::{Store, Summary};
use chrono::{DateTime, Local, NaiveDate};
use colored::Colorize;
use std::path::Path;
use std::process::{Command, ExitStatus};
use tracing::warn;

const DAEMON_BINARY: &str = "apptime-daemon";

#[cfg(windows)]
const DAEMON_IMAGE: &str = "apptime-daemon.exe";
#[cfg(not(windows))]
const DAEMON_IMAGE: &str = "apptime-daemon";

/// Report whether the daemon runs and what it has written today
pub fn status(store: &Store, today: NaiveDate) -> Result<()> {
    let pids = running_pids();
    if pids.is_empty() {
        println!("{}", "✗ Daemon is not running".red());
    } else {
        println!("{} (PID: {})", "✓ Daemon is running".green(), join_pids(&pids));
    }

    println!("Data directory: {}", store.root().display());

    let path = store.log_path(today);
    let Some(written) = last_written(&path) else {
        println!("Today's log:    {}", "nothing recorded yet".dimmed());
        return Ok(());
    };

    match store.load_log(today) {
        Ok(log) => println!(
            "Today's log:    {} apps, {} total",
            log.len(),
            Summary::format_seconds(log.total_seconds())
        ),
        Err(e) => println!("Today's log:    {}: {}", "unreadable".red(), e),
    }
    println!(
        "Last written:   {} ({})",
        written.format("%H:%M:%S"),
        describe_age(Local::now() - written)
    );

    Ok(())
}

/// Launch the daemon on the same data directory as this invocation
pub fn start(data_dir: Option<&Path>) -> Result<()> {
    // A second daemon would count every interval twice
    let pids = running_pids();
    if !pids.is_empty() {
        println!("{} (PID: {})", "Daemon is already running".yellow(), join_pids(&pids));
        return Ok(());
    }

    let child = daemon_command(data_dir)
        .spawn()
        .with_context(|| format!("Failed to start {}", DAEMON_BINARY))?;
    println!("{} (PID: {})", "✓ Daemon started".green(), child.id());
    Ok(())
}

pub fn stop() -> Result<()> {
    let pids = running_pids();
    if pids.is_empty() {
        println!("{}", "Daemon was not running".yellow());
        return Ok(());
    }

    for pid in pids {
        let status = interrupt(pid).with_context(|| format!("Failed to signal PID {}", pid))?;
        if status.success() {
            println!("{} (PID: {})", "✓ Daemon stopped".green(), pid);
        } else {
            println!("{} (PID: {})", "✗ Could not stop daemon".red(), pid);
        }
    }
    Ok(())
}

fn daemon_command(data_dir: Option<&Path>) -> Command {
    let mut command = Command::new(DAEMON_BINARY);
    if let Some(dir) = data_dir {
        command.arg("--data-dir").arg(dir);
    }
    command
}

/// PIDs of processes whose name is exactly the daemon's
fn running_pids() -> Vec<u32> {
    let output = if cfg!(windows) {
        Command::new("tasklist")
            .args(["/FI", &format!("IMAGENAME eq {}", DAEMON_IMAGE), "/FO", "CSV", "/NH"])
            .output()
    } else {
        Command::new("pgrep").args(["-x", DAEMON_IMAGE]).output()
    };

    match output {
        Ok(out) => {
            let stdout = String::from_utf8_lossy(&out.stdout);
            if cfg!(windows) {
                parse_tasklist(&stdout, DAEMON_IMAGE)
            } else {
                parse_pgrep(&stdout)
            }
        }
        Err(e) => {
            warn!("Could not list processes: {}", e);
            Vec::new()
        }
    }
}

/// SIGINT runs the daemon's Ctrl+C shutdown, which saves the open interval.
/// `taskkill /F` on Windows does not.
fn interrupt(pid: u32) -> std::io::Result<ExitStatus> {
    let pid = pid.to_string();
    let output = if cfg!(windows) {
        Command::new("taskkill").args(["/PID", &pid, "/F"]).output()?
    } else {
        Command::new("kill").args(["-INT", &pid]).output()?
    };
    Ok(output.status)
}

fn parse_pgrep(stdout: &str) -> Vec<u32> {
    stdout
        .lines()
        .filter_map(|line| line.trim().parse().ok())
        .collect()
}

/// Rows look like `"apptime-daemon.exe","4242","Console","1","9,120 K"`.
/// With no match tasklist prints an `INFO:` line instead.
fn parse_tasklist(stdout: &str, image: &str) -> Vec<u32> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut fields = line.split(',').map(|f| f.trim().trim_matches('"'));
            let name = fields.next()?;
            if !name.eq_ignore_ascii_case(image) {
                return None;
            }
            fields.next()?.parse().ok()
        })
        .collect()
}

fn join_pids(pids: &[u32]) -> String {
    pids.iter()
        .map(|pid| pid.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn last_written(path: &Path) -> Option<DateTime<Local>> {
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(modified.into())
}

fn describe_age(age: chrono::Duration) -> String {
    let seconds = age.num_seconds();
    if seconds < 1 {
        "just now".to_string()
    } else {
        format!("{} ago", Summary::format_seconds(seconds as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    #[test]
    fn test_daemon_command_passes_data_dir() {
        let command = daemon_command(Some(Path::new("/tmp/apptime-data")));
        assert_eq!(command.get_program(), OsStr::new("apptime-daemon"));
        let args: Vec<&OsStr> = command.get_args().collect();
        assert_eq!(args, [OsStr::new("--data-dir"), OsStr::new("/tmp/apptime-data")]);
    }

    #[test]
    fn test_daemon_command_without_data_dir() {
        let command = daemon_command(None);
        assert_eq!(command.get_args().count(), 0);
    }

    #[test]
    fn test_parse_pgrep() {
        assert_eq!(parse_pgrep("4242\n17\n"), vec![4242, 17]);
        assert!(parse_pgrep("").is_empty());
    }

    #[test]
    fn test_parse_tasklist() {
        let stdout = "\"apptime-daemon.exe\",\"4242\",\"Console\",\"1\",\"9,120 K\"\r\n";
        assert_eq!(parse_tasklist(stdout, "apptime-daemon.exe"), vec![4242]);

        let none = "INFO: No tasks are running which match the specified criteria.\r\n";
        assert!(parse_tasklist(none, "apptime-daemon.exe").is_empty());
    }

    #[test]
    fn test_parse_tasklist_ignores_other_images() {
        let stdout = "\"apptime-daemon-old.exe\",\"99\",\"Console\",\"1\",\"1,000 K\"\r\n";
        assert!(parse_tasklist(stdout, "apptime-daemon.exe").is_empty());
    }

    #[test]
    fn test_describe_age() {
        assert_eq!(describe_age(chrono::Duration::zero()), "just now");
        assert_eq!(describe_age(chrono::Duration::seconds(-5)), "just now");
        assert_eq!(describe_age(chrono::Duration::seconds(125)), "2m 5s ago");
    }

    #[test]
    fn test_last_written_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(last_written(&dir.path().join("missing.json")).is_none());

        let path = dir.path().join("log.json");
        std::fs::write(&path, "{}").unwrap();
        assert!(last_written(&path).is_some());
    }
}
