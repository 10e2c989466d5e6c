//! AppTime CLI
//!
//! Command-line interface for viewing per-application active time and
//! editing display names, goals, and visibility.

use anyhow::{bail, Result};
use apptime_core::{
    export::{ExportFormat, Exporter},
    summary::{AppTotal, Summary, TimeRange},
    DisplayFlags, Goals, NameMap, Store,
};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use tabled::{settings::Style, Table, Tabled};
use tracing::warn;

mod daemon;

/// Width of a full bar layer in the chart
const BAR_WIDTH: usize = 30;

#[derive(Parser)]
#[command(name = "apptime")]
#[command(about = "Foreground application time tracker - see where your time goes")]
#[command(version)]
struct Cli {
    /// Data directory (defaults to the platform data directory)
    #[arg(long, global = true, env = "APPTIME_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ChartArgs {
    /// Bar limit in minutes; longer totals stack into extra layers
    #[arg(short, long, default_value_t = 180)]
    limit: u32,

    /// Include apps hidden with `apptime hide`
    #[arg(long)]
    all: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show today's active time per app
    Today(ChartArgs),

    /// Show yesterday's active time per app
    Yesterday(ChartArgs),

    /// Show the last seven days (including today)
    Week(ChartArgs),

    /// Show active time for a custom date range
    Range {
        /// Start date (YYYY-MM-DD)
        start: String,
        /// End date (YYYY-MM-DD)
        end: String,
        #[command(flatten)]
        chart: ChartArgs,
    },

    /// Manage display names for processes
    Names {
        #[command(subcommand)]
        action: NamesAction,
    },

    /// Manage goal times per app
    Goals {
        #[command(subcommand)]
        action: GoalsAction,
    },

    /// Show an app in summaries
    Show {
        app: String,
    },

    /// Hide an app from summaries
    Hide {
        app: String,
    },

    /// Export data to CSV or JSON
    Export {
        /// Output format (csv or json)
        #[arg(short, long, default_value = "json", value_parser = parse_export_format)]
        format: ExportFormat,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Time range (today, yesterday, week, month, all)
        #[arg(short, long, default_value = "all", value_parser = parse_time_range)]
        range: TimeRange,

        /// Export only totals (no per-day breakdown)
        #[arg(long)]
        summary: bool,
    },

    /// Show daemon status
    Status,

    /// Start the daemon
    Start,

    /// Stop the daemon
    Stop,
}

#[derive(Subcommand)]
enum NamesAction {
    /// List process name mappings
    List,
    /// Map a process name to a display name (blank removes the mapping)
    Set { process: String, display: String },
    /// Remove a mapping
    Remove { process: String },
}

#[derive(Subcommand)]
enum GoalsAction {
    /// List goal times
    List,
    /// Set the goal time for an app in minutes (0 clears it)
    Set { app: String, minutes: u32 },
}

#[derive(Tabled)]
struct AppRow {
    #[tabled(rename = "App")]
    app: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Progress")]
    progress: String,
}

#[derive(Tabled)]
struct NameRow {
    #[tabled(rename = "Process")]
    process: String,
    #[tabled(rename = "Display Name")]
    display: String,
}

#[derive(Tabled)]
struct GoalRow {
    #[tabled(rename = "App")]
    app: String,
    #[tabled(rename = "Goal")]
    goal: String,
}

fn parse_time_range(s: &str) -> std::result::Result<TimeRange, String> {
    TimeRange::parse(s)
        .ok_or_else(|| format!("unknown range '{}' (today, yesterday, week, month, all)", s))
}

fn parse_export_format(s: &str) -> std::result::Result<ExportFormat, String> {
    ExportFormat::parse(s).ok_or_else(|| format!("unknown format '{}' (csv, json)", s))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("apptime=warn".parse()?),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let store = match &cli.data_dir {
        Some(dir) => Store::open(dir),
        None => Store::open_default(),
    };
    let today = Local::now().date_naive();

    match cli.command {
        Commands::Today(chart) => show_apps(&store, TimeRange::Today, today, "Today", &chart),
        Commands::Yesterday(chart) => {
            show_apps(&store, TimeRange::Yesterday, today, "Yesterday", &chart)
        }
        Commands::Week(chart) => show_apps(&store, TimeRange::Week, today, "Last 7 Days", &chart),

        Commands::Range { start, end, chart } => {
            let start_date = NaiveDate::parse_from_str(&start, "%Y-%m-%d")?;
            let end_date = NaiveDate::parse_from_str(&end, "%Y-%m-%d")?;
            if end_date < start_date {
                bail!("end date {} is before start date {}", end, start);
            }

            let range = TimeRange::Custom {
                start: start_date,
                end: end_date,
            };
            show_apps(&store, range, today, &format!("{} to {}", start, end), &chart)
        }

        Commands::Names { action } => edit_names(&store, action),
        Commands::Goals { action } => edit_goals(&store, action),
        Commands::Show { app } => set_visibility(&store, &app, true),
        Commands::Hide { app } => set_visibility(&store, &app, false),

        Commands::Export {
            format,
            output,
            range,
            summary,
        } => {
            let exporter = Exporter::new(&store);

            let writer: Box<dyn Write> = match output {
                Some(path) => Box::new(File::create(path)?),
                None => Box::new(io::stdout()),
            };

            if summary {
                exporter.export_summary(writer, range, today, format)?;
            } else {
                exporter.export(writer, range, today, format)?;
            }

            Ok(())
        }

        Commands::Status => daemon::status(&store, today),
        Commands::Start => daemon::start(cli.data_dir.as_deref()),
        Commands::Stop => daemon::stop(),
    }
}

fn show_apps(
    store: &Store,
    range: TimeRange,
    today: NaiveDate,
    label: &str,
    chart: &ChartArgs,
) -> Result<()> {
    if chart.limit == 0 {
        bail!("--limit must be at least 1 minute");
    }

    let apps: Vec<AppTotal> = Summary::new(store)
        .app_totals(range, today)?
        .into_iter()
        .filter(|app| chart.all || app.visible)
        .collect();

    if apps.is_empty() {
        println!("\n{}", "No activity recorded for this period.".yellow());
        return Ok(());
    }

    println!("\n{}", format!("⏱  {} Active Time", label).bold().cyan());
    println!("{}", "─".repeat(40));

    let rows: Vec<AppRow> = apps
        .iter()
        .map(|app| AppRow {
            app: app.app.clone(),
            time: Summary::format_seconds(app.seconds),
            progress: Summary::format_progress(app.seconds, app.goal_minutes),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);

    print_chart(&apps, chart.limit);

    Ok(())
}

/// Horizontal bar chart. Each full `limit` of minutes is one layer; layers
/// beyond the first are shown as a multiplier after the bar.
fn print_chart(apps: &[AppTotal], limit: u32) {
    let limit = limit as f64;
    let name_width = apps
        .iter()
        .map(|app| app.app.chars().count())
        .max()
        .unwrap_or(0)
        .min(24);

    println!("\n{}", format!("Limit: {} min per layer", limit).dimmed());

    for app in apps {
        let layers = Summary::stack_layers(app.minutes(), limit);
        let top = layers.last().copied().unwrap_or(0.0);
        let full_layers = layers.len() - 1;

        let filled = ((top / limit) * BAR_WIDTH as f64).round() as usize;
        let filled = filled.min(BAR_WIDTH);
        let bar = format!(
            "{}{}",
            "█".repeat(filled),
            "░".repeat(BAR_WIDTH - filled)
        );

        let stacked = if full_layers > 0 {
            format!(" +{}×{}m", full_layers, limit)
        } else {
            String::new()
        };

        let name: String = app.app.chars().take(name_width).collect();
        println!(
            "{:<width$} {}{} {:.0}m",
            name,
            bar.green(),
            stacked.yellow(),
            app.minutes(),
            width = name_width
        );
    }
}

fn load_or_default<T: Default>(loaded: apptime_core::store::Result<T>, what: &str) -> T {
    loaded.unwrap_or_else(|e| {
        warn!("Ignoring unreadable {}: {}", what, e);
        T::default()
    })
}

fn edit_names(store: &Store, action: NamesAction) -> Result<()> {
    let mut map: NameMap = load_or_default(store.load_name_map(), "name map");

    match action {
        NamesAction::List => {
            if map.is_empty() {
                println!("{}", "No display names configured.".yellow());
                return Ok(());
            }
            let rows: Vec<NameRow> = map
                .iter()
                .map(|(process, display)| NameRow {
                    process: process.to_string(),
                    display: display.to_string(),
                })
                .collect();
            println!("{}", Table::new(rows).with(Style::rounded()));
        }
        NamesAction::Set { process, display } => {
            map.set(&process, &display);
            store.save_name_map(&map)?;
            println!("{} {} → {}", "✓".green(), process, map.resolve(&process));
        }
        NamesAction::Remove { process } => match map.remove(&process) {
            Some(display) => {
                store.save_name_map(&map)?;
                println!("{} Removed {} → {}", "✓".green(), process, display);
            }
            None => println!("{}", format!("No mapping for {}", process).yellow()),
        },
    }

    Ok(())
}

fn edit_goals(store: &Store, action: GoalsAction) -> Result<()> {
    let mut goals: Goals = load_or_default(store.load_goals(), "goals");

    match action {
        GoalsAction::List => {
            if goals.is_empty() {
                println!("{}", "No goals configured.".yellow());
                return Ok(());
            }
            let rows: Vec<GoalRow> = goals
                .iter()
                .map(|(app, minutes)| GoalRow {
                    app: app.to_string(),
                    goal: format!("{} min", minutes),
                })
                .collect();
            println!("{}", Table::new(rows).with(Style::rounded()));
        }
        GoalsAction::Set { app, minutes } => {
            goals.set(&app, minutes);
            store.save_goals(&goals)?;
            println!("{} Goal for {}: {} min", "✓".green(), app, minutes);
        }
    }

    Ok(())
}

fn set_visibility(store: &Store, app: &str, visible: bool) -> Result<()> {
    let mut flags: DisplayFlags = load_or_default(store.load_display_flags(), "display flags");
    flags.set(app, visible);
    store.save_display_flags(&flags)?;

    let state = if visible { "shown" } else { "hidden" };
    println!("{} {} is now {}", "✓".green(), app, state);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_export_defaults() {
        let cli = Cli::try_parse_from(["apptime", "export"]).unwrap();
        let Commands::Export { format, range, .. } = cli.command else {
            panic!("expected export");
        };
        assert_eq!(format, ExportFormat::Json);
        assert_eq!(range, TimeRange::AllTime);
    }

    #[test]
    fn test_export_parses_range_and_format() {
        let cli = Cli::try_parse_from(["apptime", "export", "--range", "week", "--format", "CSV"]).unwrap();
        let Commands::Export { format, range, .. } = cli.command else {
            panic!("expected export");
        };
        assert_eq!(format, ExportFormat::Csv);
        assert_eq!(range, TimeRange::Week);
    }

    #[test]
    fn test_export_rejects_unknown_range() {
        assert!(Cli::try_parse_from(["apptime", "export", "--range", "fortnight"]).is_err());
    }

    #[test]
    fn test_export_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["apptime", "export", "--format", "xml"]).is_err());
    }
}
