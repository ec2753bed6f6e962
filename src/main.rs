// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use leave_calendar::{
    build_grid_with, open_source, sort_for_display, Config, EventQualityEngine, LeaveEvent,
    MonthLayout, SearchParams, YearMonth,
};
use std::env;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Log file used while the TUI holds the terminal
const TUI_LOG_FILE: &str = "leave-calendar.log";

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let mode = args.get(1).map(String::as_str).unwrap_or("tui");

    // The TUI owns the terminal, so its logs go to a file
    if mode == "tui" {
        init_file_tracing(Path::new(TUI_LOG_FILE), "warn")?;
    } else {
        init_tracing("info");
    }

    let config = Config::load()?;

    match mode {
        "tui" => run_ui_mode(&config),
        "layout" => run_layout(&config, &args[2..]),
        "grid" => run_grid(&config, &args[2..]),
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            print_usage();
            bail!("unknown command: {}", other)
        }
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn init_file_tracing(path: &Path, default_level: &str) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  leave-calendar [tui]                    interactive month view");
    eprintln!("  leave-calendar layout <YYYY-MM> [file]  print the month layout as JSON");
    eprintln!("  leave-calendar grid <YYYY-MM>           print the week grid");
}

fn parse_month(args: &[String]) -> Result<YearMonth> {
    match args.first() {
        Some(raw) => raw.parse().with_context(|| format!("Invalid month: {}", raw)),
        None => Ok(YearMonth::current()),
    }
}

/// Events from an explicit JSON file, or from the configured source
fn load_events(config: &Config, month: YearMonth, file: Option<&String>) -> Result<Vec<LeaveEvent>> {
    match file {
        Some(path) => {
            let path = Path::new(path);
            let file = File::open(path)
                .with_context(|| format!("Failed to open file: {}", path.display()))?;
            let json: serde_json::Value = serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("Failed to parse JSON from {}", path.display()))?;
            leave_calendar::source::events_from_json(&json)
        }
        None => {
            let source = open_source(&config.source)?;
            let params = SearchParams::new(config.filter.business_group.clone(), month);
            source
                .fetch_events(&params)
                .with_context(|| format!("Failed to load events from {}", source.describe()))
        }
    }
}

fn run_layout(config: &Config, args: &[String]) -> Result<()> {
    let month = parse_month(args)?;
    let events = load_events(config, month, args.get(1))?;

    let (mut events, summary) = EventQualityEngine::new().usable_events(&events);
    eprintln!(
        "📊 {} events: {} layoutable, {} dropped, {} with warnings",
        summary.total, summary.layoutable, summary.dropped, summary.warnings
    );

    if config.layout.sort_events {
        sort_for_display(&mut events);
    }

    let layout = MonthLayout::compute(month, config.layout.week_start, &events, config.layout.heights);
    println!("{}", serde_json::to_string_pretty(&layout)?);

    Ok(())
}

fn run_grid(config: &Config, args: &[String]) -> Result<()> {
    let month = parse_month(args)?;
    let week_start = config.layout.week_start;
    let grid = build_grid_with(month, week_start);

    println!("📅 {} ({} weeks)", month, grid.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{}", week_start.day_labels().map(|l| format!("{:>4}", l)).join(""));

    for week in grid.weeks() {
        let line: String = week
            .days()
            .iter()
            .map(|day| {
                if month.contains(*day) {
                    format!("{:>4}", day.format("%-d"))
                } else {
                    format!("{:>4}", "·")
                }
            })
            .collect();
        println!("{}", line);
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &Config) -> Result<()> {
    println!("🖥️  Loading Leave Calendar...\n");

    let source = open_source(&config.source)?;
    println!("📂 Source: {}", source.describe());

    let business_group = if config.filter.business_group.is_empty() {
        // Fall back to the first group the source knows about
        source
            .business_groups()
            .ok()
            .and_then(|groups| groups.into_iter().next())
            .map(|g| g.value)
            .unwrap_or_default()
    } else {
        config.filter.business_group.clone()
    };

    let mut app = ui::App::new(source, config.layout.clone());
    app.search(SearchParams::new(business_group, YearMonth::current()));

    ui::run_ui(&mut app)?;

    println!("\n✅ Leave Calendar closed");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &Config) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use: leave-calendar layout <YYYY-MM>");
    std::process::exit(1);
}
