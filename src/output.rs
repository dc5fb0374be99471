use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

static OUTPUT_JSON: AtomicBool = AtomicBool::new(false);
static QUIET: AtomicBool = AtomicBool::new(false);

pub fn set_json_output(json: bool) {
    OUTPUT_JSON.store(json, Ordering::Relaxed);
}

pub fn is_json_output() -> bool {
    OUTPUT_JSON.load(Ordering::Relaxed)
}

pub fn set_quiet(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

/// Print a table or JSON depending on output mode
pub fn print_table<T, R, F>(items: &[T], to_row: F)
where
    T: Serialize,
    R: Tabled,
    F: Fn(&T) -> R,
{
    if is_json_output() {
        println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
    } else if items.is_empty() {
        print_message("Nothing found.");
    } else {
        let rows: Vec<R> = items.iter().map(to_row).collect();
        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{table}");
    }
}

/// Print a single item or JSON depending on output mode
pub fn print_item<T: Serialize>(item: &T, display: impl FnOnce(&T)) {
    if is_json_output() {
        println!("{}", serde_json::to_string_pretty(item).unwrap_or_default());
    } else {
        display(item);
    }
}

/// Informational line; dropped with `--quiet` and in JSON mode.
pub fn print_message(message: &str) {
    if !is_quiet() && !is_json_output() {
        println!("{message}");
    }
}

/// Problem report on stderr, shown in every mode.
pub fn print_failure(message: &str) {
    eprintln!("{} {message}", "✗".red().bold());
}

/// Format status with color based on its name
pub fn status_colored(status: &str) -> String {
    let lower = status.to_lowercase();
    if lower.contains("done")
        || lower.contains("resolved")
        || lower.contains("closed")
        || lower.contains("fixed")
    {
        status.green().to_string()
    } else if lower.contains("progress") || lower.contains("started") {
        status.blue().to_string()
    } else if lower.contains("review") {
        status.magenta().to_string()
    } else if lower.contains("blocked") || lower.contains("reopened") {
        status.red().to_string()
    } else if lower.contains("open") || lower.contains("backlog") || lower.contains("to do") {
        status.bright_black().to_string()
    } else {
        status.to_string()
    }
}

/// Local `YYYY-MM-DD HH:MM`.
pub fn format_date(dt: &DateTime<Utc>) -> String {
    let local: DateTime<Local> = (*dt).into();
    local.format("%Y-%m-%d %H:%M").to_string()
}

/// Truncate a string with ellipsis
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
