//! Final run summary.

use anyhow::{Context, Result};
use colored::{Color, Colorize};
use tabled::{settings::Style, Table, Tabled};

use depotsync_sync::{Severity, SyncReport};

#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "outcome")]
    outcome: &'static str,
    #[tabled(rename = "files")]
    count: usize,
}

pub fn print_text(report: &SyncReport) {
    print!("{}", render_text(report));
}

pub fn print_json(report: &SyncReport) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(report).context("failed to serialize sync report")?
    );
    Ok(())
}

fn render_text(report: &SyncReport) -> String {
    let color = severity_color(report.severity());
    let mut out = String::new();

    let headline = if report.aborted {
        format!(
            "Sync aborted after a connection failure ({} dispatched, {} not synced)",
            report.dispatched, report.remaining
        )
    } else {
        format!("Sync finished in {:.1}s", report.elapsed_ms as f64 / 1000.0)
    };
    out.push_str(&format!("{}\n", paint(&headline, color).bold()));

    let rows: Vec<CountRow> = [
        ("errors", report.errors),
        ("conflicts", report.conflicts),
        ("clobbered", report.clobbered),
        ("updated", report.updated),
        ("added", report.added),
        ("deleted", report.deleted),
    ]
    .into_iter()
    .map(|(outcome, count)| CountRow { outcome, count })
    .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    out.push_str(&format!("{table}\n"));

    if !report.needs_resolve.is_empty() {
        out.push_str(&format!("{}\n", paint("Files need resolving:", color)));
        for target in &report.needs_resolve {
            out.push_str(&format!("  {}\n", paint(target.as_str(), color)));
        }
    }
    out
}

fn severity_color(severity: Severity) -> Option<Color> {
    match severity {
        Severity::Error => Some(Color::Red),
        Severity::Warning => Some(Color::Yellow),
        Severity::Clean => None,
    }
}

fn paint(text: &str, color: Option<Color>) -> colored::ColoredString {
    match color {
        Some(color) => text.color(color),
        None => text.normal(),
    }
}
