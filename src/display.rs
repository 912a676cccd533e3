//! Colored terminal output for orchestrator events.
//!
//! Cycle summaries go to stdout next to the services' own output, so each
//! line carries a timestamp and a bracketed tag.

use std::io::{self, Write};

use chrono::Local;
use owo_colors::OwoColorize;

use crate::orchestrator::{CycleReport, RegenerateOutcome, ShutdownReason};
use crate::state::TIME_FORMAT;

fn timestamp() -> String {
    Local::now().format(TIME_FORMAT).to_string()
}

/// Describe the regeneration step of a cycle, `None` when skipped.
#[must_use]
pub fn describe_regenerate(outcome: &RegenerateOutcome) -> Option<String> {
    match outcome {
        RegenerateOutcome::Skipped => None,
        RegenerateOutcome::Disabled => Some("regeneration disabled".to_string()),
        RegenerateOutcome::Succeeded => Some("regenerated".to_string()),
        RegenerateOutcome::Failed(reason) => Some(format!("regeneration failed: {reason}")),
    }
}

/// One-line plain summary of a cycle.
#[must_use]
pub fn summarize_cycle(report: &CycleReport) -> String {
    let mut parts = vec![format!(
        "cycle {} ({}): stopped {}, started {}",
        report.id,
        report.trigger,
        report.stopped,
        report.start.started.len()
    )];
    if let Some(regen) = describe_regenerate(&report.regenerate) {
        parts.push(regen);
    }
    if !report.start.failed.is_empty() {
        let names: Vec<&str> = report.start.failed.iter().map(|(n, _)| n.as_str()).collect();
        parts.push(format!("failed to start: {}", names.join(", ")));
    }
    let elapsed = report.finished.duration_since(report.began);
    parts.push(format!("{}ms", elapsed.as_millis()));
    parts.join(", ")
}

/// Print the startup banner.
pub fn print_banner(services: &[String], status_addr: &str) {
    println!(
        "{} {} services={} status=http://{}",
        timestamp().dimmed(),
        "[DEV]".blue().bold(),
        services.join(",").cyan(),
        status_addr
    );
    let _ = io::stdout().flush();
}

/// Print a completed cycle.
pub fn print_cycle(report: &CycleReport) {
    let failed = !report.start.all_started()
        || matches!(report.regenerate, RegenerateOutcome::Failed(_));
    let tag = if failed {
        "[CYCLE]".yellow().bold().to_string()
    } else {
        "[CYCLE]".green().bold().to_string()
    };
    println!("{} {} {}", timestamp().dimmed(), tag, summarize_cycle(report));
    for (name, reason) in &report.start.failed {
        println!("  {} {}: {}", "✗".red(), name.bold(), reason.dimmed());
    }
    let _ = io::stdout().flush();
}

/// Print the shutdown notice.
pub fn print_shutdown(reason: ShutdownReason) {
    println!(
        "{} {} shutting down ({})",
        timestamp().dimmed(),
        "[DEV]".magenta().bold(),
        reason
    );
    let _ = io::stdout().flush();
}
