//! Operator-facing rendering of run reports.

use colored::Colorize;
use oasync_sync::{PlatformStatus, ResourceOutcome, ResourceState, SyncReport};

pub fn print_report(report: &SyncReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("{} {}", "Ran".green().bold(), report.operation.bold());
    for outcome in &report.outcomes {
        println!("{}", outcome_line(outcome));
    }

    let summary = report
        .summary()
        .into_iter()
        .map(|(state, count)| format!("{count} {state}"))
        .collect::<Vec<_>>()
        .join(", ");
    if summary.is_empty() {
        println!("  {} nothing to do", "→".yellow());
    } else if report.has_failures() {
        println!("  {} {}", "✗".red().bold(), summary);
    } else {
        println!("  {} {}", "✓".green().bold(), summary);
    }
    Ok(())
}

fn outcome_line(outcome: &ResourceOutcome) -> String {
    let state = match outcome.state {
        ResourceState::Failed => outcome.state.to_string().red().bold(),
        ResourceState::Skipped => outcome.state.to_string().yellow(),
        _ => outcome.state.to_string().green(),
    };
    let mut line = format!(
        "  {} {} {} {}",
        "→".cyan(),
        outcome.kind,
        outcome.name.bold(),
        state
    );
    if let Some(detail) = &outcome.detail {
        line.push_str(&format!(" ({detail})"));
    }
    line
}

pub fn print_status(platform: &str, status: &PlatformStatus, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(status)?);
    } else if status.connected {
        println!("{} {} {}", "ok".green().bold(), platform.bold(), status.message);
    } else {
        println!(
            "{} {} {}",
            "unreachable".red().bold(),
            platform.bold(),
            status.message
        );
    }
    Ok(())
}
