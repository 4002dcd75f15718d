//! Pure formatting functions for UI output.
//!
//! The `format_*` functions build plain lines; the `display_*` functions style
//! and print them.

use crate::boundary::BoundaryWarning;
use crate::graph::{PackageGraph, ReleasePlan};
use crate::release::{ReleaseOutcome, ReleaseRun};
use console::style;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

pub fn display_boundary_warning(warning: &BoundaryWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), warning);
}

/// One line per unit in release order, then the range-only packages
pub fn format_plan(graph: &PackageGraph, plan: &ReleasePlan) -> Vec<String> {
    let mut lines: Vec<String> = plan
        .order
        .iter()
        .enumerate()
        .map(|(i, unit)| {
            format!(
                "{}. {} {}",
                i + 1,
                graph.unit_name(*unit),
                graph.unit_version(*unit)
            )
        })
        .collect();
    for id in &plan.range_only {
        lines.push(format!("   ranges only: {}", graph.package(*id).name));
    }
    lines
}

pub fn display_plan(graph: &PackageGraph, plan: &ReleasePlan) {
    println!("\n{}", style("Release plan:").bold());
    for line in format_plan(graph, plan) {
        println!("  {}", line);
    }
}

pub fn format_outcome(outcome: &ReleaseOutcome) -> String {
    match outcome {
        ReleaseOutcome::Complete => "Release complete".to_string(),
        ReleaseOutcome::Failed { state, reason } => {
            format!("Release failed at {}: {}", state, reason)
        }
    }
}

/// Print the outcome followed by what the run changed
pub fn display_run(run: &ReleaseRun) {
    for warning in &run.report.warnings {
        display_boundary_warning(warning);
    }

    let report = &run.report;
    for tag in &report.tags_pushed {
        println!("  tag     {}", style(tag).cyan());
    }
    for branch in &report.branches_created {
        println!("  branch  {}", branch);
    }
    for change in &report.bumps {
        println!(
            "  bump    {} {} -> {}",
            run.graph.unit_name(change.unit),
            style(&change.from).red(),
            style(&change.to).green()
        );
    }

    match &run.outcome {
        ReleaseOutcome::Complete => display_success(&format_outcome(&run.outcome)),
        ReleaseOutcome::Failed { .. } => {
            display_error(&format_outcome(&run.outcome));
            if let Some(commit) = &report.last_commit {
                display_status(&format!("Repository left at commit {}", commit));
            }
        }
    }
}
