//! `outer status` command.

use std::fmt::Write as _;

use crate::workflow::{ArtifactLocator, Phase, PhaseStatus, Slug, StatusReport, Workflow};

/// Execute the `status` command.
///
/// Displays a table of every phase with its status and artifact, followed
/// by stale warnings and the next runnable phase.
///
/// # Errors
///
/// Returns an error string if the artifacts cannot be inspected.
pub fn run(workflow: &Workflow<'_>, slug: &Slug, command_name: Option<&str>) -> Result<(), String> {
    let report = workflow.status(slug, command_name).map_err(|e| e.to_string())?;
    print!("{}", render(&report, workflow.locator()));
    Ok(())
}

/// Renders a status report as a plain-text table.
#[must_use]
pub fn render(report: &StatusReport, locator: &ArtifactLocator) -> String {
    let rows: Vec<(String, String, String)> = report
        .phases
        .iter()
        .map(|state| {
            let detail = if state.phase == Phase::Run {
                if report.progress.total == 0 {
                    "no checkboxes yet".to_string()
                } else {
                    format!("{}/{} checked", report.progress.checked, report.progress.total)
                }
            } else if state.phase == Phase::PhaseBreakdown && !state.artifacts.is_empty() {
                let docs = state.artifacts.len().saturating_sub(1);
                let index = locator.display(&locator.phase_index(&report.slug));
                format!("{index} (+{docs} phase docs)")
            } else {
                state.artifacts.first().map_or_else(|| "-".to_string(), |p| locator.display(p))
            };
            (state.phase.label().to_string(), state.status.to_string(), detail)
        })
        .collect();

    // Calculate column widths.
    let phase_width = rows.iter().map(|r| r.0.len()).max().unwrap_or(5).max(5);
    let status_width = rows.iter().map(|r| r.1.len()).max().unwrap_or(6).max(6);

    let mut out = String::new();
    let _ = writeln!(out, "Task: {}\n", report.slug);
    let _ = writeln!(out, "{:<phase_width$}  {:<status_width$}  ARTIFACT", "PHASE", "STATUS");
    let _ = writeln!(out, "{:-<phase_width$}  {:-<status_width$}  {:-<8}", "", "", "");
    for (phase, status, detail) in &rows {
        let _ = writeln!(out, "{phase:<phase_width$}  {status:<status_width$}  {detail}");
    }

    for state in report.stale() {
        let upstream: Vec<&str> = state.newer_predecessors.iter().map(|p| p.label()).collect();
        let _ = writeln!(
            out,
            "\nwarning: {} is stale; {} changed after it was generated. Re-run `outer {}` to refresh it.",
            state.phase,
            upstream.join(", "),
            state.phase.command(),
        );
    }

    let _ = writeln!(out, "\nState: {}", report.state());
    match report.next_phase() {
        Some(next) => {
            let _ = writeln!(out, "Next: outer {}", next.command());
        }
        None if report.status(Phase::Run) == PhaseStatus::Complete => {
            let _ = writeln!(out, "All phases complete.");
        }
        None => {}
    }
    out
}
