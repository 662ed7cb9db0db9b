//! `outer roadmap`, `phases`, `prompt`, `install` and `run`.

use super::block_on_transition;
use crate::workflow::{AdvanceOptions, Phase, Slug, TransitionOutcome, Workflow};

/// Execute one phase transition for `slug` and report what it did.
///
/// # Errors
///
/// Returns an error string if the transition fails.
pub fn run(
    workflow: &Workflow<'_>,
    slug: &Slug,
    phase: Phase,
    options: &AdvanceOptions,
) -> Result<(), String> {
    let outcome = block_on_transition(slug, phase, workflow.advance(slug, phase, options))
        .map_err(|e| e.to_string())?;

    print_outcome(workflow, &outcome);
    print_next_step(workflow, slug, options.command_name.as_deref())
}

/// Execute `outer prompt --print`: show the resume prompt without writing it.
///
/// # Errors
///
/// Returns an error string if the artifacts cannot be inspected.
pub fn print_prompt(workflow: &Workflow<'_>, slug: &Slug) -> Result<(), String> {
    let handle = workflow.resume_handle(slug).map_err(|e| e.to_string())?;
    print!("{handle}");
    Ok(())
}

fn print_outcome(workflow: &Workflow<'_>, outcome: &TransitionOutcome) {
    let locator = workflow.locator();
    for path in &outcome.written {
        println!("Wrote {}", locator.display(path));
    }
    for path in &outcome.removed {
        println!("Removed {}", locator.display(path));
    }

    if outcome.phase == Phase::Run {
        if let Some(output) = &outcome.assistant {
            if !output.text.trim().is_empty() {
                println!("{}", output.text.trim_end());
            }
            match output.cost_usd {
                Some(cost) => println!("Assistant finished after {} turn(s), ${cost:.2}", output.turns),
                None => println!("Assistant finished after {} turn(s)", output.turns),
            }
        }
    }
}

fn print_next_step(
    workflow: &Workflow<'_>,
    slug: &Slug,
    command_name: Option<&str>,
) -> Result<(), String> {
    let report = workflow.status(slug, command_name).map_err(|e| e.to_string())?;
    match report.next_phase() {
        Some(next) => println!("Next: outer {}", next.command()),
        None => println!("All phases complete for {slug}."),
    }
    Ok(())
}
