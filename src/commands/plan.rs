//! `outer plan` command.

use super::phase;
use crate::workflow::{AdvanceOptions, Phase, Slug, Workflow};

/// Execute the `plan` command.
///
/// Derives the slug from the description unless one is given explicitly,
/// then runs the architecture phase.
///
/// # Errors
///
/// Returns an error string if no slug can be derived or the transition fails.
pub fn run(
    workflow: &Workflow<'_>,
    explicit_slug: Option<&str>,
    description: &str,
) -> Result<(), String> {
    let slug = match explicit_slug {
        Some(raw) => Slug::from_override(raw),
        None => Slug::from_description(description),
    }
    .map_err(|e| e.to_string())?;
    println!("Task: {slug}");

    let options =
        AdvanceOptions { description: Some(description.to_string()), ..AdvanceOptions::default() };
    phase::run(workflow, &slug, Phase::Architecture, &options)
}
