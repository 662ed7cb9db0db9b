//! Instruction text sent to the assistant for each document phase.
//!
//! Instructions reference predecessor artifacts by path and never inline
//! their content; the assistant runs in the project root and reads them
//! itself. The reply becomes the artifact, so every instruction asks for
//! the document text only.

use std::fmt::Write as _;

use crate::workflow::breakdown::{index_marker_name, marker, phase_marker_name};
use crate::workflow::locator::ArtifactLocator;
use crate::workflow::slug::Slug;

const REPLY_RULES: &str = "\
Reply with the complete document as Markdown and nothing else: no preamble, \
no closing remarks, no surrounding code fence. Do not create or edit the \
document yourself; your reply is saved verbatim to the path above.";

/// Instruction for the architecture document.
#[must_use]
pub fn architecture(locator: &ArtifactLocator, slug: &Slug, description: &str) -> String {
    let target = locator.display(&locator.architecture(slug));
    format!(
        "Design the architecture for this task (slug `{slug}`):\n\n\
         {description}\n\n\
         Explore the repository as needed. The document will be saved as `{target}` and must cover:\n\
         - overview and motivation\n\
         - goals and explicit non-goals\n\
         - components, their responsibilities and how they interact\n\
         - data flow\n\
         - key technical decisions with their trade-offs\n\
         - public interfaces and contracts\n\
         - error handling\n\
         - testing approach\n\
         - external dependencies\n\
         - open questions\n\n\
         {REPLY_RULES}\n",
        description = description.trim(),
    )
}

/// Instruction for the implementation roadmap.
#[must_use]
pub fn roadmap(locator: &ArtifactLocator, slug: &Slug) -> String {
    let architecture = locator.display(&locator.architecture(slug));
    let target = locator.display(&locator.roadmap(slug));
    format!(
        "Read the architecture document at `{architecture}` and write the implementation \
         roadmap for task `{slug}`. It will be saved as `{target}`.\n\n\
         Split the work into ordered implementation phases. Each phase must be verifiable on \
         its own and small enough for one focused session. For every phase give its \
         dependencies on earlier phases and its deliverables. Also list technical risks with \
         mitigations, integration points between phases, and work that can run in parallel.\n\n\
         {REPLY_RULES}\n"
    )
}

/// Instruction for the phase breakdown, which yields several documents.
#[must_use]
pub fn phase_breakdown(locator: &ArtifactLocator, slug: &Slug) -> String {
    let roadmap = locator.display(&locator.roadmap(slug));
    let architecture = locator.display(&locator.architecture(slug));
    let first = locator.display(&locator.phase_doc(slug, 1));
    let second = locator.display(&locator.phase_doc(slug, 2));
    let index = locator.display(&locator.phase_index(slug));

    let mut text = format!(
        "Read the roadmap at `{roadmap}` (and the architecture at `{architecture}` where \
         needed) and write one detailed planning document per roadmap phase for task `{slug}`.\n\n\
         Each phase document contains: an overview, prerequisites, acceptance criteria as \
         `- [ ]` checkboxes, a granular task list as `- [ ]` checkboxes, implementation notes \
         (files to touch, patterns to follow, pitfalls, test requirements), verification \
         steps and handoff notes for the next phase.\n\n\
         Then write an index document listing every phase as a `- [ ]` checkbox line with \
         its title and file path.\n\n\
         The documents are saved as `{first}`, `{second}`, ... and `{index}`. Return all \
         of them in a single reply, each introduced by a marker line on its own:\n\n"
    );
    let _ = writeln!(text, "{}", marker(&phase_marker_name(1)));
    text.push_str("...phase 1 document...\n");
    let _ = writeln!(text, "{}", marker(&phase_marker_name(2)));
    text.push_str("...phase 2 document...\n");
    let _ = writeln!(text, "{}", marker(index_marker_name()));
    text.push_str("...index document...\n\n");
    text.push_str(
        "Number phases from 1 without gaps. Put nothing outside the marked sections. \
         Do not create or edit the files yourself; they are written from your reply.\n",
    );
    text
}
