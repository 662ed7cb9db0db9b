//! Resume handle: a self-contained prompt that continues a task from
//! whatever state its documents are in.
//!
//! The text is a pure function of the slug and the set of artifacts on
//! disk. It carries no timestamps and no session identifiers.

use std::fmt::Write as _;
use std::path::Path;

use crate::error::WorkflowResult;
use crate::ports::filesystem::FileSystem;
use crate::workflow::locator::ArtifactLocator;
use crate::workflow::phase::Phase;
use crate::workflow::slug::Slug;
use crate::workflow::tracker::PhaseTracker;

/// Builds the resume handle for `slug` from the artifacts currently on disk.
///
/// # Errors
///
/// Returns [`WorkflowError::Io`](crate::error::WorkflowError::Io) if the documents cannot be inspected.
pub fn build_resume_handle(
    fs: &dyn FileSystem,
    locator: &ArtifactLocator,
    slug: &Slug,
) -> WorkflowResult<String> {
    let tracker = PhaseTracker::new(fs, locator);
    let phase_docs = tracker.phase_docs(slug)?;
    let entry = |path: &Path| -> WorkflowResult<String> {
        let present = tracker.non_empty(path)?.is_some();
        let suffix = if present { "" } else { " (not written yet)" };
        Ok(format!("`{}`{suffix}", locator.display(path)))
    };

    let index = locator.display(&locator.phase_index(slug));
    let pattern = locator.display(&locator.phase_doc(slug, 1)).replace("_PHASE_1.md", "_PHASE_<N>.md");

    let mut text = String::new();
    let _ = writeln!(text, "# Resume work on `{slug}`\n");
    text.push_str(
        "This prompt is self-contained. It does not rely on any earlier conversation, so it \
         can be run in a fresh session after any interruption. All progress is recorded in \
         the files below; read them to find out where work stands.\n\n",
    );

    text.push_str("## Planning documents\n\n");
    let _ = writeln!(text, "- Architecture: {}", entry(&locator.architecture(slug))?);
    let _ = writeln!(text, "- Roadmap: {}", entry(&locator.roadmap(slug))?);
    let _ = writeln!(text, "- Phase index: {}", entry(&locator.phase_index(slug))?);
    if phase_docs.is_empty() {
        let _ = writeln!(text, "- Phase documents: `{pattern}` (none written yet)");
    } else {
        text.push_str("- Phase documents:\n");
        for (_, path) in &phase_docs {
            let _ = writeln!(text, "  - {}", entry(path)?);
        }
    }

    text.push_str("\n## How to continue\n\n");
    let _ = writeln!(
        text,
        "1. Read `{index}`. If it does not exist, list the files matching `{pattern}` \
         instead. If there are no phase documents either, stop and report that planning is \
         incomplete (run `outer {}`).",
        Phase::PhaseBreakdown.command(),
    );
    text.push_str(
        "2. The current phase is the first one whose checkbox in the index is unchecked, or \
         the first phase document that still has unchecked boxes.\n\
         3. Open that phase document and take the first unchecked task. Check its \
         prerequisites and implementation notes before starting.\n\
         4. Implement the task and run the verification steps the phase document lists.\n\
         5. Check the task's box in the phase document as soon as it is verified. When every \
         acceptance criterion of a phase is checked, check that phase in the index too.\n\
         6. Continue with the next unchecked task, moving on to the next phase when one is \
         finished. Consult the roadmap and architecture documents when a decision is unclear.\n\
         7. If you are blocked, write the blocker into the handoff notes of the current phase \
         document and stop.\n\
         8. When every box in the index is checked, report that the work is complete.\n\n",
    );
    text.push_str(
        "Never rely on memory of earlier sessions: the checkboxes in these files are the only \
         record of progress, so keep them current.\n",
    );
    Ok(text)
}
