//! Assistant output handling for document phases.
//!
//! Document phases ask the assistant for Markdown only. The phase breakdown
//! produces several files from a single answer, so its answer is split on
//! marker lines of the form:
//!
//! ```text
//! <!-- outer:file PHASE_1 -->
//! # Phase 1: ...
//! <!-- outer:file PHASE_2 -->
//! # Phase 2: ...
//! <!-- outer:file PHASE_INDEX -->
//! # Phase index
//! - [ ] Phase 1: ...
//! ```

use crate::error::{WorkflowError, WorkflowResult};
use crate::workflow::phase::Phase;

const MARKER_OPEN: &str = "<!-- outer:file ";
const MARKER_CLOSE: &str = "-->";
const INDEX_NAME: &str = "PHASE_INDEX";
const PHASE_PREFIX: &str = "PHASE_";

/// Renders the marker line that opens the section for `name`.
#[must_use]
pub fn marker(name: &str) -> String {
    format!("{MARKER_OPEN}{name} {MARKER_CLOSE}")
}

/// Marker name for phase document `n`.
#[must_use]
pub fn phase_marker_name(n: u32) -> String {
    format!("{PHASE_PREFIX}{n}")
}

/// Marker name for the phase index.
#[must_use]
pub fn index_marker_name() -> &'static str {
    INDEX_NAME
}

/// Cleans one document answer into artifact text.
///
/// A single fence wrapping the whole answer is removed, trailing whitespace
/// is trimmed and the text ends with exactly one newline.
///
/// # Errors
///
/// Returns [`WorkflowError::MalformedOutput`] if nothing remains.
pub fn normalize_document(phase: Phase, text: &str) -> WorkflowResult<String> {
    let body = strip_code_fence(text).trim_end();
    if body.trim().is_empty() {
        return Err(WorkflowError::MalformedOutput {
            phase,
            reason: "assistant returned an empty document".into(),
        });
    }
    let mut doc = body.trim_start_matches(['\n', '\r']).to_string();
    doc.push('\n');
    Ok(doc)
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return text;
    };
    let Some((_, inner)) = rest.split_once('\n') else {
        return text;
    };
    match inner.trim_end().strip_suffix("```") {
        // An inner fence means the answer is a document that merely starts
        // and ends with code blocks.
        Some(body) if !body.contains("\n```") => body,
        _ => text,
    }
}

/// The phase breakdown split into its documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakdown {
    /// Phase documents in order; element `i` is phase `i + 1`.
    pub phases: Vec<String>,
    /// The index document.
    pub index: String,
}

/// Splits a phase breakdown answer on its marker lines.
///
/// Text before the first marker is ignored. Each section is normalized like
/// a single document.
///
/// # Errors
///
/// Returns [`WorkflowError::MalformedOutput`] if markers are missing,
/// unknown, duplicated or not numbered `1..=n`, or if a section is empty.
pub fn split_breakdown(text: &str) -> WorkflowResult<Breakdown> {
    let malformed = |reason: String| WorkflowError::MalformedOutput {
        phase: Phase::PhaseBreakdown,
        reason,
    };

    let mut sections: Vec<(String, Vec<&str>)> = Vec::new();
    for line in strip_code_fence(text).lines() {
        if let Some(name) = parse_marker(line) {
            sections.push((name.to_string(), Vec::new()));
        } else if let Some((_, body)) = sections.last_mut() {
            body.push(line);
        }
    }
    if sections.is_empty() {
        return Err(malformed(format!(
            "no file markers found; expected lines like `{}`",
            marker(&phase_marker_name(1))
        )));
    }

    let section_count = sections.len();
    let mut phases: Vec<Option<String>> = Vec::new();
    let mut index = None;
    for (name, body) in sections {
        let doc = normalize_document(Phase::PhaseBreakdown, &body.join("\n"))
            .map_err(|_| malformed(format!("section {name} is empty")))?;
        if name == INDEX_NAME {
            if index.replace(doc).is_some() {
                return Err(malformed("duplicate PHASE_INDEX section".into()));
            }
            continue;
        }
        let n = name
            .strip_prefix(PHASE_PREFIX)
            .and_then(|digits| digits.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .ok_or_else(|| malformed(format!("unknown file marker {name}")))?;
        // Dense numbering means no phase can exceed the number of sections.
        if n > section_count {
            return Err(malformed(format!(
                "section {name} is out of range for {section_count} sections"
            )));
        }
        if phases.len() < n {
            phases.resize(n, None);
        }
        if phases[n - 1].replace(doc).is_some() {
            return Err(malformed(format!("duplicate section {name}")));
        }
    }

    let index = index.ok_or_else(|| malformed("missing PHASE_INDEX section".into()))?;
    if phases.is_empty() {
        return Err(malformed("no PHASE_<N> sections".into()));
    }
    let phases = phases
        .into_iter()
        .enumerate()
        .map(|(i, doc)| doc.ok_or_else(|| malformed(format!("missing section PHASE_{}", i + 1))))
        .collect::<WorkflowResult<Vec<_>>>()?;

    Ok(Breakdown { phases, index })
}

fn parse_marker(line: &str) -> Option<&str> {
    let name = line.trim().strip_prefix(MARKER_OPEN)?.strip_suffix(MARKER_CLOSE)?.trim();
    (!name.is_empty() && !name.contains(char::is_whitespace)).then_some(name)
}

/// Checkbox counts across one or more documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    /// Checked boxes.
    pub checked: usize,
    /// All boxes.
    pub total: usize,
}

impl Progress {
    /// True when there is at least one box and every box is checked.
    #[must_use]
    pub fn is_done(self) -> bool {
        self.total > 0 && self.checked == self.total
    }
}

impl std::ops::Add for Progress {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self { checked: self.checked + rhs.checked, total: self.total + rhs.total }
    }
}

/// Counts Markdown task-list items (`- [ ]`, `- [x]`, `* [X]`, ...).
#[must_use]
pub fn count_checkboxes(text: &str) -> Progress {
    let mut progress = Progress::default();
    for line in text.lines() {
        let item = line.trim_start();
        let Some(rest) = item
            .strip_prefix("- ")
            .or_else(|| item.strip_prefix("* "))
            .or_else(|| item.strip_prefix("+ "))
        else {
            continue;
        };
        match rest.get(..3) {
            Some("[ ]") => progress.total += 1,
            Some("[x]" | "[X]") => {
                progress.total += 1;
                progress.checked += 1;
            }
            _ => {}
        }
    }
    progress
}
