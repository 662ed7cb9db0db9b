//! Canonical artifact paths.
//!
//! Every path is a pure function of the project root, the slug and, for
//! phase documents, the phase number. The same functions are used to write
//! artifacts and to look for them, so the layout is stable across restarts:
//!
//! ```text
//! <root>/
//!   ├── docs/
//!   │   ├── {slug}_ARCHITECTURE.md
//!   │   ├── {slug}_ROADMAP.md
//!   │   ├── {slug}_RESUME_PROMPT.md
//!   │   └── phases/
//!   │       ├── {slug}_PHASE_{N}.md
//!   │       └── {slug}_PHASE_INDEX.md
//!   └── .claude/commands/resume-{slug}.md
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::WorkflowResult;
use crate::workflow::phase::Phase;
use crate::workflow::slug::Slug;

/// Documents root, relative to the project root.
pub const DOCS_DIR: &str = "docs";
/// Phase documents folder, relative to the documents root.
pub const PHASES_DIR: &str = "phases";
/// Installed command folder, relative to the project root.
pub const COMMANDS_DIR: &str = ".claude/commands";

const ARCHITECTURE_SUFFIX: &str = "_ARCHITECTURE.md";
const ROADMAP_SUFFIX: &str = "_ROADMAP.md";
const RESUME_PROMPT_SUFFIX: &str = "_RESUME_PROMPT.md";
const PHASE_INDEX_SUFFIX: &str = "_PHASE_INDEX.md";
const PHASE_DOC_MARKER: &str = "_PHASE_";

/// Name of the installed slash command, without the `.md` extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandName(String);

impl CommandName {
    /// The default name, `resume-{slug}`.
    #[must_use]
    pub fn default_for(slug: &Slug) -> Self {
        Self(format!("resume-{slug}"))
    }

    /// Accepts a user-supplied name, sanitized like a slug override.
    ///
    /// A leading `/` and a trailing `.md` are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::WorkflowError::InvalidSlug`] if nothing usable remains.
    pub fn from_override(raw: &str) -> WorkflowResult<Self> {
        let trimmed = raw.trim().trim_start_matches('/');
        let trimmed = trimmed.strip_suffix(".md").unwrap_or(trimmed);
        Slug::from_override(trimmed).map(|slug| Self(slug.to_string()))
    }

    /// Uses the override when given, otherwise the default for `slug`.
    ///
    /// # Errors
    ///
    /// Returns an error if the override is unusable.
    pub fn resolve(slug: &Slug, raw: Option<&str>) -> WorkflowResult<Self> {
        raw.map_or_else(|| Ok(Self::default_for(slug)), Self::from_override)
    }

    /// The command name text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which canonical document a file name denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// `{slug}_ARCHITECTURE.md`
    Architecture,
    /// `{slug}_ROADMAP.md`
    Roadmap,
    /// `{slug}_PHASE_INDEX.md`
    PhaseIndex,
    /// `{slug}_RESUME_PROMPT.md`
    ResumePrompt,
}

/// Maps slugs and phases to canonical paths under a project root.
#[derive(Debug, Clone)]
pub struct ArtifactLocator {
    root: PathBuf,
}

impl ArtifactLocator {
    /// Creates a locator for the project at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The project root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/docs`
    #[must_use]
    pub fn docs_dir(&self) -> PathBuf {
        self.root.join(DOCS_DIR)
    }

    /// `<root>/docs/phases`
    #[must_use]
    pub fn phases_dir(&self) -> PathBuf {
        self.docs_dir().join(PHASES_DIR)
    }

    /// `<root>/.claude/commands`
    #[must_use]
    pub fn commands_dir(&self) -> PathBuf {
        self.root.join(COMMANDS_DIR)
    }

    /// `docs/{slug}_ARCHITECTURE.md`
    #[must_use]
    pub fn architecture(&self, slug: &Slug) -> PathBuf {
        self.docs_dir().join(format!("{slug}{ARCHITECTURE_SUFFIX}"))
    }

    /// `docs/{slug}_ROADMAP.md`
    #[must_use]
    pub fn roadmap(&self, slug: &Slug) -> PathBuf {
        self.docs_dir().join(format!("{slug}{ROADMAP_SUFFIX}"))
    }

    /// `docs/phases/{slug}_PHASE_{n}.md`, `n` starting at 1.
    #[must_use]
    pub fn phase_doc(&self, slug: &Slug, n: u32) -> PathBuf {
        self.phases_dir().join(format!("{slug}{PHASE_DOC_MARKER}{n}.md"))
    }

    /// `docs/phases/{slug}_PHASE_INDEX.md`
    #[must_use]
    pub fn phase_index(&self, slug: &Slug) -> PathBuf {
        self.phases_dir().join(format!("{slug}{PHASE_INDEX_SUFFIX}"))
    }

    /// `docs/{slug}_RESUME_PROMPT.md`
    #[must_use]
    pub fn resume_prompt(&self, slug: &Slug) -> PathBuf {
        self.docs_dir().join(format!("{slug}{RESUME_PROMPT_SUFFIX}"))
    }

    /// `.claude/commands/{name}.md`
    #[must_use]
    pub fn command(&self, name: &CommandName) -> PathBuf {
        self.commands_dir().join(format!("{name}.md"))
    }

    /// `docs/.{slug}.lock`, held while a transition for the slug runs.
    #[must_use]
    pub fn lock(&self, slug: &Slug) -> PathBuf {
        self.docs_dir().join(format!(".{slug}.lock"))
    }

    /// The file whose presence marks `phase` as done.
    ///
    /// For the phase breakdown this is the index, which is written last.
    /// `Run` has no artifact.
    #[must_use]
    pub fn primary(&self, slug: &Slug, phase: Phase, command: &CommandName) -> Option<PathBuf> {
        match phase {
            Phase::Architecture => Some(self.architecture(slug)),
            Phase::Roadmap => Some(self.roadmap(slug)),
            Phase::PhaseBreakdown => Some(self.phase_index(slug)),
            Phase::ResumePrompt => Some(self.resume_prompt(slug)),
            Phase::Install => Some(self.command(command)),
            Phase::Run => None,
        }
    }

    /// `path` relative to the project root, for display and for
    /// instructions (the assistant runs with the root as its working
    /// directory).
    #[must_use]
    pub fn relative<'p>(&self, path: &'p Path) -> &'p Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }

    /// Display form of [`ArtifactLocator::relative`], always with `/`.
    #[must_use]
    pub fn display(&self, path: &Path) -> String {
        self.relative(path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Extracts `N` from `{slug}_PHASE_{N}.md`.
///
/// Returns `None` for any other name, including the index, temp files and
/// zero.
#[must_use]
pub fn parse_phase_doc_name(slug: &Slug, file_name: &str) -> Option<u32> {
    let rest = file_name.strip_prefix(slug.as_str())?.strip_prefix(PHASE_DOC_MARKER)?;
    let digits = rest.strip_suffix(".md")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|n| *n > 0)
}

/// Recognizes a canonical document name and the slug it belongs to.
#[must_use]
pub fn parse_document_name(file_name: &str) -> Option<(Slug, DocumentKind)> {
    let kinds = [
        (ARCHITECTURE_SUFFIX, DocumentKind::Architecture),
        (ROADMAP_SUFFIX, DocumentKind::Roadmap),
        (PHASE_INDEX_SUFFIX, DocumentKind::PhaseIndex),
        (RESUME_PROMPT_SUFFIX, DocumentKind::ResumePrompt),
    ];
    kinds.into_iter().find_map(|(suffix, kind)| {
        let stem = file_name.strip_suffix(suffix)?;
        Slug::from_trusted(stem).map(|slug| (slug, kind))
    })
}
