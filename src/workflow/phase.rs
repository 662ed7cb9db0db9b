//! The fixed phase sequence and its transition guards.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One stage of the planning workflow, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Architecture design document.
    Architecture,
    /// Implementation roadmap.
    Roadmap,
    /// Numbered phase documents plus their index.
    PhaseBreakdown,
    /// Session-independent resume prompt.
    ResumePrompt,
    /// Slash command installed from the resume prompt.
    Install,
    /// Execution driven by the resume prompt.
    Run,
}

impl Phase {
    /// Every phase, in order.
    pub const ALL: [Self; 6] = [
        Self::Architecture,
        Self::Roadmap,
        Self::PhaseBreakdown,
        Self::ResumePrompt,
        Self::Install,
        Self::Run,
    ];

    /// Phases whose artifacts must exist before this phase may run.
    #[must_use]
    pub fn predecessors(self) -> &'static [Self] {
        match self {
            Self::Architecture => &[],
            Self::Roadmap => &[Self::Architecture],
            Self::PhaseBreakdown => &[Self::Roadmap],
            Self::ResumePrompt => &[Self::Roadmap, Self::PhaseBreakdown],
            Self::Install | Self::Run => &[Self::ResumePrompt],
        }
    }

    /// Whether running this phase calls the external assistant.
    #[must_use]
    pub fn invokes_assistant(self) -> bool {
        matches!(self, Self::Architecture | Self::Roadmap | Self::PhaseBreakdown | Self::Run)
    }

    /// Whether this phase leaves an artifact on disk.
    #[must_use]
    pub fn writes_artifact(self) -> bool {
        self != Self::Run
    }

    /// 1-based position in the sequence.
    #[must_use]
    pub fn number(self) -> usize {
        self as usize + 1
    }

    /// Human-readable name.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Architecture => "Architecture",
            Self::Roadmap => "Roadmap",
            Self::PhaseBreakdown => "PhaseBreakdown",
            Self::ResumePrompt => "ResumePrompt",
            Self::Install => "Install",
            Self::Run => "Run",
        }
    }

    /// The `outer` subcommand that runs this phase.
    #[must_use]
    pub fn command(self) -> &'static str {
        match self {
            Self::Architecture => "plan",
            Self::Roadmap => "roadmap",
            Self::PhaseBreakdown => "phases",
            Self::ResumePrompt => "prompt",
            Self::Install => "install",
            Self::Run => "run",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a task stands, inferred from its artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    /// No artifact exists for the slug.
    Uninitialized,
    /// The furthest phase with an artifact (or, for `Run`, finished work).
    Reached(Phase),
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("Uninitialized"),
            Self::Reached(phase) => write!(f, "{phase}"),
        }
    }
}
