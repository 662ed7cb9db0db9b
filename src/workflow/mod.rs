//! The planning workflow core.
//!
//! All workflow state lives in the artifact files; the types here only
//! compute paths, inspect files and run explicitly requested transitions.

pub mod breakdown;
pub mod instructions;
pub mod lock;
pub mod locator;
pub mod machine;
pub mod phase;
pub mod resume;
pub mod slug;
pub mod tracker;

pub use locator::{ArtifactLocator, CommandName};
pub use machine::{AdvanceOptions, TransitionOutcome, Workflow};
pub use phase::{Phase, WorkflowState};
pub use slug::Slug;
pub use tracker::{PhaseStatus, PhaseTracker, StatusReport};
