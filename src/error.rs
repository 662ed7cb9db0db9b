//! Workflow error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::ports::assistant::AdapterError;
use crate::workflow::phase::Phase;

/// Result type for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Errors that end a requested transition or query.
///
/// None of these are retried inside the core. Stale artifacts are not an
/// error; they are reported by the tracker.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The description or override does not yield a usable slug.
    #[error("cannot derive a task slug from {input:?}: {reason}")]
    InvalidSlug {
        /// The text that was supplied.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A required predecessor of the requested phase has no artifact yet.
    #[error(
        "cannot run {phase} for '{slug}': {missing} is not complete (expected {})",
        path.display()
    )]
    PhaseNotReady {
        /// Task slug.
        slug: String,
        /// Phase that was requested.
        phase: Phase,
        /// The first predecessor that is missing.
        missing: Phase,
        /// Where the missing artifact was expected.
        path: PathBuf,
    },

    /// The external assistant failed; nothing was written.
    #[error("{phase} for '{slug}' failed: {source}")]
    Adapter {
        /// Task slug.
        slug: String,
        /// Phase that was running.
        phase: Phase,
        /// What went wrong in the assistant.
        #[source]
        source: AdapterError,
    },

    /// Another transition for the same slug has not finished.
    #[error(
        "another transition for '{slug}' is in progress ({holder}, lock file {}); retry once it \
         finishes, or delete the lock file if that process is gone",
        lock.display()
    )]
    ConcurrentTransition {
        /// Task slug.
        slug: String,
        /// The lock file that is held.
        lock: PathBuf,
        /// Who holds the lock, as recorded in the lock file.
        holder: String,
    },

    /// Architecture was requested without a task description.
    #[error("{phase} needs a task description")]
    MissingDescription {
        /// Phase that was requested.
        phase: Phase,
    },

    /// The assistant answered, but the answer cannot become an artifact.
    #[error("assistant output for {phase} is unusable: {reason}")]
    MalformedOutput {
        /// Phase that was running.
        phase: Phase,
        /// What is wrong with the output.
        reason: String,
    },

    /// Filesystem access failed.
    #[error("filesystem error on {}: {message}", path.display())]
    Io {
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying error message.
        message: String,
    },
}

impl WorkflowError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Io { path: path.into(), message: err.to_string() }
    }
}
