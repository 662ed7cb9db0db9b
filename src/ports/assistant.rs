//! External assistant port.
//!
//! The assistant is an opaque, blocking capability: it takes an
//! instruction and an optional step bound and returns the text of its
//! final answer.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Boxed future type alias used by [`Assistant`] to keep the trait dyn-compatible.
pub type AssistantFuture<'a> =
    Pin<Box<dyn Future<Output = Result<AssistantOutput, AdapterError>> + Send + 'a>>;

/// One invocation of the external assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationRequest {
    /// Self-contained instruction text.
    pub instruction: String,
    /// Optional upper bound on assistant-internal steps.
    #[serde(default)]
    pub max_turns: Option<u32>,
}

impl InvocationRequest {
    /// Creates a request without a step bound.
    pub fn new(instruction: impl Into<String>) -> Self {
        Self { instruction: instruction.into(), max_turns: None }
    }

    /// Sets the step bound.
    #[must_use]
    pub fn with_max_turns(mut self, max_turns: Option<u32>) -> Self {
        self.max_turns = max_turns;
        self
    }
}

/// Terminal result of an assistant session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantOutput {
    /// Text of the final answer.
    pub text: String,
    /// Number of turns the assistant used.
    #[serde(default)]
    pub turns: u32,
    /// Reported cost in US dollars, when the backend reports one.
    #[serde(default)]
    pub cost_usd: Option<f64>,
    /// Backend session identifier, informational only.
    #[serde(default)]
    pub session_id: Option<String>,
}

impl AssistantOutput {
    /// Creates an output carrying only text.
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), turns: 1, cost_usd: None, session_id: None }
    }
}

/// Failures of the external assistant.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum AdapterError {
    /// The assistant process could not be started.
    #[error("failed to start assistant: {0}")]
    Spawn(String),
    /// The assistant process exited unsuccessfully without a result.
    #[error("assistant exited with {}: {stderr}", describe_exit(.code))]
    Exit {
        /// Exit code, `None` when killed by a signal.
        code: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },
    /// The assistant hit the caller-supplied step bound.
    #[error("assistant exceeded the step bound of {max_turns} turns")]
    StepBoundExceeded {
        /// The bound that was exceeded.
        max_turns: u32,
    },
    /// The assistant reported an error result.
    #[error("assistant reported an error: {0}")]
    Failed(String),
    /// The assistant's output stream could not be understood.
    #[error("unexpected assistant output: {0}")]
    Protocol(String),
    /// The hosted API rejected the request.
    #[error("assistant API error: {0}")]
    Api(String),
    /// The invocation was interrupted by the user.
    #[error("assistant invocation was cancelled")]
    Cancelled,
}

fn describe_exit(code: &Option<i32>) -> String {
    code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}"))
}

/// Runs instructions through an external coding assistant.
pub trait Assistant: Send + Sync {
    /// Invokes the assistant and waits for its final answer.
    ///
    /// Dropping the returned future cancels the invocation.
    ///
    /// # Errors
    ///
    /// Returns an [`AdapterError`] if the assistant fails, exceeds the step
    /// bound, or cannot be reached.
    fn invoke(&self, request: &InvocationRequest) -> AssistantFuture<'_>;
}
