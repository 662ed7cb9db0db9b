//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the workflow core and an
//! external system (assistant, filesystem, IDs).
//! Implementations live in `src/adapters/`.

pub mod assistant;
pub mod filesystem;
pub mod id_gen;

pub use assistant::{AdapterError, Assistant, AssistantFuture, AssistantOutput, InvocationRequest};
pub use filesystem::{FileMeta, FileSystem, FsError};
pub use id_gen::IdGenerator;
