//! Live adapters for real external interactions.

pub mod anthropic;
pub mod claude_cli;
pub mod filesystem;
pub mod id_gen;
