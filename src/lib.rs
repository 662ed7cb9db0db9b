//! Core library entry for the `outer` CLI.
//!
//! `outer` drives an external coding assistant through a fixed sequence of
//! planning phases and keeps every phase's output as a Markdown document
//! under `docs/`. The documents are the only workflow state, so any phase
//! can be resumed, re-run or hand-edited between runs.

pub mod adapters;
pub mod cassette;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod ports;
pub mod store;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

use clap::Parser;

pub use error::{WorkflowError, WorkflowResult};

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = cli::Cli::try_parse_from(args).map_err(|err| err.to_string())?;
    commands::dispatch(&cli)
}
