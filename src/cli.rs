//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI parser for `outer`.
#[derive(Debug, Parser)]
#[command(
    name = "outer",
    version,
    about = "Drive a coding assistant through a resumable planning workflow"
)]
pub struct Cli {
    /// Project root holding `docs/` and `.claude/`.
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Task slug; defaults to the most recently planned task.
    #[arg(long, global = true)]
    pub slug: Option<String>,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands, one per workflow phase plus `status`.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Design the architecture for a new task.
    Plan {
        /// Free-text task description.
        #[arg(required = true, num_args = 1..)]
        description: Vec<String>,
    },
    /// Write the implementation roadmap from the architecture.
    Roadmap,
    /// Break the roadmap into numbered phase documents.
    Phases,
    /// Generate the resume prompt.
    Prompt {
        /// Print the prompt instead of writing it.
        #[arg(long)]
        print: bool,
    },
    /// Install the resume prompt as a slash command.
    Install {
        /// Command name (default `resume-<slug>`).
        #[arg(long)]
        name: Option<String>,
    },
    /// Run the assistant with the resume prompt.
    Run {
        /// Upper bound on assistant turns.
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        max_turns: Option<u32>,
    },
    /// Show the status of every phase.
    Status {
        /// Installed command name to check (default `resume-<slug>`).
        #[arg(long)]
        name: Option<String>,
    },
}
