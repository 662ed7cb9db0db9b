//! Command dispatch and handlers.

pub mod phase;
pub mod plan;
pub mod status;

use std::env;
use std::future::Future;
use std::path::Path;

use crate::adapters::live::filesystem::LiveFileSystem;
use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::context::ServiceContext;
use crate::error::{WorkflowError, WorkflowResult};
use crate::ports::assistant::AdapterError;
use crate::workflow::tracker::{discover_tasks, latest_task};
use crate::workflow::{AdvanceOptions, Phase, Slug, Workflow};

/// Dispatch a parsed command to its handler.
///
/// When `OUTER_REPLAY` is set to a cassette file, assistant invocations are
/// served from it. Otherwise, when `OUTER_RECORD` is set to a file path,
/// every assistant invocation is recorded there.
///
/// # Errors
///
/// Returns an error string if configuration is invalid or the selected
/// command handler fails.
pub fn dispatch(cli: &Cli) -> Result<(), String> {
    let config = Config::load(&LiveFileSystem, &cli.root)?.apply_env(|key| env::var(key).ok())?;

    let ctx = if let Ok(path) = env::var("OUTER_REPLAY") {
        ServiceContext::replaying(Path::new(&path))?
    } else if let Ok(path) = env::var("OUTER_RECORD") {
        ServiceContext::recording(&config, &cli.root, Path::new(&path))
    } else {
        ServiceContext::live(&config, &cli.root)
    };

    dispatch_with_context(cli, &ctx, &config)
}

/// Dispatch a command with the given service context.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch_with_context(
    cli: &Cli,
    ctx: &ServiceContext,
    config: &Config,
) -> Result<(), String> {
    let workflow = Workflow::new(ctx, &cli.root);
    let slug = cli.slug.as_deref();

    let advance = |phase: Phase, options: AdvanceOptions| {
        phase::run(&workflow, &resolve_slug(&workflow, slug)?, phase, &options)
    };

    match &cli.command {
        Command::Plan { description } => plan::run(&workflow, slug, &description.join(" ")),
        Command::Roadmap => advance(Phase::Roadmap, AdvanceOptions::default()),
        Command::Phases => advance(Phase::PhaseBreakdown, AdvanceOptions::default()),
        Command::Prompt { print: true } => {
            phase::print_prompt(&workflow, &resolve_slug(&workflow, slug)?)
        }
        Command::Prompt { print: false } => advance(Phase::ResumePrompt, AdvanceOptions::default()),
        Command::Install { name } => advance(
            Phase::Install,
            AdvanceOptions { command_name: name.clone(), ..AdvanceOptions::default() },
        ),
        Command::Run { max_turns } => advance(
            Phase::Run,
            AdvanceOptions { max_turns: max_turns.or(config.max_turns), ..AdvanceOptions::default() },
        ),
        Command::Status { name } => {
            status::run(&workflow, &resolve_slug(&workflow, slug)?, name.as_deref())
        }
    }
}

/// Uses the explicit slug, or the most recently planned task on disk.
fn resolve_slug(workflow: &Workflow<'_>, explicit: Option<&str>) -> Result<Slug, String> {
    if let Some(raw) = explicit {
        return Slug::from_override(raw).map_err(|e| e.to_string());
    }
    let locator = workflow.locator();
    let tasks = discover_tasks(workflow.fs(), locator).map_err(|e| e.to_string())?;
    latest_task(&tasks).map(|task| task.slug.clone()).ok_or_else(|| {
        format!(
            "No planned task found under {}. Run `outer plan <description>` first or pass --slug.",
            locator.docs_dir().display()
        )
    })
}

/// Runs a transition to completion on a single-threaded runtime.
///
/// Ctrl-C drops the transition and reports it as a cancelled assistant
/// invocation.
fn block_on_transition<F, T>(slug: &Slug, phase: Phase, future: F) -> WorkflowResult<T>
where
    F: Future<Output = WorkflowResult<T>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| WorkflowError::io(".", format!("failed to start async runtime: {e}")))?;

    runtime.block_on(async {
        tokio::select! {
            result = future => result,
            _ = tokio::signal::ctrl_c() => Err(WorkflowError::Adapter {
                slug: slug.to_string(),
                phase,
                source: AdapterError::Cancelled,
            }),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemFs, ScriptedAssistant, SeqIdGen};
    use clap::Parser;

    fn context(fs: &MemFs, assistant: &ScriptedAssistant) -> ServiceContext {
        ServiceContext::with_ports(
            Box::new(fs.clone()),
            Box::new(SeqIdGen::default()),
            Box::new(assistant.clone()),
        )
    }

    fn run(ctx: &ServiceContext, args: &[&str]) -> Result<(), String> {
        let mut argv = vec!["outer", "--root", "/p"];
        argv.extend_from_slice(args);
        dispatch_with_context(&Cli::parse_from(argv), ctx, &Config::default())
    }

    #[test]
    fn later_commands_use_the_planned_slug() {
        let fs = MemFs::new();
        let assistant = ScriptedAssistant::replying(&["# Architecture\n", "# Roadmap\n"]);
        let ctx = context(&fs, &assistant);

        run(&ctx, &["plan", "Add", "auth"]).unwrap();
        run(&ctx, &["roadmap"]).unwrap();

        assert_eq!(fs.contents("/p/docs/add_auth_ROADMAP.md").unwrap(), "# Roadmap\n");
    }

    #[test]
    fn commands_without_any_task_explain_what_to_do() {
        let fs = MemFs::new();
        let ctx = context(&fs, &ScriptedAssistant::default());

        let err = run(&ctx, &["roadmap"]).unwrap_err();
        assert!(err.contains("outer plan"), "{err}");
    }

    #[test]
    fn explicit_slug_wins_over_discovery() {
        let fs = MemFs::new();
        fs.put("/p/docs/newer_ARCHITECTURE.md", "# A\n");
        let ctx = context(&fs, &ScriptedAssistant::default());

        let err = run(&ctx, &["--slug", "older", "roadmap"]).unwrap_err();
        assert!(err.contains("'older'"), "{err}");
        assert!(err.contains("Architecture is not complete"), "{err}");
    }

    #[test]
    fn run_falls_back_to_configured_max_turns() {
        let fs = MemFs::new();
        fs.put("/p/docs/t_RESUME_PROMPT.md", "resume\n");
        let assistant = ScriptedAssistant::replying(&["ok", "ok"]);
        let ctx = context(&fs, &assistant);
        let config = Config { max_turns: Some(9), ..Config::default() };

        let cli = Cli::parse_from(["outer", "--root", "/p", "--slug", "t", "run"]);
        dispatch_with_context(&cli, &ctx, &config).unwrap();
        let cli = Cli::parse_from(["outer", "--root", "/p", "--slug", "t", "run", "--max-turns", "3"]);
        dispatch_with_context(&cli, &ctx, &config).unwrap();

        let turns: Vec<Option<u32>> = assistant.requests().iter().map(|r| r.max_turns).collect();
        assert_eq!(turns, vec![Some(9), Some(3)]);
    }
}
