//! The workflow state machine: guarded, explicitly requested transitions.
//!
//! A transition takes the slug's lock, checks that every predecessor has an
//! artifact, produces the phase's output and writes it atomically. Nothing
//! is written until the assistant has answered, so a failed or cancelled
//! transition leaves the previous artifacts exactly as they were.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::context::ServiceContext;
use crate::error::{WorkflowError, WorkflowResult};
use crate::ports::assistant::{AssistantOutput, InvocationRequest};
use crate::ports::filesystem::FileSystem;
use crate::store::ArtifactStore;
use crate::workflow::breakdown::{normalize_document, split_breakdown};
use crate::workflow::instructions;
use crate::workflow::lock::TransitionLock;
use crate::workflow::locator::{ArtifactLocator, CommandName};
use crate::workflow::phase::Phase;
use crate::workflow::resume::build_resume_handle;
use crate::workflow::slug::Slug;
use crate::workflow::tracker::{PhaseStatus, PhaseTracker, StatusReport};

/// Caller-supplied inputs to [`Workflow::advance`].
#[derive(Debug, Clone, Default)]
pub struct AdvanceOptions {
    /// Task description; required for [`Phase::Architecture`].
    pub description: Option<String>,
    /// Optional bound on assistant-internal steps, passed through as is.
    pub max_turns: Option<u32>,
    /// Installed command name override.
    pub command_name: Option<String>,
}

/// What a successful transition did.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionOutcome {
    /// The task.
    pub slug: Slug,
    /// The phase that ran.
    pub phase: Phase,
    /// Artifacts written, in write order.
    pub written: Vec<PathBuf>,
    /// Leftover artifacts removed (phase documents beyond the new count).
    pub removed: Vec<PathBuf>,
    /// Predecessors that were newer than this phase's previous artifact.
    pub stale_predecessors: Vec<Phase>,
    /// The assistant's answer, for phases that call it.
    pub assistant: Option<AssistantOutput>,
}

/// Drives phase transitions for tasks under one project root.
///
/// Holds no per-task state; every call takes the slug explicitly.
pub struct Workflow<'a> {
    ctx: &'a ServiceContext,
    locator: ArtifactLocator,
}

impl<'a> Workflow<'a> {
    /// Creates a workflow for the project at `root`.
    pub fn new(ctx: &'a ServiceContext, root: impl Into<PathBuf>) -> Self {
        Self { ctx, locator: ArtifactLocator::new(root) }
    }

    /// The filesystem the artifacts live on.
    #[must_use]
    pub fn fs(&self) -> &dyn FileSystem {
        self.ctx.fs.as_ref()
    }

    /// The artifact layout in use.
    #[must_use]
    pub fn locator(&self) -> &ArtifactLocator {
        &self.locator
    }

    /// Reports the status of every phase of `slug`.
    ///
    /// # Errors
    ///
    /// Returns an error if the command name is unusable or the artifacts
    /// cannot be inspected.
    pub fn status(&self, slug: &Slug, command_name: Option<&str>) -> WorkflowResult<StatusReport> {
        let command = CommandName::resolve(slug, command_name)?;
        self.tracker().inspect(slug, &command)
    }

    /// Builds the resume handle for `slug` without writing it.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Io`] if the artifacts cannot be inspected.
    pub fn resume_handle(&self, slug: &Slug) -> WorkflowResult<String> {
        build_resume_handle(self.ctx.fs.as_ref(), &self.locator, slug)
    }

    /// Runs `phase` for `slug`, overwriting any artifact it produced before.
    ///
    /// Dropping the returned future cancels the transition; the lock is
    /// released and no artifact is touched.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::ConcurrentTransition`] if another transition for
    ///   the slug is running.
    /// - [`WorkflowError::PhaseNotReady`] naming the first predecessor
    ///   without an artifact.
    /// - [`WorkflowError::MissingDescription`] for an architecture request
    ///   without a description.
    /// - [`WorkflowError::Adapter`] if the assistant fails.
    /// - [`WorkflowError::MalformedOutput`] if the answer cannot be stored.
    /// - [`WorkflowError::Io`] if reading or writing artifacts fails.
    pub async fn advance(
        &self,
        slug: &Slug,
        phase: Phase,
        options: &AdvanceOptions,
    ) -> WorkflowResult<TransitionOutcome> {
        let command = CommandName::resolve(slug, options.command_name.as_deref())?;
        let description = options.description.as_deref().map(str::trim).filter(|d| !d.is_empty());
        if phase == Phase::Architecture && description.is_none() {
            return Err(WorkflowError::MissingDescription { phase });
        }

        let _lock = TransitionLock::acquire(
            self.ctx.fs.as_ref(),
            self.locator.lock(slug),
            slug,
            phase,
        )?;

        let report = self.tracker().inspect(slug, &command)?;
        self.check_predecessors(&report, phase, &command)?;
        let stale_predecessors = report.get(phase).newer_predecessors.clone();
        if !stale_predecessors.is_empty() {
            let upstream: Vec<&str> = stale_predecessors.iter().map(|p| p.label()).collect();
            warn!(
                slug = %slug,
                phase = %phase,
                newer = ?upstream,
                "regenerating from predecessors edited after the previous {phase} output",
            );
        }

        info!(slug = %slug, phase = %phase, "transition started");
        let mut outcome = TransitionOutcome {
            slug: slug.clone(),
            phase,
            written: Vec::new(),
            removed: Vec::new(),
            stale_predecessors,
            assistant: None,
        };
        let store = ArtifactStore::new(self.ctx);

        match phase {
            Phase::Architecture | Phase::Roadmap => {
                let (instruction, path) = if phase == Phase::Architecture {
                    (
                        instructions::architecture(
                            &self.locator,
                            slug,
                            description.unwrap_or_default(),
                        ),
                        self.locator.architecture(slug),
                    )
                } else {
                    (instructions::roadmap(&self.locator, slug), self.locator.roadmap(slug))
                };
                let output = self.invoke(slug, phase, instruction, options.max_turns).await?;
                let document = normalize_document(phase, &output.text)?;
                store.write_atomic(&path, &document)?;
                outcome.written.push(path);
                outcome.assistant = Some(output);
            }
            Phase::PhaseBreakdown => {
                let instruction = instructions::phase_breakdown(&self.locator, slug);
                let output = self.invoke(slug, phase, instruction, options.max_turns).await?;
                let breakdown = split_breakdown(&output.text)?;

                let mut files: Vec<(PathBuf, String)> = Vec::with_capacity(breakdown.phases.len() + 1);
                for (n, doc) in (1..).zip(breakdown.phases) {
                    files.push((self.locator.phase_doc(slug, n), doc));
                }
                let count = files.len();
                files.push((self.locator.phase_index(slug), breakdown.index));
                store.write_set_atomic(&files)?;
                outcome.written = files.into_iter().map(|(path, _)| path).collect();

                for (n, path) in self.tracker().phase_docs(slug)? {
                    if usize::try_from(n).is_ok_and(|n| n > count) {
                        store.remove(&path)?;
                        debug!(path = %path.display(), "removed leftover phase document");
                        outcome.removed.push(path);
                    }
                }
                outcome.assistant = Some(output);
            }
            Phase::ResumePrompt => {
                let handle = self.resume_handle(slug)?;
                let path = self.locator.resume_prompt(slug);
                store.write_atomic(&path, &handle)?;
                outcome.written.push(path);
            }
            Phase::Install => {
                let prompt = self.read(&self.locator.resume_prompt(slug))?;
                let definition = command_definition(slug, &prompt);
                let path = self.locator.command(&command);
                store.write_atomic(&path, &definition)?;
                outcome.written.push(path);
            }
            Phase::Run => {
                let prompt = self.read(&self.locator.resume_prompt(slug))?;
                let output = self.invoke(slug, phase, prompt, options.max_turns).await?;
                outcome.assistant = Some(output);
            }
        }

        info!(
            slug = %slug,
            phase = %phase,
            written = outcome.written.len(),
            removed = outcome.removed.len(),
            "transition finished",
        );
        Ok(outcome)
    }

    fn tracker(&self) -> PhaseTracker<'_> {
        PhaseTracker::new(self.ctx.fs.as_ref(), &self.locator)
    }

    fn check_predecessors(
        &self,
        report: &StatusReport,
        phase: Phase,
        command: &CommandName,
    ) -> WorkflowResult<()> {
        let missing = phase
            .predecessors()
            .iter()
            .copied()
            .find(|&pred| report.status(pred) == PhaseStatus::NotStarted);
        match missing {
            None => Ok(()),
            Some(missing) => Err(WorkflowError::PhaseNotReady {
                slug: report.slug.to_string(),
                phase,
                missing,
                path: self
                    .locator
                    .primary(&report.slug, missing, command)
                    .map(|p| self.locator.relative(&p).to_path_buf())
                    .unwrap_or_default(),
            }),
        }
    }

    async fn invoke(
        &self,
        slug: &Slug,
        phase: Phase,
        instruction: String,
        max_turns: Option<u32>,
    ) -> WorkflowResult<AssistantOutput> {
        let request = InvocationRequest::new(instruction).with_max_turns(max_turns);
        debug!(slug = %slug, phase = %phase, chars = request.instruction.len(), ?max_turns, "invoking assistant");
        let output = self.ctx.assistant.invoke(&request).await.map_err(|source| {
            WorkflowError::Adapter { slug: slug.to_string(), phase, source }
        })?;
        info!(
            slug = %slug,
            phase = %phase,
            turns = output.turns,
            cost_usd = output.cost_usd,
            "assistant finished",
        );
        Ok(output)
    }

    fn read(&self, path: &Path) -> WorkflowResult<String> {
        self.ctx.fs.read_to_string(path).map_err(|e| WorkflowError::io(path, e))
    }
}

/// Slash command definition wrapping the resume prompt.
#[must_use]
pub fn command_definition(slug: &Slug, resume_prompt: &str) -> String {
    format!("---\ndescription: Resume planned work on {slug}\n---\n\n{resume_prompt}")
}
