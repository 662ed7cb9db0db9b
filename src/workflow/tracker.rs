//! Phase status inferred from the artifacts on disk.
//!
//! Nothing is cached: each call re-reads file metadata through the
//! filesystem port.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::error::{WorkflowError, WorkflowResult};
use crate::ports::filesystem::FileSystem;
use crate::workflow::breakdown::{count_checkboxes, Progress};
use crate::workflow::locator::{
    parse_document_name, parse_phase_doc_name, ArtifactLocator, CommandName, DocumentKind,
};
use crate::workflow::phase::{Phase, WorkflowState};
use crate::workflow::slug::Slug;

/// Status of one phase for one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseStatus {
    /// The artifact is missing or empty.
    NotStarted,
    /// The artifact exists and no predecessor changed after it.
    Complete,
    /// The artifact exists but a predecessor's artifact is newer. Advisory.
    Stale,
}

impl PhaseStatus {
    /// True for `Complete` and `Stale`.
    #[must_use]
    pub fn has_artifact(self) -> bool {
        self != Self::NotStarted
    }
}

impl std::fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::NotStarted => "NotStarted",
            Self::Complete => "Complete",
            Self::Stale => "Stale",
        })
    }
}

/// Tracker result for a single phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseState {
    /// The phase.
    pub phase: Phase,
    /// Its status.
    pub status: PhaseStatus,
    /// Artifact files that exist for the phase.
    pub artifacts: Vec<PathBuf>,
    /// Predecessors whose artifacts are newer than this phase's.
    pub newer_predecessors: Vec<Phase>,
}

/// Status of every phase of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// The task.
    pub slug: Slug,
    /// One entry per phase, in order.
    pub phases: Vec<PhaseState>,
    /// Checkbox progress across the phase index or phase documents.
    pub progress: Progress,
}

impl StatusReport {
    /// The entry for `phase`.
    #[must_use]
    pub fn get(&self, phase: Phase) -> &PhaseState {
        &self.phases[phase as usize]
    }

    /// Status of `phase`.
    #[must_use]
    pub fn status(&self, phase: Phase) -> PhaseStatus {
        self.get(phase).status
    }

    /// The furthest phase that has an artifact.
    #[must_use]
    pub fn state(&self) -> WorkflowState {
        self.phases
            .iter()
            .rev()
            .find(|p| p.status.has_artifact())
            .map_or(WorkflowState::Uninitialized, |p| WorkflowState::Reached(p.phase))
    }

    /// The first phase without an artifact whose predecessors all have one.
    #[must_use]
    pub fn next_phase(&self) -> Option<Phase> {
        Phase::ALL.into_iter().find(|&phase| {
            !self.status(phase).has_artifact()
                && phase.predecessors().iter().all(|&p| self.status(p).has_artifact())
        })
    }

    /// Phases currently reported as stale.
    pub fn stale(&self) -> impl Iterator<Item = &PhaseState> {
        self.phases.iter().filter(|p| p.status == PhaseStatus::Stale)
    }
}

/// Oldest and newest modification times across a phase's files.
#[derive(Debug, Clone)]
struct Artifact {
    files: Vec<PathBuf>,
    oldest: DateTime<Utc>,
    newest: DateTime<Utc>,
}

/// Reads phase status for a slug from the filesystem.
pub struct PhaseTracker<'a> {
    fs: &'a dyn FileSystem,
    locator: &'a ArtifactLocator,
}

impl<'a> PhaseTracker<'a> {
    /// Creates a tracker over the given filesystem and layout.
    #[must_use]
    pub fn new(fs: &'a dyn FileSystem, locator: &'a ArtifactLocator) -> Self {
        Self { fs, locator }
    }

    /// Inspects every phase of `slug`.
    ///
    /// `command` names the installed command file checked for `Install`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Io`] if metadata or the phase index cannot be read.
    pub fn inspect(&self, slug: &Slug, command: &CommandName) -> WorkflowResult<StatusReport> {
        let artifacts = Phase::ALL
            .into_iter()
            .map(|phase| self.artifact(slug, phase, command))
            .collect::<WorkflowResult<Vec<_>>>()?;
        let progress = self.progress(slug)?;

        let phases = Phase::ALL
            .into_iter()
            .zip(&artifacts)
            .map(|(phase, artifact)| {
                if phase == Phase::Run {
                    let status = if progress.is_done() {
                        PhaseStatus::Complete
                    } else {
                        PhaseStatus::NotStarted
                    };
                    return PhaseState {
                        phase,
                        status,
                        artifacts: Vec::new(),
                        newer_predecessors: Vec::new(),
                    };
                }
                let Some(artifact) = artifact else {
                    return PhaseState {
                        phase,
                        status: PhaseStatus::NotStarted,
                        artifacts: Vec::new(),
                        newer_predecessors: Vec::new(),
                    };
                };
                let newer_predecessors: Vec<Phase> = phase
                    .predecessors()
                    .iter()
                    .copied()
                    .filter(|&pred| {
                        artifacts[pred as usize]
                            .as_ref()
                            .is_some_and(|upstream| upstream.newest > artifact.oldest)
                    })
                    .collect();
                let status = if newer_predecessors.is_empty() {
                    PhaseStatus::Complete
                } else {
                    PhaseStatus::Stale
                };
                PhaseState { phase, status, artifacts: artifact.files.clone(), newer_predecessors }
            })
            .collect();

        Ok(StatusReport { slug: slug.clone(), phases, progress })
    }

    /// Numbers and paths of the existing phase documents, in order.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Io`] if the phases folder cannot be listed.
    pub fn phase_docs(&self, slug: &Slug) -> WorkflowResult<Vec<(u32, PathBuf)>> {
        let dir = self.locator.phases_dir();
        if !self.fs.exists(&dir) {
            return Ok(Vec::new());
        }
        let names = self.fs.list_dir(&dir).map_err(|e| WorkflowError::io(&dir, e))?;
        let mut docs: Vec<(u32, PathBuf)> = names
            .iter()
            .filter_map(|name| parse_phase_doc_name(slug, name))
            .map(|n| (n, self.locator.phase_doc(slug, n)))
            .collect();
        docs.sort_by_key(|(n, _)| *n);
        Ok(docs)
    }

    fn artifact(
        &self,
        slug: &Slug,
        phase: Phase,
        command: &CommandName,
    ) -> WorkflowResult<Option<Artifact>> {
        let files = match phase {
            Phase::Run => return Ok(None),
            Phase::PhaseBreakdown => {
                let index = self.locator.phase_index(slug);
                let first = self.locator.phase_doc(slug, 1);
                if self.non_empty(&index)?.is_none() || self.non_empty(&first)?.is_none() {
                    return Ok(None);
                }
                let mut files: Vec<PathBuf> =
                    self.phase_docs(slug)?.into_iter().map(|(_, path)| path).collect();
                files.push(index);
                files
            }
            _ => match self.locator.primary(slug, phase, command) {
                Some(path) => vec![path],
                None => return Ok(None),
            },
        };

        let mut times = Vec::with_capacity(files.len());
        let mut present = Vec::with_capacity(files.len());
        for file in files {
            if let Some(modified) = self.non_empty(&file)? {
                times.push(modified);
                present.push(file);
            }
        }
        let (Some(oldest), Some(newest)) = (times.iter().min(), times.iter().max()) else {
            return Ok(None);
        };
        Ok(Some(Artifact { oldest: *oldest, newest: *newest, files: present }))
    }

    /// Modification time of `path` if it exists and is not empty.
    ///
    /// An empty file does not count as a written artifact anywhere.
    pub(crate) fn non_empty(&self, path: &std::path::Path) -> WorkflowResult<Option<DateTime<Utc>>> {
        let meta = self.fs.metadata(path).map_err(|e| WorkflowError::io(path, e))?;
        Ok(meta.filter(|m| m.len > 0).map(|m| m.modified))
    }

    fn progress(&self, slug: &Slug) -> WorkflowResult<Progress> {
        let index = self.locator.phase_index(slug);
        if self.fs.exists(&index) {
            let text = self.fs.read_to_string(&index).map_err(|e| WorkflowError::io(&index, e))?;
            let progress = count_checkboxes(&text);
            if progress.total > 0 {
                return Ok(progress);
            }
        }
        let mut progress = Progress::default();
        for (_, path) in self.phase_docs(slug)? {
            let text = self.fs.read_to_string(&path).map_err(|e| WorkflowError::io(&path, e))?;
            progress = progress + count_checkboxes(&text);
        }
        Ok(progress)
    }
}

/// A task found on disk by its canonical document names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredTask {
    /// The task slug.
    pub slug: Slug,
    /// Modification time of its architecture document, if any.
    pub planned_at: Option<DateTime<Utc>>,
    /// Newest modification time across its documents.
    pub touched_at: DateTime<Utc>,
}

/// Lists tasks that have at least one canonical document, sorted by slug.
///
/// # Errors
///
/// Returns [`WorkflowError::Io`] if a documents folder cannot be listed.
pub fn discover_tasks(
    fs: &dyn FileSystem,
    locator: &ArtifactLocator,
) -> WorkflowResult<Vec<DiscoveredTask>> {
    let mut tasks: Vec<DiscoveredTask> = Vec::new();
    for dir in [locator.docs_dir(), locator.phases_dir()] {
        if !fs.exists(&dir) {
            continue;
        }
        for name in fs.list_dir(&dir).map_err(|e| WorkflowError::io(&dir, e))? {
            let Some((slug, kind)) = parse_document_name(&name) else {
                continue;
            };
            let path = dir.join(&name);
            let Some(meta) = fs.metadata(&path).map_err(|e| WorkflowError::io(&path, e))? else {
                continue;
            };
            let planned = (kind == DocumentKind::Architecture).then_some(meta.modified);
            match tasks.iter_mut().find(|t| t.slug == slug) {
                Some(task) => {
                    task.planned_at = task.planned_at.max(planned);
                    task.touched_at = task.touched_at.max(meta.modified);
                }
                None => tasks.push(DiscoveredTask {
                    slug,
                    planned_at: planned,
                    touched_at: meta.modified,
                }),
            }
        }
    }
    tasks.sort_by(|a, b| a.slug.cmp(&b.slug));
    Ok(tasks)
}

/// The task most recently planned, or failing that, most recently touched.
#[must_use]
pub fn latest_task(tasks: &[DiscoveredTask]) -> Option<&DiscoveredTask> {
    tasks.iter().max_by_key(|t| (t.planned_at, t.touched_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemFs;

    struct Fixture {
        fs: MemFs,
        locator: ArtifactLocator,
        slug: Slug,
        command: CommandName,
    }

    impl Fixture {
        fn new() -> Self {
            let slug = Slug::from_override("add_auth").unwrap();
            let command = CommandName::default_for(&slug);
            Self { fs: MemFs::new(), locator: ArtifactLocator::new("/p"), slug, command }
        }

        fn report(&self) -> StatusReport {
            PhaseTracker::new(&self.fs, &self.locator).inspect(&self.slug, &self.command).unwrap()
        }

        fn write_breakdown(&self, index: &str) {
            self.fs.put(self.locator.phase_doc(&self.slug, 1), "# Phase 1\n- [ ] a\n");
            self.fs.put(self.locator.phase_doc(&self.slug, 2), "# Phase 2\n- [ ] b\n");
            self.fs.put(self.locator.phase_index(&self.slug), index);
        }
    }

    #[test]
    fn empty_project_is_uninitialized() {
        let f = Fixture::new();
        let report = f.report();
        assert!(report.phases.iter().all(|p| p.status == PhaseStatus::NotStarted));
        assert_eq!(report.state(), WorkflowState::Uninitialized);
        assert_eq!(report.next_phase(), Some(Phase::Architecture));
    }

    #[test]
    fn empty_artifact_is_not_complete() {
        let f = Fixture::new();
        f.fs.put(f.locator.architecture(&f.slug), "");
        assert_eq!(f.report().status(Phase::Architecture), PhaseStatus::NotStarted);
    }

    #[test]
    fn architecture_and_roadmap_present() {
        let f = Fixture::new();
        f.fs.put(f.locator.architecture(&f.slug), "# A\n");
        f.fs.put(f.locator.roadmap(&f.slug), "# R\n");

        let report = f.report();
        assert_eq!(report.status(Phase::Architecture), PhaseStatus::Complete);
        assert_eq!(report.status(Phase::Roadmap), PhaseStatus::Complete);
        assert_eq!(report.status(Phase::PhaseBreakdown), PhaseStatus::NotStarted);
        assert_eq!(report.status(Phase::ResumePrompt), PhaseStatus::NotStarted);
        assert_eq!(report.status(Phase::Install), PhaseStatus::NotStarted);
        assert_eq!(report.status(Phase::Run), PhaseStatus::NotStarted);
        assert_eq!(report.state(), WorkflowState::Reached(Phase::Roadmap));
        assert_eq!(report.next_phase(), Some(Phase::PhaseBreakdown));
    }

    #[test]
    fn touching_upstream_marks_downstream_stale() {
        let f = Fixture::new();
        f.fs.put(f.locator.architecture(&f.slug), "# A\n");
        f.fs.put(f.locator.roadmap(&f.slug), "# R\n");
        f.fs.touch(f.locator.architecture(&f.slug));

        let report = f.report();
        assert_eq!(report.status(Phase::Architecture), PhaseStatus::Complete);
        assert_eq!(report.status(Phase::Roadmap), PhaseStatus::Stale);
        assert_eq!(report.get(Phase::Roadmap).newer_predecessors, vec![Phase::Architecture]);
        assert_eq!(report.stale().count(), 1);
    }

    #[test]
    fn breakdown_needs_index_and_first_phase() {
        let f = Fixture::new();
        f.fs.put(f.locator.phase_doc(&f.slug, 1), "# Phase 1\n");
        assert_eq!(f.report().status(Phase::PhaseBreakdown), PhaseStatus::NotStarted);

        f.fs.put(f.locator.phase_index(&f.slug), "# Index\n");
        let report = f.report();
        assert_eq!(report.status(Phase::PhaseBreakdown), PhaseStatus::Complete);
        assert_eq!(report.get(Phase::PhaseBreakdown).artifacts.len(), 2);
    }

    #[test]
    fn editing_one_phase_doc_makes_the_resume_prompt_stale() {
        let f = Fixture::new();
        f.fs.put(f.locator.roadmap(&f.slug), "# R\n");
        f.write_breakdown("- [ ] Phase 1\n");
        f.fs.put(f.locator.resume_prompt(&f.slug), "resume\n");
        assert_eq!(f.report().status(Phase::ResumePrompt), PhaseStatus::Complete);

        f.fs.touch(f.locator.phase_doc(&f.slug, 2));
        let report = f.report();
        assert_eq!(report.status(Phase::ResumePrompt), PhaseStatus::Stale);
        assert_eq!(
            report.get(Phase::ResumePrompt).newer_predecessors,
            vec![Phase::PhaseBreakdown]
        );
    }

    #[test]
    fn breakdown_is_stale_when_roadmap_is_newer_than_its_oldest_file() {
        let f = Fixture::new();
        f.fs.put(f.locator.roadmap(&f.slug), "# R\n");
        f.write_breakdown("- [ ] Phase 1\n");
        f.fs.touch(f.locator.roadmap(&f.slug));
        f.fs.touch(f.locator.phase_index(&f.slug));
        assert_eq!(f.report().status(Phase::PhaseBreakdown), PhaseStatus::Stale);
    }

    #[test]
    fn run_completes_when_every_index_box_is_checked() {
        let f = Fixture::new();
        f.write_breakdown("- [x] Phase 1\n- [ ] Phase 2\n");
        let report = f.report();
        assert_eq!(report.progress, Progress { checked: 1, total: 2 });
        assert_eq!(report.status(Phase::Run), PhaseStatus::NotStarted);

        f.fs.put(f.locator.phase_index(&f.slug), "- [x] Phase 1\n- [X] Phase 2\n");
        assert_eq!(f.report().status(Phase::Run), PhaseStatus::Complete);
    }

    #[test]
    fn progress_falls_back_to_phase_docs() {
        let f = Fixture::new();
        f.write_breakdown("# Index without boxes\n");
        assert_eq!(f.report().progress, Progress { checked: 0, total: 2 });
    }

    #[test]
    fn install_follows_command_name() {
        let f = Fixture::new();
        let custom = CommandName::from_override("go").unwrap();
        f.fs.put(f.locator.command(&custom), "---\n");
        assert_eq!(f.report().status(Phase::Install), PhaseStatus::NotStarted);

        let report = PhaseTracker::new(&f.fs, &f.locator).inspect(&f.slug, &custom).unwrap();
        assert_eq!(report.status(Phase::Install), PhaseStatus::Complete);
    }

    #[test]
    fn discovery_prefers_most_recent_plan() {
        let f = Fixture::new();
        let other = Slug::from_override("other").unwrap();
        f.fs.put(f.locator.architecture(&f.slug), "# A\n");
        f.fs.put(f.locator.architecture(&other), "# A\n");
        f.fs.put(f.locator.roadmap(&f.slug), "# R\n");
        f.fs.put(f.locator.root().join("docs/notes.md"), "x");

        let tasks = discover_tasks(&f.fs, &f.locator).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(latest_task(&tasks).unwrap().slug, other);
    }

    #[test]
    fn discovery_falls_back_to_newest_document() {
        let f = Fixture::new();
        let other = Slug::from_override("other").unwrap();
        f.fs.put(f.locator.roadmap(&f.slug), "# R\n");
        f.fs.put(f.locator.phase_index(&other), "# I\n");

        let tasks = discover_tasks(&f.fs, &f.locator).unwrap();
        assert_eq!(latest_task(&tasks).unwrap().slug, other);
        assert!(discover_tasks(&MemFs::new(), &f.locator).unwrap().is_empty());
    }
}
