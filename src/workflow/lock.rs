//! Per-slug single-flight guard backed by a lock file.
//!
//! The lock file sits next to the slug's documents, so it also guards
//! against a second `outer` process working on the same task. A lock whose
//! recorded process no longer exists is reclaimed.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, warn};

use crate::error::{WorkflowError, WorkflowResult};
use crate::ports::filesystem::FileSystem;
use crate::workflow::phase::Phase;
use crate::workflow::slug::Slug;

/// Held for the duration of one transition; removes its lock file on drop.
pub struct TransitionLock<'a> {
    fs: &'a dyn FileSystem,
    path: PathBuf,
}

impl<'a> TransitionLock<'a> {
    /// Takes the lock at `path` for `slug`, reclaiming it from a dead process.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::ConcurrentTransition`] if a live process
    /// holds the lock, or [`WorkflowError::Io`] if it cannot be created.
    pub fn acquire(
        fs: &'a dyn FileSystem,
        path: PathBuf,
        slug: &Slug,
        phase: Phase,
    ) -> WorkflowResult<Self> {
        Self::acquire_with(fs, path, slug, phase, pid_alive)
    }

    /// Like [`TransitionLock::acquire`], with an explicit liveness check for
    /// the process recorded in an existing lock file.
    ///
    /// # Errors
    ///
    /// Same as [`TransitionLock::acquire`].
    pub fn acquire_with(
        fs: &'a dyn FileSystem,
        path: PathBuf,
        slug: &Slug,
        phase: Phase,
        is_alive: impl Fn(u32) -> bool,
    ) -> WorkflowResult<Self> {
        let contents = format!(
            "phase: {}\npid: {}\nstarted_at: {}\n",
            phase.command(),
            std::process::id(),
            Utc::now().to_rfc3339(),
        );
        if create(fs, &path, &contents)? {
            debug!(lock = %path.display(), "acquired transition lock");
            return Ok(Self { fs, path });
        }

        let existing = fs.read_to_string(&path).unwrap_or_default();
        let holder = LockHolder::parse(&existing);
        let dead = holder.pid.is_some_and(|pid| pid != std::process::id() && !is_alive(pid));
        if dead && reclaim(fs, &path, &existing)? && create(fs, &path, &contents)? {
            warn!(
                lock = %path.display(),
                holder = %holder,
                "reclaimed transition lock left by a process that no longer exists",
            );
            return Ok(Self { fs, path });
        }

        Err(WorkflowError::ConcurrentTransition {
            slug: slug.to_string(),
            lock: path,
            holder: holder.to_string(),
        })
    }

    /// Path of the held lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TransitionLock<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.fs.remove_file(&self.path) {
            warn!(lock = %self.path.display(), error = %e, "failed to remove transition lock");
        }
    }
}

fn create(fs: &dyn FileSystem, path: &Path, contents: &str) -> WorkflowResult<bool> {
    fs.create_new(path, contents).map_err(|e| WorkflowError::io(path, e))
}

/// Removes a dead holder's lock, unless it changed since it was read.
fn reclaim(fs: &dyn FileSystem, path: &Path, seen: &str) -> WorkflowResult<bool> {
    match fs.read_to_string(path) {
        Ok(current) if current == seen => {
            fs.remove_file(path).map_err(|e| WorkflowError::io(path, e))?;
            Ok(true)
        }
        // Gone already: the create that follows decides.
        Err(_) if !fs.exists(path) => Ok(true),
        _ => Ok(false),
    }
}

/// The `pid` and `started_at` lines of a lock file.
#[derive(Debug, Default, PartialEq, Eq)]
struct LockHolder {
    pid: Option<u32>,
    started_at: Option<String>,
}

impl LockHolder {
    fn parse(text: &str) -> Self {
        let mut holder = Self::default();
        for line in text.lines() {
            if let Some(pid) = line.strip_prefix("pid:") {
                holder.pid = pid.trim().parse().ok();
            } else if let Some(started) = line.strip_prefix("started_at:") {
                holder.started_at = Some(started.trim().to_string());
            }
        }
        holder
    }
}

impl std::fmt::Display for LockHolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.pid, &self.started_at) {
            (Some(pid), Some(started)) => write!(f, "held by pid {pid} since {started}"),
            (Some(pid), None) => write!(f, "held by pid {pid}"),
            (None, _) => f.write_str("holder unknown"),
        }
    }
}

#[cfg(unix)]
fn pid_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    // EPERM means the process exists but belongs to someone else.
    matches!(kill(Pid::from_raw(raw), None), Ok(()) | Err(Errno::EPERM))
}

#[cfg(not(unix))]
fn pid_alive(_pid: u32) -> bool {
    true
}
