//! Artifact store: crash-safe writes of workflow documents.
//!
//! Every artifact is first written to a hidden temp file in the target
//! directory and then renamed over the canonical path, so a reader never
//! observes a half-written canonical file. Temp names never match a
//! canonical document name:
//!
//! ```text
//! docs/.{file name}.{id}.tmp
//! ```

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::context::ServiceContext;
use crate::error::{WorkflowError, WorkflowResult};

/// Writes artifacts through the context's filesystem port.
pub struct ArtifactStore<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ArtifactStore<'a> {
    /// Creates a store over the given context.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Replaces `path` with `contents` via temp file and rename.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Io`] if staging or the rename fails. The
    /// canonical file is left as it was and the temp file is removed.
    pub fn write_atomic(&self, path: &Path, contents: &str) -> WorkflowResult<()> {
        let temp = self.stage(path, contents)?;
        self.commit(&temp, path).inspect_err(|_| self.discard(&temp))
    }

    /// Replaces several files, renaming them in the given order.
    ///
    /// Every file is staged before the first rename, so a failure while
    /// staging leaves all canonical files untouched. Callers put the file
    /// that marks the set as complete last.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Io`] on the first failure; remaining temp
    /// files are removed.
    pub fn write_set_atomic(&self, files: &[(PathBuf, String)]) -> WorkflowResult<()> {
        let mut staged: Vec<(PathBuf, &Path)> = Vec::with_capacity(files.len());
        for (path, contents) in files {
            match self.stage(path, contents) {
                Ok(temp) => staged.push((temp, path.as_path())),
                Err(e) => {
                    staged.iter().for_each(|(temp, _)| self.discard(temp));
                    return Err(e);
                }
            }
        }

        let mut pending = staged.into_iter();
        while let Some((temp, path)) = pending.next() {
            if let Err(e) = self.commit(&temp, path) {
                self.discard(&temp);
                pending.for_each(|(temp, _)| self.discard(&temp));
                return Err(e);
            }
        }
        Ok(())
    }

    /// Removes a file if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Io`] if the file exists but cannot be removed.
    pub fn remove(&self, path: &Path) -> WorkflowResult<()> {
        if !self.ctx.fs.exists(path) {
            return Ok(());
        }
        self.ctx.fs.remove_file(path).map_err(|e| WorkflowError::io(path, e))
    }

    fn stage(&self, path: &Path, contents: &str) -> WorkflowResult<PathBuf> {
        let temp = self.temp_path(path);
        debug!(temp = %temp.display(), target = %path.display(), "staging artifact");
        self.ctx.fs.write(&temp, contents).map_err(|e| WorkflowError::io(path, e))?;
        Ok(temp)
    }

    fn commit(&self, temp: &Path, path: &Path) -> WorkflowResult<()> {
        self.ctx.fs.rename(temp, path).map_err(|e| WorkflowError::io(path, e))
    }

    fn discard(&self, temp: &Path) {
        if let Err(e) = self.ctx.fs.remove_file(temp) {
            warn!(temp = %temp.display(), error = %e, "failed to remove temp file");
        }
    }

    fn temp_path(&self, path: &Path) -> PathBuf {
        let name = path.file_name().map_or_else(String::new, |n| n.to_string_lossy().into_owned());
        let temp = format!(".{name}.{}.tmp", self.ctx.id_gen.generate_id());
        path.with_file_name(temp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemFs, ScriptedAssistant, SeqIdGen};

    fn context(fs: &MemFs) -> ServiceContext {
        ServiceContext::with_ports(
            Box::new(fs.clone()),
            Box::new(SeqIdGen::default()),
            Box::new(ScriptedAssistant::default()),
        )
    }

    #[test]
    fn write_atomic_replaces_file_and_leaves_no_temp() {
        let fs = MemFs::new();
        let ctx = context(&fs);
        let path = Path::new("/p/docs/a_ROADMAP.md");
        fs.put(path, "old\n");

        ArtifactStore::new(&ctx).write_atomic(path, "new\n").unwrap();

        assert_eq!(fs.contents(path).unwrap(), "new\n");
        assert_eq!(fs.paths(), vec![path.to_path_buf()]);
    }

    #[test]
    fn failed_rename_keeps_previous_artifact() {
        let fs = MemFs::new();
        let ctx = context(&fs);
        let path = Path::new("/p/docs/a_ROADMAP.md");
        fs.put(path, "old\n");
        fs.fail_renames_to(path);

        let err = ArtifactStore::new(&ctx).write_atomic(path, "new\n").unwrap_err();

        assert!(matches!(err, WorkflowError::Io { .. }));
        assert_eq!(fs.contents(path).unwrap(), "old\n");
        assert_eq!(fs.paths(), vec![path.to_path_buf()]);
    }

    #[test]
    fn temp_files_are_hidden_and_unique() {
        let fs = MemFs::new();
        let ctx = context(&fs);
        let store = ArtifactStore::new(&ctx);
        let path = Path::new("/p/docs/a_ROADMAP.md");

        assert_eq!(store.temp_path(path), Path::new("/p/docs/.a_ROADMAP.md.id1.tmp"));
        assert_eq!(store.temp_path(path), Path::new("/p/docs/.a_ROADMAP.md.id2.tmp"));
    }

    #[test]
    fn set_write_stages_everything_before_renaming() {
        let fs = MemFs::new();
        let ctx = context(&fs);
        let one = PathBuf::from("/p/docs/phases/a_PHASE_1.md");
        let index = PathBuf::from("/p/docs/phases/a_PHASE_INDEX.md");
        fs.put(&one, "old one\n");
        fs.fail_writes_to("/p/docs/phases/.a_PHASE_INDEX.md.id2.tmp");

        let files = vec![(one.clone(), "new one\n".to_string()), (index.clone(), "idx\n".into())];
        assert!(ArtifactStore::new(&ctx).write_set_atomic(&files).is_err());

        assert_eq!(fs.contents(&one).unwrap(), "old one\n");
        assert_eq!(fs.paths(), vec![one]);
    }

    #[test]
    fn set_write_stops_at_failed_rename_and_cleans_up() {
        let fs = MemFs::new();
        let ctx = context(&fs);
        let one = PathBuf::from("/p/docs/phases/a_PHASE_1.md");
        let index = PathBuf::from("/p/docs/phases/a_PHASE_INDEX.md");
        fs.fail_renames_to(&index);

        let files = vec![(one.clone(), "one\n".to_string()), (index.clone(), "idx\n".into())];
        assert!(ArtifactStore::new(&ctx).write_set_atomic(&files).is_err());

        assert_eq!(fs.paths(), vec![one]);
        assert!(fs.contents(&index).is_none());
    }
}
