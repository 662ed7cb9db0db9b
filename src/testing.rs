//! Test doubles shared by unit tests across the crate.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::ports::assistant::{
    AdapterError, Assistant, AssistantFuture, AssistantOutput, InvocationRequest,
};
use crate::ports::filesystem::{FileMeta, FileSystem, FsError};
use crate::ports::id_gen::IdGenerator;

#[derive(Debug, Clone)]
struct MemFile {
    contents: String,
    modified: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MemState {
    files: BTreeMap<PathBuf, MemFile>,
    tick: i64,
    failing_writes: BTreeSet<PathBuf>,
    failing_renames: BTreeSet<PathBuf>,
}

/// In-memory filesystem with a deterministic clock.
///
/// Every write stamps the file one second after the previous write, so
/// files written later are always newer. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemFs {
    state: Arc<Mutex<MemState>>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a file directly, bypassing failure injection.
    pub fn put(&self, path: impl AsRef<Path>, contents: &str) {
        let mut state = self.state.lock().unwrap();
        let modified = next_time(&mut state);
        state
            .files
            .insert(path.as_ref().to_path_buf(), MemFile { contents: contents.into(), modified });
    }

    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        self.state.lock().unwrap().files.get(path.as_ref()).map(|f| f.contents.clone())
    }

    pub fn modified(&self, path: impl AsRef<Path>) -> Option<DateTime<Utc>> {
        self.state.lock().unwrap().files.get(path.as_ref()).map(|f| f.modified)
    }

    /// Bumps a file's modification time past every other file.
    pub fn touch(&self, path: impl AsRef<Path>) {
        let mut state = self.state.lock().unwrap();
        let now = next_time(&mut state);
        state.files.get_mut(path.as_ref()).expect("touch of missing file").modified = now;
    }

    /// Makes every write whose target is `path` fail.
    pub fn fail_writes_to(&self, path: impl AsRef<Path>) {
        self.state.lock().unwrap().failing_writes.insert(path.as_ref().to_path_buf());
    }

    /// Makes every rename onto `path` fail.
    pub fn fail_renames_to(&self, path: impl AsRef<Path>) {
        self.state.lock().unwrap().failing_renames.insert(path.as_ref().to_path_buf());
    }

    /// All file paths, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().files.keys().cloned().collect()
    }
}

fn next_time(state: &mut MemState) -> DateTime<Utc> {
    state.tick += 1;
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(state.tick)
}

impl FileSystem for MemFs {
    fn read_to_string(&self, path: &Path) -> Result<String, FsError> {
        self.contents(path).ok_or_else(|| format!("File not found: {}", path.display()).into())
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), FsError> {
        if self.state.lock().unwrap().failing_writes.contains(path) {
            return Err(format!("injected write failure: {}", path.display()).into());
        }
        self.put(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        state.files.contains_key(path) || state.files.keys().any(|k| k.starts_with(path))
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<String>, FsError> {
        let state = self.state.lock().unwrap();
        let names: BTreeSet<String> = state
            .files
            .keys()
            .filter_map(|k| k.strip_prefix(path).ok())
            .filter_map(|rest| rest.components().next())
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if names.is_empty() {
            return Err(format!("Directory not found: {}", path.display()).into());
        }
        Ok(names.into_iter().collect())
    }

    fn metadata(&self, path: &Path) -> Result<Option<FileMeta>, FsError> {
        let state = self.state.lock().unwrap();
        Ok(state.files.get(path).map(|f| FileMeta {
            len: f.contents.len() as u64,
            modified: f.modified,
        }))
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_renames.contains(to) {
            return Err(format!("injected rename failure: {}", to.display()).into());
        }
        let file = state
            .files
            .remove(from)
            .ok_or_else(|| format!("File not found: {}", from.display()))?;
        state.files.insert(to.to_path_buf(), file);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        let mut state = self.state.lock().unwrap();
        state
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| format!("File not found: {}", path.display()).into())
    }

    fn create_new(&self, path: &Path, contents: &str) -> Result<bool, FsError> {
        if self.state.lock().unwrap().files.contains_key(path) {
            return Ok(false);
        }
        self.put(path, contents);
        Ok(true)
    }
}

#[derive(Default)]
struct Script {
    responses: VecDeque<Result<AssistantOutput, AdapterError>>,
    requests: Vec<InvocationRequest>,
}

/// Assistant that replies from a fixed script and records every request.
///
/// Clones share the script, so a test can keep one handle after boxing
/// another into a context.
#[derive(Clone, Default)]
pub struct ScriptedAssistant {
    script: Arc<Mutex<Script>>,
    yield_first: bool,
}

impl ScriptedAssistant {
    pub fn new(responses: Vec<Result<AssistantOutput, AdapterError>>) -> Self {
        let script = Script { responses: responses.into(), requests: Vec::new() };
        Self { script: Arc::new(Mutex::new(script)), yield_first: false }
    }

    /// Shorthand for a script of successful text answers.
    pub fn replying(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(AssistantOutput::text(*t))).collect())
    }

    /// Yields to the runtime once before answering, so concurrent callers
    /// interleave.
    #[must_use]
    pub fn yielding(mut self) -> Self {
        self.yield_first = true;
        self
    }

    pub fn requests(&self) -> Vec<InvocationRequest> {
        self.script.lock().unwrap().requests.clone()
    }
}

impl Assistant for ScriptedAssistant {
    fn invoke(&self, request: &InvocationRequest) -> AssistantFuture<'_> {
        let request = request.clone();
        Box::pin(async move {
            if self.yield_first {
                tokio::task::yield_now().await;
            }
            let mut script = self.script.lock().unwrap();
            script.requests.push(request.clone());
            script.responses.pop_front().unwrap_or_else(|| {
                panic!("scripted assistant has no response left for: {}", request.instruction)
            })
        })
    }
}

/// Assistant whose invocations never finish, for cancellation tests.
#[derive(Debug, Default)]
pub struct HangingAssistant;

impl Assistant for HangingAssistant {
    fn invoke(&self, _request: &InvocationRequest) -> AssistantFuture<'_> {
        Box::pin(std::future::pending())
    }
}

/// Produces `id1`, `id2`, ...
#[derive(Debug, Default)]
pub struct SeqIdGen {
    next: AtomicU64,
}

impl IdGenerator for SeqIdGen {
    fn generate_id(&self) -> String {
        format!("id{}", self.next.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_writes_are_newer() {
        let fs = MemFs::new();
        fs.put("/a", "1");
        fs.put("/b", "2");
        assert!(fs.modified("/b") > fs.modified("/a"));
        fs.touch("/a");
        assert!(fs.modified("/a") > fs.modified("/b"));
    }

    #[test]
    fn list_dir_reports_immediate_children() {
        let fs = MemFs::new();
        fs.put("/r/docs/a.md", "");
        fs.put("/r/docs/phases/b.md", "");
        assert_eq!(fs.list_dir(Path::new("/r/docs")).unwrap(), vec!["a.md", "phases"]);
        assert!(fs.list_dir(Path::new("/r/none")).is_err());
    }
}
