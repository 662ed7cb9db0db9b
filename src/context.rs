//! Service context bundling all port trait objects.

use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::adapters::live::anthropic::AnthropicApiAssistant;
use crate::adapters::live::claude_cli::{ClaudeCliAssistant, ClaudeCliSettings};
use crate::adapters::live::filesystem::LiveFileSystem;
use crate::adapters::live::id_gen::LiveIdGenerator;
use crate::adapters::recording::RecordingAssistant;
use crate::adapters::replaying::ReplayingAssistant;
use crate::cassette::recorder::CassetteRecorder;
use crate::cassette::replayer::CassetteReplayer;
use crate::config::{AssistantBackend, Config};
use crate::ports::assistant::Assistant;
use crate::ports::filesystem::FileSystem;
use crate::ports::id_gen::IdGenerator;

/// Bundles all port trait objects into a single context.
///
/// Each field provides access to one external boundary. Constructors
/// wire up different adapter implementations (live, replaying, recording).
pub struct ServiceContext {
    /// Filesystem holding the workflow artifacts.
    pub fs: Box<dyn FileSystem>,
    /// ID generator for temp file names.
    pub id_gen: Box<dyn IdGenerator>,
    /// External coding assistant.
    pub assistant: Box<dyn Assistant>,
    /// Optional cassette recorder; written to disk on drop.
    recorder: Option<Arc<Mutex<CassetteRecorder>>>,
}

impl ServiceContext {
    /// Creates a live context whose assistant runs in `root`.
    #[must_use]
    pub fn live(config: &Config, root: &Path) -> Self {
        Self::with_ports(
            Box::new(LiveFileSystem),
            Box::new(LiveIdGenerator),
            live_assistant(config, root),
        )
    }

    /// Creates a live context that records every assistant invocation.
    ///
    /// The cassette is written to `path` when this context is dropped. This
    /// is the developer-only mechanism behind `OUTER_RECORD`.
    #[must_use]
    pub fn recording(config: &Config, root: &Path, path: &Path) -> Self {
        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(path, "outer-session")));
        let assistant = RecordingAssistant::new(live_assistant(config, root), Arc::clone(&recorder));
        let mut ctx = Self::with_ports(
            Box::new(LiveFileSystem),
            Box::new(LiveIdGenerator),
            Box::new(assistant),
        );
        ctx.recorder = Some(recorder);
        ctx
    }

    /// Creates a context whose assistant answers from a cassette file.
    ///
    /// The filesystem stays live so that replayed sessions produce real
    /// artifacts.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be read or parsed.
    pub fn replaying(path: &Path) -> Result<Self, String> {
        let replayer = CassetteReplayer::from_file(path)?;
        Ok(Self::with_ports(
            Box::new(LiveFileSystem),
            Box::new(LiveIdGenerator),
            Box::new(ReplayingAssistant::new(replayer)),
        ))
    }

    /// Creates a context from explicit port implementations.
    #[must_use]
    pub fn with_ports(
        fs: Box<dyn FileSystem>,
        id_gen: Box<dyn IdGenerator>,
        assistant: Box<dyn Assistant>,
    ) -> Self {
        Self { fs, id_gen, assistant, recorder: None }
    }
}

fn live_assistant(config: &Config, root: &Path) -> Box<dyn Assistant> {
    match config.assistant {
        AssistantBackend::ClaudeCli => Box::new(ClaudeCliAssistant::new(ClaudeCliSettings {
            binary: config.claude_binary.clone(),
            permission_mode: config.permission_mode.clone(),
            model: config.model.clone(),
            stream_output: config.stream_output,
            working_dir: root.to_path_buf(),
        })),
        AssistantBackend::AnthropicApi => {
            Box::new(AnthropicApiAssistant::new(config.api_model.clone(), config.api_max_tokens))
        }
    }
}

impl Drop for ServiceContext {
    fn drop(&mut self) {
        let Some(recorder) = self.recorder.take() else {
            return;
        };
        let recorder = recorder.lock().expect("recorder lock poisoned");
        match recorder.flush() {
            Ok(path) => info!(path = %path.display(), interactions = recorder.len(), "cassette written"),
            Err(e) => warn!(error = %e, "failed to write cassette"),
        }
    }
}
