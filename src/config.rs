//! Project configuration: `.outer.yaml`, then environment overrides.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ports::filesystem::FileSystem;

/// File name of the optional project configuration, under the project root.
pub const CONFIG_FILE: &str = ".outer.yaml";

/// Which assistant implementation runs the phases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistantBackend {
    /// The `claude` command-line tool in print mode.
    #[default]
    ClaudeCli,
    /// The hosted messages API, single turn.
    AnthropicApi,
}

impl fmt::Display for AssistantBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ClaudeCli => "claude_cli",
            Self::AnthropicApi => "anthropic_api",
        })
    }
}

impl FromStr for AssistantBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "claude_cli" | "claude" | "cli" => Ok(Self::ClaudeCli),
            "anthropic_api" | "api" => Ok(Self::AnthropicApi),
            _ => Err(format!(
                "unknown assistant backend '{s}' (expected claude_cli or anthropic_api)"
            )),
        }
    }
}

/// Settings for the assistant adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Backend used for every phase that calls the assistant.
    pub assistant: AssistantBackend,
    /// Binary spawned by the CLI backend.
    pub claude_binary: String,
    /// `--permission-mode` for the CLI backend.
    pub permission_mode: String,
    /// Optional `--model` for the CLI backend.
    pub model: Option<String>,
    /// Model used by the API backend.
    pub api_model: String,
    /// Output token limit for the API backend.
    pub api_max_tokens: u32,
    /// Default step bound for `outer run`.
    pub max_turns: Option<u32>,
    /// Echo the assistant's progress to stderr.
    pub stream_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            assistant: AssistantBackend::default(),
            claude_binary: "claude".into(),
            permission_mode: "bypassPermissions".into(),
            model: None,
            api_model: "claude-sonnet-4-20250514".into(),
            api_max_tokens: 8192,
            max_turns: None,
            stream_output: true,
        }
    }
}

impl Config {
    /// Reads `<root>/.outer.yaml`, or the defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if it sets `max_turns` to zero.
    pub fn load(fs: &dyn FileSystem, root: &Path) -> Result<Self, String> {
        let path = root.join(CONFIG_FILE);
        if !fs.exists(&path) {
            return Ok(Self::default());
        }
        let text = fs
            .read_to_string(&path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(&text)
            .map_err(|e| format!("Failed to parse {}: {e}", path.display()))?;
        if config.max_turns == Some(0) {
            return Err(format!("{}: max_turns must be a positive integer", path.display()));
        }
        Ok(config)
    }

    /// Applies `OUTER_ASSISTANT`, `OUTER_CLAUDE_BIN`, `OUTER_MODEL` and
    /// `OUTER_MAX_TURNS` as returned by `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds an invalid value.
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(value) = lookup("OUTER_ASSISTANT") {
            self.assistant = value.parse()?;
        }
        if let Some(value) = lookup("OUTER_CLAUDE_BIN") {
            self.claude_binary = value;
        }
        if let Some(value) = lookup("OUTER_MODEL") {
            self.model = Some(value);
        }
        if let Some(value) = lookup("OUTER_MAX_TURNS") {
            let turns = value
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|turns| *turns > 0)
                .ok_or_else(|| format!("OUTER_MAX_TURNS must be a positive integer, got '{value}'"))?;
            self.max_turns = Some(turns);
        }
        Ok(self)
    }
}
