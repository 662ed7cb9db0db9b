//! Live assistant adapter that drives the `claude` command-line tool.
//!
//! Each invocation is a fresh print-mode session: the instruction is written
//! on stdin and the newline-delimited JSON stream on stdout is parsed until
//! the terminal `result` event.

use std::path::PathBuf;
use std::process::Stdio;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::ports::assistant::{
    AdapterError, Assistant, AssistantFuture, AssistantOutput, InvocationRequest,
};

/// Settings for spawning the assistant CLI.
#[derive(Debug, Clone)]
pub struct ClaudeCliSettings {
    /// Binary to execute.
    pub binary: String,
    /// Value passed to `--permission-mode`.
    pub permission_mode: String,
    /// Optional `--model` override.
    pub model: Option<String>,
    /// Echo assistant text and tool uses to stderr while streaming.
    pub stream_output: bool,
    /// Working directory for the session.
    pub working_dir: PathBuf,
}

/// Assistant adapter backed by a `claude -p` subprocess.
pub struct ClaudeCliAssistant {
    settings: ClaudeCliSettings,
}

impl ClaudeCliAssistant {
    /// Creates an adapter with the given settings.
    #[must_use]
    pub fn new(settings: ClaudeCliSettings) -> Self {
        Self { settings }
    }

    /// Arguments passed to the binary for one invocation.
    #[must_use]
    pub fn args(&self, max_turns: Option<u32>) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            "--output-format".to_string(),
            "stream-json".to_string(),
            "--verbose".to_string(),
            "--permission-mode".to_string(),
            self.settings.permission_mode.clone(),
        ];
        if let Some(model) = &self.settings.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }
        if let Some(turns) = max_turns {
            args.push("--max-turns".to_string());
            args.push(turns.to_string());
        }
        args
    }

    async fn run(&self, request: InvocationRequest) -> Result<AssistantOutput, AdapterError> {
        let args = self.args(request.max_turns);
        debug!(binary = %self.settings.binary, ?args, "spawning assistant");

        let mut child = Command::new(&self.settings.binary)
            .args(&args)
            .current_dir(&self.settings.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AdapterError::Spawn(format!("{}: {e}", self.settings.binary)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| AdapterError::Spawn("failed to capture stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AdapterError::Spawn("failed to capture stdout".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| AdapterError::Spawn("failed to capture stderr".into()))?;

        stdin
            .write_all(request.instruction.as_bytes())
            .await
            .map_err(|e| AdapterError::Protocol(format!("failed to send instruction: {e}")))?;
        // Closing stdin tells the CLI the prompt is complete.
        drop(stdin);

        let (result, stderr_text) =
            tokio::join!(self.consume_stream(stdout), read_all(stderr));
        let status = child
            .wait()
            .await
            .map_err(|e| AdapterError::Protocol(format!("failed to wait for assistant: {e}")))?;

        match result? {
            Some(event) => interpret_result(event, request.max_turns),
            None if !status.success() => {
                Err(AdapterError::Exit { code: status.code(), stderr: stderr_text.trim().to_string() })
            }
            None => Err(AdapterError::Protocol("assistant exited without a result event".into())),
        }
    }

    async fn consume_stream<R>(&self, stdout: R) -> Result<Option<ResultEvent>, AdapterError>
    where
        R: AsyncRead + Unpin,
    {
        let mut lines = BufReader::new(stdout).lines();
        let mut result = None;

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| AdapterError::Protocol(format!("failed to read assistant output: {e}")))?
        {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<StreamEvent>(&line) {
                Ok(StreamEvent::Assistant { message }) => self.echo(&message),
                Ok(StreamEvent::Result(event)) => result = Some(event),
                Ok(StreamEvent::Other) => {}
                Err(e) => debug!(error = %e, "skipping unparseable stream line"),
            }
        }

        Ok(result)
    }

    fn echo(&self, message: &AssistantMessage) {
        if !self.settings.stream_output {
            return;
        }
        for block in &message.content {
            match block {
                ContentBlock::Text { text } => eprintln!("{text}"),
                ContentBlock::ToolUse { name } => eprintln!("> {name}"),
                ContentBlock::Other => {}
            }
        }
    }
}

impl Assistant for ClaudeCliAssistant {
    fn invoke(&self, request: &InvocationRequest) -> AssistantFuture<'_> {
        let request = request.clone();
        Box::pin(async move { self.run(request).await })
    }
}

async fn read_all<R>(mut reader: R) -> String
where
    R: AsyncRead + Unpin,
{
    let mut buf = String::new();
    if let Err(e) = reader.read_to_string(&mut buf).await {
        warn!(error = %e, "failed to read assistant stderr");
    }
    buf
}

/// One line of the `stream-json` output.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    Assistant { message: AssistantMessage },
    Result(ResultEvent),
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    ToolUse { name: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ResultEvent {
    #[serde(default)]
    subtype: String,
    #[serde(default)]
    is_error: bool,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    num_turns: u32,
    #[serde(default)]
    total_cost_usd: Option<f64>,
    #[serde(default)]
    session_id: Option<String>,
}

fn interpret_result(
    event: ResultEvent,
    max_turns: Option<u32>,
) -> Result<AssistantOutput, AdapterError> {
    if event.subtype == "error_max_turns" {
        return Err(AdapterError::StepBoundExceeded {
            max_turns: max_turns.unwrap_or(event.num_turns),
        });
    }
    if event.is_error || event.subtype.starts_with("error") {
        let detail = event.result.unwrap_or(event.subtype);
        return Err(AdapterError::Failed(detail));
    }
    Ok(AssistantOutput {
        text: event.result.unwrap_or_default(),
        turns: event.num_turns,
        cost_usd: event.total_cost_usd,
        session_id: event.session_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter(model: Option<&str>) -> ClaudeCliAssistant {
        ClaudeCliAssistant::new(ClaudeCliSettings {
            binary: "claude".into(),
            permission_mode: "bypassPermissions".into(),
            model: model.map(String::from),
            stream_output: false,
            working_dir: PathBuf::from("."),
        })
    }

    fn parse_result(line: &str) -> ResultEvent {
        match serde_json::from_str::<StreamEvent>(line).unwrap() {
            StreamEvent::Result(event) => event,
            other => panic!("expected result event, got {other:?}"),
        }
    }

    #[test]
    fn args_include_bound_and_model_only_when_set() {
        let plain = adapter(None).args(None);
        assert!(!plain.contains(&"--max-turns".to_string()));
        assert!(!plain.contains(&"--model".to_string()));

        let bounded = adapter(Some("opus")).args(Some(12));
        let joined = bounded.join(" ");
        assert!(joined.contains("--max-turns 12"));
        assert!(joined.contains("--model opus"));
        assert!(joined.starts_with("-p --output-format stream-json --verbose"));
    }

    #[tokio::test]
    async fn stream_yields_final_result() {
        let stream = concat!(
            r#"{"type":"system","subtype":"init","session_id":"s1"}"#,
            "\n",
            r#"{"type":"assistant","message":{"content":[{"type":"text","text":"working"},{"type":"tool_use","name":"Read","input":{}}]}}"#,
            "\n",
            "not json at all\n",
            r##"{"type":"result","subtype":"success","is_error":false,"result":"# Roadmap\n","num_turns":3,"total_cost_usd":0.25,"session_id":"s1"}"##,
            "\n",
        );

        let event = adapter(None).consume_stream(stream.as_bytes()).await.unwrap().unwrap();
        let output = interpret_result(event, None).unwrap();

        assert_eq!(output.text, "# Roadmap\n");
        assert_eq!(output.turns, 3);
        assert_eq!(output.cost_usd, Some(0.25));
        assert_eq!(output.session_id.as_deref(), Some("s1"));
    }

    #[tokio::test]
    async fn stream_without_result_yields_none() {
        let stream = r#"{"type":"system","subtype":"init"}"#;
        let event = adapter(None).consume_stream(stream.as_bytes()).await.unwrap();
        assert!(event.is_none());
    }

    #[test]
    fn max_turns_result_maps_to_step_bound() {
        let event = parse_result(r#"{"type":"result","subtype":"error_max_turns","num_turns":5}"#);
        let err = interpret_result(event, Some(5)).unwrap_err();
        assert_eq!(err, AdapterError::StepBoundExceeded { max_turns: 5 });
    }

    #[test]
    fn error_result_maps_to_failed() {
        let event = parse_result(
            r#"{"type":"result","subtype":"error_during_execution","is_error":true}"#,
        );
        let err = interpret_result(event, None).unwrap_err();
        assert_eq!(err, AdapterError::Failed("error_during_execution".into()));
    }

    #[tokio::test]
    async fn missing_binary_is_spawn_error() {
        let assistant = ClaudeCliAssistant::new(ClaudeCliSettings {
            binary: "outer-test-no-such-binary".into(),
            permission_mode: "default".into(),
            model: None,
            stream_output: false,
            working_dir: PathBuf::from("."),
        });
        let err = assistant.invoke(&InvocationRequest::new("hi")).await.unwrap_err();
        assert!(matches!(err, AdapterError::Spawn(_)));
    }
}
