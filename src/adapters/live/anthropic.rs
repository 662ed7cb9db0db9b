//! Single-turn assistant backed by the Anthropic messages API.
//!
//! Suitable for the document phases, where the artifact is exactly the
//! model's answer. It cannot edit files, so `outer run` against this
//! backend only produces a textual answer.

use std::env;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ports::assistant::{
    AdapterError, Assistant, AssistantFuture, AssistantOutput, InvocationRequest,
};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Assistant that sends each instruction as one user message.
pub struct AnthropicApiAssistant {
    client: Client,
    model: String,
    max_tokens: u32,
}

impl AnthropicApiAssistant {
    /// Creates a client for the given model and output token limit.
    #[must_use]
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self { client: Client::new(), model: model.into(), max_tokens }
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    id: Option<String>,
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl Assistant for AnthropicApiAssistant {
    fn invoke(&self, request: &InvocationRequest) -> AssistantFuture<'_> {
        let instruction = request.instruction.clone();

        Box::pin(async move {
            let api_key = env::var("ANTHROPIC_API_KEY").map_err(|_| {
                AdapterError::Api("ANTHROPIC_API_KEY environment variable not set".into())
            })?;

            let body = MessagesRequest {
                model: &self.model,
                max_tokens: self.max_tokens,
                messages: vec![Message { role: "user", content: &instruction }],
            };
            debug!(model = %self.model, "sending instruction to messages API");

            let response = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&body)
                .send()
                .await
                .map_err(|e| AdapterError::Api(format!("request failed: {e}")))?;

            let status = response.status();
            let response_text = response
                .text()
                .await
                .map_err(|e| AdapterError::Api(format!("failed to read response: {e}")))?;

            if !status.is_success() {
                let msg = serde_json::from_str::<ApiError>(&response_text)
                    .map(|e| e.error.message)
                    .unwrap_or(response_text);
                return Err(AdapterError::Api(format!("{} {msg}", status.as_u16())));
            }

            parse_response(&response_text)
        })
    }
}

fn parse_response(body: &str) -> Result<AssistantOutput, AdapterError> {
    let parsed: MessagesResponse = serde_json::from_str(body)
        .map_err(|e| AdapterError::Protocol(format!("failed to parse messages response: {e}")))?;
    let text = parsed.content.into_iter().filter_map(|block| block.text).collect::<String>();
    Ok(AssistantOutput { text, turns: 1, cost_usd: None, session_id: parsed.id })
}
