//! Anthropic Messages API client.
//!
//! This is the only provider reachable from the general (non-sensitive)
//! security tier. Model ids are chosen per request by the caller's routing
//! table, so one client instance serves haiku, sonnet and opus calls alike.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::remote::ClaudeClient;
//! use llm::config::{RemoteLlmConfig, ANTHROPIC_BASE_URL};
//! use llm::{ChatModel, ChatRequest};
//!
//! let config = RemoteLlmConfig::from_env("ANTHROPIC_API_KEY", ANTHROPIC_BASE_URL, "claude-haiku-4")?;
//! let client = ClaudeClient::new(config)?;
//!
//! let request = ChatRequest::from_prompt("Summarise this excursion").with_model("claude-sonnet-4-5");
//! let response = client.chat(request).await?;
//! ```

use crate::chat::{ChatModel, ChatRequest, ChatResponse, Message, MessageRole, UsageMetadata};
use crate::config::RemoteLlmConfig;
use crate::error::{LlmError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// The Messages API rejects requests without `max_tokens`.
const DEFAULT_MAX_TOKENS: usize = 4096;

/// Anthropic Claude API client.
#[derive(Clone)]
pub struct ClaudeClient {
    config: RemoteLlmConfig,
    client: Client,
}

impl ClaudeClient {
    pub fn new(config: RemoteLlmConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    /// Split out system messages; Claude takes them as a separate field.
    fn convert_messages(&self, messages: &[Message]) -> (Option<String>, Vec<ClaudeMessage>) {
        let mut system_prompt: Option<String> = None;
        let mut claude_messages = Vec::with_capacity(messages.len());

        for msg in messages {
            match msg.role {
                MessageRole::System => {
                    system_prompt = Some(match system_prompt {
                        Some(existing) => format!("{}\n\n{}", existing, msg.content),
                        None => msg.content.clone(),
                    });
                }
                MessageRole::User | MessageRole::Assistant => {
                    claude_messages.push(ClaudeMessage {
                        role: msg.role.as_str().to_string(),
                        content: msg.content.clone(),
                    });
                }
            }
        }

        (system_prompt, claude_messages)
    }

    fn convert_response(&self, claude_resp: ClaudeResponse) -> ChatResponse {
        let text = claude_resp
            .content
            .iter()
            .filter(|block| block.content_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        let mut metadata = HashMap::new();
        metadata.insert("id".to_string(), serde_json::Value::String(claude_resp.id));
        metadata.insert("model".to_string(), serde_json::Value::String(claude_resp.model));
        metadata.insert(
            "stop_reason".to_string(),
            serde_json::Value::String(claude_resp.stop_reason.unwrap_or_default()),
        );

        ChatResponse {
            message: Message::assistant(text),
            usage: Some(UsageMetadata::new(
                claude_resp.usage.input_tokens,
                claude_resp.usage.output_tokens,
            )),
            metadata,
        }
    }
}

#[async_trait]
impl ChatModel for ClaudeClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/v1/messages", self.config.base_url);
        let (system, messages) = self.convert_messages(&request.messages);

        if messages.is_empty() {
            return Err(LlmError::InvalidRequest(
                "Claude requires at least one user message".to_string(),
            ));
        }

        let req_body = ClaudeRequest {
            model: request.model_or(&self.config.model).to_string(),
            messages,
            system,
            max_tokens: request.config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: request.config.temperature,
        };

        debug!(model = %req_body.model, max_tokens = req_body.max_tokens, "Sending Claude request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&req_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(e.to_string())
                } else {
                    LlmError::HttpError(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status("Claude", status, error_text));
        }

        let claude_resp: ClaudeResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(self.convert_response(claude_resp))
    }

    fn provider_name(&self) -> &'static str {
        "anthropic"
    }
}

#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    messages: Vec<ClaudeMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    id: String,
    content: Vec<ClaudeContent>,
    model: String,
    stop_reason: Option<String>,
    usage: ClaudeUsage,
}

#[derive(Debug, Deserialize)]
struct ClaudeContent {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClaudeUsage {
    input_tokens: usize,
    output_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ClaudeClient {
        let config = RemoteLlmConfig::new("test-key", "https://api.anthropic.com", "claude-haiku-4");
        ClaudeClient::new(config).unwrap()
    }

    #[test]
    fn test_system_messages_are_merged() {
        let messages = vec![
            Message::system("You are an 8D facilitator"),
            Message::system("Answer in JSON"),
            Message::user("Yield dropped on tool 7"),
        ];

        let (system, claude_msgs) = client().convert_messages(&messages);

        assert_eq!(
            system.as_deref(),
            Some("You are an 8D facilitator\n\nAnswer in JSON")
        );
        assert_eq!(claude_msgs.len(), 1);
        assert_eq!(claude_msgs[0].role, "user");
    }

    #[test]
    fn test_response_conversion_joins_text_blocks() {
        let raw = serde_json::json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "content": [
                {"type": "text", "text": "{\"observations\": "},
                {"type": "tool_use", "id": "t1"},
                {"type": "text", "text": "[]}"}
            ],
            "model": "claude-haiku-4",
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 321, "output_tokens": 54}
        });
        let parsed: ClaudeResponse = serde_json::from_value(raw).unwrap();

        let response = client().convert_response(parsed);

        assert_eq!(response.text(), "{\"observations\": []}");
        assert_eq!(response.usage, Some(UsageMetadata::new(321, 54)));
        assert_eq!(response.metadata["stop_reason"], "end_turn");
    }

    #[tokio::test]
    async fn test_rejects_system_only_request() {
        let request = ChatRequest::new(vec![Message::system("only a system prompt")]);
        let err = client().chat(request).await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidRequest(_)));
    }
}
