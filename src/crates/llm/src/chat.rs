//! Chat request/response types and the `ChatModel` trait.
//!
//! Every provider client in this crate speaks the same small vocabulary:
//! a list of role-tagged [`Message`]s goes in as a [`ChatRequest`], and a
//! single assistant [`Message`] plus token [`UsageMetadata`] comes back as a
//! [`ChatResponse`]. Callers that only need "prompt in, text out" can use
//! [`ChatRequest::from_prompt`] and [`ChatResponse::text`].

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    /// Wire name used by OpenAI-compatible and Ollama chat APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Generation settings attached to a request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Overrides the client's configured model for this request only.
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
}

/// A chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub config: ChatConfig,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            config: ChatConfig::default(),
        }
    }

    /// Single-turn request carrying one user prompt.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self::new(vec![Message::user(prompt)])
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.config.max_tokens = Some(max_tokens);
        self
    }

    /// Model to send on the wire: the per-request override, else `fallback`.
    pub fn model_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.config.model.as_deref().unwrap_or(fallback)
    }
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMetadata {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl UsageMetadata {
    pub fn new(input_tokens: usize, output_tokens: usize) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total_tokens(&self) -> usize {
        self.input_tokens + self.output_tokens
    }
}

/// A completed chat response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: Message,
    /// `None` when the provider did not report token counts.
    pub usage: Option<UsageMetadata>,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ChatResponse {
    pub fn text(&self) -> &str {
        &self.message.content
    }
}

/// A chat completion backend.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send a request and wait for the complete response.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// Cheap reachability probe. Defaults to `true` for hosted APIs.
    async fn is_available(&self) -> bool {
        true
    }

    /// Short provider name used in logs.
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = ChatRequest::from_prompt("Describe the excursion")
            .with_model("claude-haiku-4")
            .with_temperature(0.7)
            .with_max_tokens(2000);

        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, MessageRole::User);
        assert_eq!(request.config.model.as_deref(), Some("claude-haiku-4"));
        assert_eq!(request.config.temperature, Some(0.7));
        assert_eq!(request.config.max_tokens, Some(2000));
    }

    #[test]
    fn test_model_override_falls_back() {
        let request = ChatRequest::from_prompt("hi");
        assert_eq!(request.model_or("default-model"), "default-model");

        let request = request.with_model("override");
        assert_eq!(request.model_or("default-model"), "override");
    }

    #[test]
    fn test_usage_total() {
        let usage = UsageMetadata::new(120, 80);
        assert_eq!(usage.total_tokens(), 200);
    }

    #[test]
    fn test_role_wire_names() {
        assert_eq!(MessageRole::System.as_str(), "system");
        assert_eq!(MessageRole::User.as_str(), "user");
        assert_eq!(MessageRole::Assistant.as_str(), "assistant");
    }
}
