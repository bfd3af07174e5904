//! OpenAI-compatible chat completions client.
//!
//! The factory GenAI gateway exposes the `/chat/completions` shape, so this
//! client is what the confidential tier talks to. It works against OpenAI
//! itself as well.

use crate::chat::{ChatModel, ChatRequest, ChatResponse, Message, UsageMetadata};
use crate::config::RemoteLlmConfig;
use crate::error::{LlmError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Client for any endpoint implementing the OpenAI chat completions API.
#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    config: RemoteLlmConfig,
    client: Client,
    provider: &'static str,
}

impl OpenAiCompatibleClient {
    /// `provider` is the short name reported in logs and errors.
    pub fn new(config: RemoteLlmConfig, provider: &'static str) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            config,
            client,
            provider,
        })
    }

    fn convert_response(&self, resp: OpenAiResponse) -> Result<ChatResponse> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("response contained no choices".to_string()))?;

        let mut metadata = HashMap::new();
        metadata.insert("model".to_string(), serde_json::Value::String(resp.model));
        if let Some(reason) = choice.finish_reason {
            metadata.insert("finish_reason".to_string(), serde_json::Value::String(reason));
        }

        Ok(ChatResponse {
            message: Message::assistant(choice.message.content.unwrap_or_default()),
            usage: resp
                .usage
                .map(|u| UsageMetadata::new(u.prompt_tokens, u.completion_tokens)),
            metadata,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatibleClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let req_body = OpenAiRequest {
            model: request.model_or(&self.config.model).to_string(),
            messages: request
                .messages
                .iter()
                .map(|m| OpenAiMessage {
                    role: m.role.as_str().to_string(),
                    content: Some(m.content.clone()),
                })
                .collect(),
            temperature: request.config.temperature,
            max_tokens: request.config.max_tokens,
        };

        debug!(provider = self.provider, model = %req_body.model, "Sending chat completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
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
            return Err(LlmError::from_status(self.provider, status, error_text));
        }

        let body: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        self.convert_response(body)
    }

    fn provider_name(&self) -> &'static str {
        self.provider
    }
}

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    model: String,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}
