//! Connection settings for provider clients.

use crate::error::{LlmError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Anthropic's public API endpoint.
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

/// Default Ollama endpoint for an on-prem model server.
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Configuration for hosted, key-authenticated providers.
///
/// Used for Anthropic and for OpenAI-compatible gateways such as the
/// factory GenAI service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteLlmConfig {
    /// API key sent with every request.
    pub api_key: String,

    /// Base URL without a trailing slash.
    ///
    /// Examples:
    /// - Anthropic: "https://api.anthropic.com"
    /// - Factory gateway: "https://genai.fab.internal/v1"
    pub base_url: String,

    /// Model used when a request does not override it.
    pub model: String,

    #[serde(default = "default_timeout")]
    pub timeout: Duration,
}

impl RemoteLlmConfig {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: trim_base_url(base_url.into()),
            model: model.into(),
            timeout: default_timeout(),
        }
    }

    /// Read the API key from `env_var`.
    pub fn from_env(
        env_var: &str,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let api_key = std::env::var(env_var)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| LlmError::ApiKeyNotFound(format!("Environment variable: {}", env_var)))?;

        Ok(Self::new(api_key, base_url, model))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Configuration for self-hosted model servers (Ollama and friends).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalLlmConfig {
    pub base_url: String,

    pub model: String,

    /// Bearer token for servers sitting behind an authenticating proxy.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout: Duration,
}

impl LocalLlmConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: trim_base_url(base_url.into()),
            model: model.into(),
            api_key: None,
            timeout: default_timeout(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn trim_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(120)
}
