//! The model invocation boundary.
//!
//! Stages never see HTTP clients. They hand a prompt and a resolved
//! [`ModelConfig`] to a [`ModelInvoker`] and get text plus token counts
//! back. [`LlmGateway`] is the production invoker; tests script their own.

use crate::config::ProvidersConfig;
use crate::error::{AtlasError, Result};
use crate::router::{designated_provider, resolve, CostMode, ModelConfig, Provider, TaskType};
use crate::security::SecurityTier;
use async_trait::async_trait;
use llm::config::{LocalLlmConfig, RemoteLlmConfig};
use llm::local::OllamaClient;
use llm::remote::{ClaudeClient, OpenAiCompatibleClient};
use llm::{ChatModel, ChatRequest, LlmError};
use std::time::Duration;
use tracing::{debug, warn};

/// Raw result of one model call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Something that can run a prompt against a model.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    /// The provider every call goes to. Checked against the active tier
    /// before any route is resolved.
    fn provider(&self) -> Provider;

    async fn invoke(
        &self,
        prompt: &str,
        config: &ModelConfig,
        max_tokens: usize,
    ) -> std::result::Result<Invocation, LlmError>;
}

/// Production invoker wrapping one provider client.
pub struct LlmGateway {
    provider: Provider,
    client: Box<dyn ChatModel>,
}

impl LlmGateway {
    pub fn new(provider: Provider, client: Box<dyn ChatModel>) -> Self {
        Self { provider, client }
    }

    /// Build the client for the tier's designated provider.
    pub fn for_tier(tier: SecurityTier, providers: &ProvidersConfig) -> Result<Self> {
        Self::for_provider(designated_provider(tier), providers)
    }

    /// Build the client for an explicit provider. Whether the active tier
    /// may use it is decided later, per stage.
    pub fn for_provider(provider: Provider, providers: &ProvidersConfig) -> Result<Self> {
        let endpoint = providers.endpoint(provider);
        let home_tier = SecurityTier::ALL
            .into_iter()
            .find(|tier| designated_provider(*tier) == provider)
            .unwrap_or(SecurityTier::GeneralLlm);
        let default_model = resolve(TaskType::Reasoning, home_tier, CostMode::Dev).model_id;
        let timeout = Duration::from_secs(endpoint.timeout_secs);
        let api_key = endpoint.resolve_api_key(provider);

        let client: Box<dyn ChatModel> = match provider {
            Provider::Anthropic | Provider::Factory => {
                let key = api_key.ok_or_else(|| {
                    AtlasError::Config(format!(
                        "no API key for provider '{}' (set {} or providers.{}.api_key)",
                        provider,
                        provider.api_key_env(),
                        provider
                    ))
                })?;
                let config = RemoteLlmConfig::new(key, endpoint.base_url.clone(), default_model)
                    .with_timeout(timeout);
                if provider == Provider::Anthropic {
                    Box::new(ClaudeClient::new(config).map_err(client_error)?)
                } else {
                    Box::new(OpenAiCompatibleClient::new(config, "factory").map_err(client_error)?)
                }
            }
            Provider::OnPrem => {
                let mut config = LocalLlmConfig::new(endpoint.base_url.clone(), default_model)
                    .with_timeout(timeout);
                if let Some(key) = api_key {
                    config = config.with_api_key(key);
                }
                Box::new(OllamaClient::new(config).map_err(client_error)?)
            }
        };

        debug!(provider = %provider, base_url = %endpoint.base_url, "Built model gateway");
        Ok(Self::new(provider, client))
    }
}

fn client_error(err: LlmError) -> AtlasError {
    AtlasError::Config(format!("failed to build provider client: {}", err))
}

/// Rough token estimate for providers that omit usage.
fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

#[async_trait]
impl ModelInvoker for LlmGateway {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn invoke(
        &self,
        prompt: &str,
        config: &ModelConfig,
        max_tokens: usize,
    ) -> std::result::Result<Invocation, LlmError> {
        let request = ChatRequest::from_prompt(prompt)
            .with_model(config.model_id.clone())
            .with_temperature(config.temperature)
            .with_max_tokens(max_tokens.min(config.max_tokens));

        let response = self.client.chat(request).await?;
        let text = response.text().to_string();

        let (input_tokens, output_tokens) = match response.usage {
            Some(usage) => (usage.input_tokens as u64, usage.output_tokens as u64),
            None => {
                warn!(
                    provider = self.client.provider_name(),
                    model = %config.model_id,
                    "Provider reported no token usage, estimating from text length"
                );
                (estimate_tokens(prompt), estimate_tokens(&text))
            }
        };

        Ok(Invocation {
            text,
            input_tokens,
            output_tokens,
        })
    }
}
