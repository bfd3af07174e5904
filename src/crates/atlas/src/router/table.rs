//! Static routing table: (task type, tier, cost mode) -> model.
//!
//! Every key resolves; the match below is exhaustive over closed enums, so a
//! missing entry is a compile error rather than a runtime lookup miss.
//! Confidential and top-secret tiers ignore the cost mode entirely.

use crate::error::{AtlasError, Result};
use crate::security::{SecurityTier, ToolCategory};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of work a model call performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Narrative understanding and question generation.
    Reasoning,
    /// Multi-phase 8D analysis.
    DeepAnalysis,
    /// Turning findings into actions.
    Synthesis,
    /// Cheap classification-style calls.
    Fast,
}

impl TaskType {
    pub const ALL: [TaskType; 4] = [
        TaskType::Reasoning,
        TaskType::DeepAnalysis,
        TaskType::Synthesis,
        TaskType::Fast,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Reasoning => "reasoning",
            TaskType::DeepAnalysis => "deep_analysis",
            TaskType::Synthesis => "synthesis",
            TaskType::Fast => "fast",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = AtlasError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "reasoning" => Ok(TaskType::Reasoning),
            "deep_analysis" => Ok(TaskType::DeepAnalysis),
            "synthesis" => Ok(TaskType::Synthesis),
            "fast" => Ok(TaskType::Fast),
            _ => Err(AtlasError::invalid_parameter(
                "task type",
                s,
                "reasoning, deep_analysis, synthesis, fast",
            )),
        }
    }
}

/// Cheap development models or production-quality models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostMode {
    #[default]
    Dev,
    Runtime,
}

impl CostMode {
    pub const ALL: [CostMode; 2] = [CostMode::Dev, CostMode::Runtime];

    pub fn as_str(&self) -> &'static str {
        match self {
            CostMode::Dev => "dev",
            CostMode::Runtime => "runtime",
        }
    }
}

impl fmt::Display for CostMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CostMode {
    type Err = AtlasError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(CostMode::Dev),
            "runtime" | "prod" | "production" => Ok(CostMode::Runtime),
            _ => Err(AtlasError::invalid_parameter("cost mode", s, "dev, runtime")),
        }
    }
}

/// Model provider a route points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Anthropic,
    /// Factory GenAI gateway.
    Factory,
    #[serde(rename = "onprem")]
    OnPrem,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Anthropic => "anthropic",
            Provider::Factory => "factory",
            Provider::OnPrem => "onprem",
        }
    }

    /// Tool category the enforcer sees when this provider is called.
    pub fn category(&self) -> ToolCategory {
        match self {
            Provider::Anthropic => ToolCategory::ExternalApi,
            Provider::Factory => ToolCategory::FactoryApi,
            Provider::OnPrem => ToolCategory::OnpremApi,
        }
    }

    /// Environment variable holding the provider's API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::Factory => "FACTORY_API_KEY",
            Provider::OnPrem => "ONPREM_API_KEY",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = AtlasError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            "factory" => Ok(Provider::Factory),
            "onprem" | "ollama" => Ok(Provider::OnPrem),
            _ => Err(AtlasError::invalid_parameter("provider", s, "anthropic, factory, onprem")),
        }
    }
}

/// The designated provider for a tier.
pub fn designated_provider(tier: SecurityTier) -> Provider {
    match tier {
        SecurityTier::GeneralLlm => Provider::Anthropic,
        SecurityTier::ConfidentialFab => Provider::Factory,
        SecurityTier::TopSecret => Provider::OnPrem,
    }
}

/// Concrete model selection plus its pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub provider: Provider,
    pub model_id: String,
    /// Price in dollars per 1000 input tokens.
    pub cost_per_1k_input: f64,
    /// Price in dollars per 1000 output tokens.
    pub cost_per_1k_output: f64,
    /// Upper bound on generation length for this route.
    pub max_tokens: usize,
    pub temperature: f32,
}

impl ModelConfig {
    fn new(
        provider: Provider,
        model_id: &str,
        cost_per_1k_input: f64,
        cost_per_1k_output: f64,
        max_tokens: usize,
    ) -> Self {
        Self {
            provider,
            model_id: model_id.to_string(),
            cost_per_1k_input,
            cost_per_1k_output,
            max_tokens,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Dollar cost of one call at this config's prices.
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 / 1000.0) * self.cost_per_1k_input
            + (output_tokens as f64 / 1000.0) * self.cost_per_1k_output
    }
}

const DEFAULT_TEMPERATURE: f32 = 0.7;

// Anthropic list prices, dollars per 1k tokens (input, output)
const HAIKU: (&str, f64, f64) = ("claude-haiku-4", 0.25, 1.25);
const SONNET: (&str, f64, f64) = ("claude-sonnet-4-5", 3.0, 15.0);
const OPUS: (&str, f64, f64) = ("claude-opus-4-5", 15.0, 75.0);

/// Resolve a route. Pure; the same key always yields the same config.
pub fn resolve(task: TaskType, tier: SecurityTier, cost_mode: CostMode) -> ModelConfig {
    match tier {
        SecurityTier::GeneralLlm => general_route(task, cost_mode),
        SecurityTier::ConfidentialFab => internal_route(Provider::Factory, "factory", task),
        SecurityTier::TopSecret => internal_route(Provider::OnPrem, "onprem", task),
    }
}

fn general_route(task: TaskType, cost_mode: CostMode) -> ModelConfig {
    let ((model, price_in, price_out), max_tokens) = match (cost_mode, task) {
        (CostMode::Dev, TaskType::Reasoning) => (HAIKU, 4000),
        (CostMode::Dev, TaskType::DeepAnalysis) => (HAIKU, 8000),
        (CostMode::Dev, TaskType::Synthesis) => (HAIKU, 6000),
        (CostMode::Dev, TaskType::Fast) => (HAIKU, 2000),
        (CostMode::Runtime, TaskType::Reasoning) => (SONNET, 8000),
        (CostMode::Runtime, TaskType::DeepAnalysis) => (OPUS, 16000),
        (CostMode::Runtime, TaskType::Synthesis) => (SONNET, 8000),
        (CostMode::Runtime, TaskType::Fast) => (HAIKU, 4000),
    };
    ModelConfig::new(Provider::Anthropic, model, price_in, price_out, max_tokens)
}

/// Internal providers are free at the margin and have one model per task.
fn internal_route(provider: Provider, prefix: &str, task: TaskType) -> ModelConfig {
    let (suffix, max_tokens) = match task {
        TaskType::Reasoning => ("reasoning", 8000),
        TaskType::DeepAnalysis => ("analysis", 16000),
        TaskType::Synthesis => ("synthesis", 8000),
        TaskType::Fast => ("fast", 4000),
    };
    ModelConfig::new(provider, &format!("{}-{}", prefix, suffix), 0.0, 0.0, max_tokens)
}

/// Every (task, tier, cost mode) route, in a stable order.
pub fn all_routes() -> Vec<(TaskType, SecurityTier, CostMode, ModelConfig)> {
    let mut routes = Vec::with_capacity(TaskType::ALL.len() * SecurityTier::ALL.len() * CostMode::ALL.len());
    for tier in SecurityTier::ALL {
        for cost_mode in CostMode::ALL {
            for task in TaskType::ALL {
                routes.push((task, tier, cost_mode, resolve(task, tier, cost_mode)));
            }
        }
    }
    routes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_complete() {
        assert_eq!(all_routes().len(), 4 * 3 * 2);
    }

    #[test]
    fn test_every_route_uses_tier_provider() {
        for (task, tier, cost_mode, config) in all_routes() {
            assert_eq!(
                config.provider,
                designated_provider(tier),
                "{} / {} / {}",
                task,
                tier,
                cost_mode
            );
        }
    }

    #[test]
    fn test_dev_mode_uses_haiku() {
        for task in TaskType::ALL {
            let config = resolve(task, SecurityTier::GeneralLlm, CostMode::Dev);
            assert_eq!(config.model_id, "claude-haiku-4");
            assert_eq!(config.cost_per_1k_input, 0.25);
        }
    }

    #[test]
    fn test_runtime_mode_upgrades_models() {
        let reasoning = resolve(TaskType::Reasoning, SecurityTier::GeneralLlm, CostMode::Runtime);
        assert_eq!(reasoning.model_id, "claude-sonnet-4-5");

        let analysis = resolve(TaskType::DeepAnalysis, SecurityTier::GeneralLlm, CostMode::Runtime);
        assert_eq!(analysis.model_id, "claude-opus-4-5");
        assert_eq!(analysis.max_tokens, 16000);
    }

    #[test]
    fn test_cost_mode_does_not_change_internal_tiers() {
        for tier in [SecurityTier::ConfidentialFab, SecurityTier::TopSecret] {
            for task in TaskType::ALL {
                assert_eq!(
                    resolve(task, tier, CostMode::Dev),
                    resolve(task, tier, CostMode::Runtime)
                );
            }
        }
        assert_eq!(
            resolve(TaskType::DeepAnalysis, SecurityTier::TopSecret, CostMode::Runtime).model_id,
            "onprem-analysis"
        );
    }

    #[test]
    fn test_cost_formula() {
        let config = resolve(TaskType::Reasoning, SecurityTier::GeneralLlm, CostMode::Runtime);
        // 2000 in at $3/1k + 500 out at $15/1k
        assert!((config.cost(2000, 500) - 13.5).abs() < 1e-9);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("RUNTIME".parse::<CostMode>().unwrap(), CostMode::Runtime);
        assert!("turbo".parse::<CostMode>().is_err());
        assert_eq!("deep-analysis".parse::<TaskType>().unwrap(), TaskType::DeepAnalysis);
    }

    #[test]
    fn test_provider_categories() {
        assert_eq!(Provider::Anthropic.category(), ToolCategory::ExternalApi);
        assert_eq!(Provider::Factory.category(), ToolCategory::FactoryApi);
        assert_eq!(Provider::OnPrem.category(), ToolCategory::OnpremApi);
    }
}
