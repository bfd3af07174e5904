//! Security tiers and tool categories.

use crate::error::{AtlasError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sensitivity classification of the data in a run.
///
/// Variants are declared least to most restrictive, so `Ord` follows
/// restrictiveness. Ordering is informational only: each tier has its own
/// allow-set and none is derived from another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityTier {
    /// Public or sanitized data; hosted external models are fine.
    GeneralLlm,
    /// Fab-confidential data; only the factory's internal services.
    ConfidentialFab,
    /// Recipes and other crown jewels; on-prem only.
    TopSecret,
}

impl SecurityTier {
    pub const ALL: [SecurityTier; 3] = [
        SecurityTier::GeneralLlm,
        SecurityTier::ConfidentialFab,
        SecurityTier::TopSecret,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityTier::GeneralLlm => "general_llm",
            SecurityTier::ConfidentialFab => "confidential_fab",
            SecurityTier::TopSecret => "top_secret",
        }
    }

    /// Human label for reports and prompts.
    pub fn label(&self) -> &'static str {
        match self {
            SecurityTier::GeneralLlm => "General LLM (Tier 1)",
            SecurityTier::ConfidentialFab => "Confidential Fab (Tier 2)",
            SecurityTier::TopSecret => "Top Secret (Tier 3)",
        }
    }
}

impl fmt::Display for SecurityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecurityTier {
    type Err = AtlasError;

    /// Accepts the snake_case name, a kebab-case spelling, or the tier number.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "general_llm" | "general" | "1" => Ok(SecurityTier::GeneralLlm),
            "confidential_fab" | "confidential" | "2" => Ok(SecurityTier::ConfidentialFab),
            "top_secret" | "3" => Ok(SecurityTier::TopSecret),
            _ => Err(AtlasError::invalid_parameter(
                "security tier",
                s,
                "general_llm, confidential_fab, top_secret",
            )),
        }
    }
}

/// Class of capability a tool or provider belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    /// Hosted third-party APIs (Anthropic, OpenAI, ...).
    ExternalApi,
    /// Services inside the factory network (SPC, FDC, GenAI gateway).
    FactoryApi,
    /// Air-gapped on-prem services.
    OnpremApi,
    /// Tools that run on the analyst's machine.
    LocalTool,
    KnowledgeGraph,
}

impl ToolCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolCategory::ExternalApi => "external_api",
            ToolCategory::FactoryApi => "factory_api",
            ToolCategory::OnpremApi => "onprem_api",
            ToolCategory::LocalTool => "local_tool",
            ToolCategory::KnowledgeGraph => "knowledge_graph",
        }
    }

    /// Categories that reach a language model.
    pub fn is_model_api(&self) -> bool {
        matches!(
            self,
            ToolCategory::ExternalApi | ToolCategory::FactoryApi | ToolCategory::OnpremApi
        )
    }
}

impl fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
