//! Tier enforcement
//!
//! A hard gate between the pipeline and anything that could move data out
//! of its security tier. Each tier has an explicit allow-set of tool
//! categories; nothing is inherited between tiers.
//!
//! The enforcer holds only its lookup tables, built once at construction.
//! Checks are pure: they never log, record, or mutate.

use crate::security::tier::{SecurityTier, ToolCategory};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Named tools known to the enforcer and the category each belongs to.
const TOOL_REGISTRY: &[(&str, ToolCategory)] = &[
    ("openai", ToolCategory::ExternalApi),
    ("anthropic", ToolCategory::ExternalApi),
    ("google_gemini", ToolCategory::ExternalApi),
    ("perplexity", ToolCategory::ExternalApi),
    ("factory_spc", ToolCategory::FactoryApi),
    ("factory_fdc", ToolCategory::FactoryApi),
    ("factory_metrology", ToolCategory::FactoryApi),
    ("factory_genai", ToolCategory::FactoryApi),
    ("onprem_llm", ToolCategory::OnpremApi),
    ("recipe_database", ToolCategory::OnpremApi),
    ("git", ToolCategory::LocalTool),
    ("ast-grep", ToolCategory::LocalTool),
    ("local_files", ToolCategory::LocalTool),
    ("knowledge_graph", ToolCategory::KnowledgeGraph),
];

fn allowed_categories(tier: SecurityTier) -> &'static [ToolCategory] {
    match tier {
        SecurityTier::GeneralLlm => &[ToolCategory::ExternalApi, ToolCategory::LocalTool],
        SecurityTier::ConfidentialFab => &[
            ToolCategory::FactoryApi,
            ToolCategory::LocalTool,
            ToolCategory::KnowledgeGraph,
        ],
        SecurityTier::TopSecret => &[ToolCategory::OnpremApi, ToolCategory::LocalTool],
    }
}

/// The one model-provider category each tier may reach.
pub fn model_category(tier: SecurityTier) -> ToolCategory {
    match tier {
        SecurityTier::GeneralLlm => ToolCategory::ExternalApi,
        SecurityTier::ConfidentialFab => ToolCategory::FactoryApi,
        SecurityTier::TopSecret => ToolCategory::OnpremApi,
    }
}

/// A blocked request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierViolation {
    /// Tool name, when the check was made by name.
    pub tool: Option<String>,
    /// `None` only for unregistered tools.
    pub requested: Option<ToolCategory>,
    pub active_tier: SecurityTier,
    /// An allowed category that covers the same need.
    pub suggested: ToolCategory,
    pub reason: String,
    /// Operator-facing advice.
    pub suggestion: String,
}

impl fmt::Display for TierViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (suggestion: {})", self.reason, self.suggestion)
    }
}

impl std::error::Error for TierViolation {}

impl TierViolation {
    /// Markdown block for the end-of-run report.
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("## Security Violation\n\n");
        if let Some(tool) = &self.tool {
            out.push_str(&format!("- **Tool**: {}\n", tool));
        }
        if let Some(category) = self.requested {
            out.push_str(&format!("- **Requested category**: {}\n", category));
        }
        out.push_str(&format!("- **Active tier**: {}\n", self.active_tier.label()));
        out.push_str(&format!("- **Reason**: {}\n", self.reason));
        out.push_str(&format!("- **Use instead**: {}\n", self.suggested));
        out.push_str(&format!("- **Suggestion**: {}\n", self.suggestion));
        out
    }
}

/// Checks tool categories and named tools against tier allow-sets.
#[derive(Debug, Clone)]
pub struct TierEnforcer {
    policy: HashMap<SecurityTier, BTreeSet<ToolCategory>>,
    tools: BTreeMap<&'static str, ToolCategory>,
}

impl Default for TierEnforcer {
    fn default() -> Self {
        Self::new()
    }
}

impl TierEnforcer {
    pub fn new() -> Self {
        let policy = SecurityTier::ALL
            .iter()
            .map(|tier| (*tier, allowed_categories(*tier).iter().copied().collect()))
            .collect();
        let tools = TOOL_REGISTRY.iter().copied().collect();

        Self { policy, tools }
    }

    /// `Ok` if `category` is in the allow-set of `tier`.
    pub fn check(&self, category: ToolCategory, tier: SecurityTier) -> Result<(), TierViolation> {
        if self.is_allowed(category, tier) {
            return Ok(());
        }

        Err(TierViolation {
            tool: None,
            requested: Some(category),
            active_tier: tier,
            suggested: suggested_alternative(category, tier),
            reason: format!("Category '{}' is not permitted in {} tier", category, tier),
            suggestion: suggestion_for(category.as_str(), category, tier),
        })
    }

    /// Check a named tool. Unregistered tools are always blocked.
    pub fn check_tool(&self, tool_name: &str, tier: SecurityTier) -> Result<ToolCategory, TierViolation> {
        let Some(category) = self.tools.get(tool_name).copied() else {
            return Err(TierViolation {
                tool: Some(tool_name.to_string()),
                requested: None,
                active_tier: tier,
                suggested: ToolCategory::LocalTool,
                reason: format!("Unknown tool '{}' (blocked by default)", tool_name),
                suggestion: "Register the tool with a category before use".to_string(),
            });
        };

        self.check(category, tier).map_err(|mut violation| {
            violation.tool = Some(tool_name.to_string());
            violation.reason = format!(
                "Tool '{}' (category: {}) not allowed in {} tier",
                tool_name, category, tier
            );
            violation.suggestion = suggestion_for(tool_name, category, tier);
            violation
        })?;

        Ok(category)
    }

    pub fn is_allowed(&self, category: ToolCategory, tier: SecurityTier) -> bool {
        self.policy
            .get(&tier)
            .is_some_and(|allowed| allowed.contains(&category))
    }

    /// Allowed categories for `tier`, in declaration order.
    pub fn allowed_categories(&self, tier: SecurityTier) -> Vec<ToolCategory> {
        self.policy
            .get(&tier)
            .map(|allowed| allowed.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Registered tool names usable in `tier`, sorted.
    pub fn allowed_tools(&self, tier: SecurityTier) -> Vec<&'static str> {
        self.tools
            .iter()
            .filter(|(_, category)| self.is_allowed(**category, tier))
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn tool_category(&self, tool_name: &str) -> Option<ToolCategory> {
        self.tools.get(tool_name).copied()
    }
}

fn suggested_alternative(requested: ToolCategory, tier: SecurityTier) -> ToolCategory {
    if requested.is_model_api() {
        model_category(tier)
    } else {
        ToolCategory::LocalTool
    }
}

fn suggestion_for(subject: &str, category: ToolCategory, tier: SecurityTier) -> String {
    match (tier, category) {
        (SecurityTier::ConfidentialFab, ToolCategory::ExternalApi) => {
            format!("Use factory_genai API instead of {}", subject)
        }
        (SecurityTier::TopSecret, ToolCategory::ExternalApi) => {
            format!("Use onprem_llm instead of {}", subject)
        }
        (SecurityTier::TopSecret, ToolCategory::FactoryApi) => {
            "Factory APIs not available in Top Secret tier. Use onprem_llm.".to_string()
        }
        (SecurityTier::GeneralLlm, ToolCategory::FactoryApi) => {
            "Factory APIs require Confidential tier or higher".to_string()
        }
        (SecurityTier::GeneralLlm, ToolCategory::OnpremApi) => {
            "On-prem APIs require Top Secret tier".to_string()
        }
        _ => format!("Tool '{}' not available in {} tier", subject, tier),
    }
}
