//! Model router
//!
//! Resolves routes and owns the usage counters for whoever holds it. One
//! router per workflow run keeps "this run's cost" meaningful; sharing a
//! router across concurrent runs would mix their accounting.

use crate::router::table::{self, CostMode, ModelConfig, TaskType};
use crate::router::usage::UsageStats;
use crate::security::SecurityTier;
use tracing::debug;

/// Tier-aware router with cost accounting. Not `Clone`: forking the
/// router would fork its usage counters.
#[derive(Debug, Default)]
pub struct ModelRouter {
    cost_mode: CostMode,
    usage: UsageStats,
}

impl ModelRouter {
    pub fn new(cost_mode: CostMode) -> Self {
        Self {
            cost_mode,
            usage: UsageStats::default(),
        }
    }

    /// Cost mode stages resolve with.
    pub fn cost_mode(&self) -> CostMode {
        self.cost_mode
    }

    /// Look up the model for a (task, tier, cost mode) key.
    pub fn resolve(&self, task: TaskType, tier: SecurityTier, cost_mode: CostMode) -> ModelConfig {
        let config = table::resolve(task, tier, cost_mode);
        debug!(
            task = %task,
            tier = %tier,
            cost_mode = %cost_mode,
            provider = %config.provider,
            model = %config.model_id,
            "Resolved model route"
        );
        config
    }

    /// Record one completed call and return its cost.
    ///
    /// Call exactly once per model invocation, with the config that call
    /// was resolved to. There is no de-duplication.
    pub fn track_usage(
        &mut self,
        task: TaskType,
        config: &ModelConfig,
        input_tokens: u64,
        output_tokens: u64,
    ) -> f64 {
        let cost = config.cost(input_tokens, output_tokens);
        self.usage.record(task, input_tokens, output_tokens, cost);
        debug!(
            task = %task,
            model = %config.model_id,
            input_tokens,
            output_tokens,
            cost,
            total_cost = self.usage.total_cost(),
            "Tracked model usage"
        );
        cost
    }

    pub fn usage(&self) -> &UsageStats {
        &self.usage
    }

    pub fn usage_summary(&self) -> String {
        self.usage.to_markdown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_is_deterministic() {
        let router = ModelRouter::new(CostMode::Runtime);
        let first = router.resolve(TaskType::Synthesis, SecurityTier::GeneralLlm, CostMode::Runtime);
        let second = router.resolve(TaskType::Synthesis, SecurityTier::GeneralLlm, CostMode::Runtime);
        assert_eq!(first.provider, second.provider);
        assert_eq!(first.model_id, second.model_id);
    }

    #[test]
    fn test_track_usage_is_additive() {
        let mut router = ModelRouter::new(CostMode::Dev);
        let config = router.resolve(TaskType::Reasoning, SecurityTier::GeneralLlm, CostMode::Dev);

        let calls = [(1200_u64, 300_u64), (0, 0), (57, 4099), (1, 1)];
        let mut expected = 0.0;
        for (input, output) in calls {
            expected += router.track_usage(TaskType::Reasoning, &config, input, output);
        }

        let manual: f64 = calls
            .iter()
            .map(|(i, o)| (*i as f64 / 1000.0) * 0.25 + (*o as f64 / 1000.0) * 1.25)
            .sum();
        assert!((router.usage().total_cost() - manual).abs() < 1e-6);
        assert!((router.usage().total_cost() - expected).abs() < 1e-6);
        assert_eq!(router.usage().total_calls(), 4);
    }

    #[test]
    fn test_internal_tier_usage_is_free() {
        let mut router = ModelRouter::new(CostMode::Runtime);
        let config = router.resolve(TaskType::DeepAnalysis, SecurityTier::TopSecret, CostMode::Runtime);

        let cost = router.track_usage(TaskType::DeepAnalysis, &config, 5000, 5000);

        assert_eq!(cost, 0.0);
        assert_eq!(router.usage().total_input_tokens(), 5000);
    }

    #[test]
    fn test_summary_does_not_mutate() {
        let mut router = ModelRouter::new(CostMode::Dev);
        let config = router.resolve(TaskType::Fast, SecurityTier::GeneralLlm, CostMode::Dev);
        router.track_usage(TaskType::Fast, &config, 10, 10);

        let before = router.usage().clone();
        let _ = router.usage_summary();
        let _ = router.usage_summary();
        assert_eq!(router.usage(), &before);
    }
}
