//! Routing table and tier policy, checked across every key.

use atlas::router::{all_routes, designated_provider, resolve};
use atlas::{CostMode, ModelRouter, Provider, SecurityTier, TaskType, TierEnforcer, ToolCategory};

#[test]
fn test_every_route_targets_the_tier_provider() {
    for (task, tier, cost_mode, config) in all_routes() {
        assert_eq!(
            config.provider,
            designated_provider(tier),
            "{task} / {tier} / {cost_mode} routed to {}",
            config.provider
        );
    }
}

#[test]
fn test_cost_mode_only_matters_for_general_tier() {
    for task in TaskType::ALL {
        for tier in [SecurityTier::ConfidentialFab, SecurityTier::TopSecret] {
            assert_eq!(resolve(task, tier, CostMode::Dev), resolve(task, tier, CostMode::Runtime));
        }
    }
    assert_ne!(
        resolve(TaskType::DeepAnalysis, SecurityTier::GeneralLlm, CostMode::Dev).model_id,
        resolve(TaskType::DeepAnalysis, SecurityTier::GeneralLlm, CostMode::Runtime).model_id
    );
}

#[test]
fn test_track_usage_sums_exactly() {
    let mut router = ModelRouter::new(CostMode::Runtime);
    let calls = [(1200_u64, 300_u64), (0, 0), (9000, 4100), (17, 3)];
    let mut expected = 0.0;

    for (input, output) in calls {
        let config = router.resolve(TaskType::DeepAnalysis, SecurityTier::GeneralLlm, CostMode::Runtime);
        expected += config.cost(input, output);
        router.track_usage(TaskType::DeepAnalysis, &config, input, output);
    }

    let usage = router.usage();
    assert!((usage.total_cost() - expected).abs() < 1e-6);
    assert_eq!(usage.total_calls(), 4);
    assert_eq!(usage.total_input_tokens(), 10_217);
    assert_eq!(usage.task(TaskType::DeepAnalysis).calls, 4);
    assert_eq!(usage.task(TaskType::Fast).calls, 0);
}

#[test]
fn test_usage_summary_does_not_mutate() {
    let mut router = ModelRouter::new(CostMode::Dev);
    let config = router.resolve(TaskType::Reasoning, SecurityTier::GeneralLlm, CostMode::Dev);
    router.track_usage(TaskType::Reasoning, &config, 1000, 1000);

    let before = router.usage().clone();
    let summary = router.usage_summary();
    let again = router.usage_summary();

    assert_eq!(router.usage(), &before);
    assert_eq!(summary, again);
    assert!(summary.starts_with("# Model Usage Summary"));
    assert!(summary.contains("$1.5000"));
}

#[test]
fn test_enforcer_policy() {
    let enforcer = TierEnforcer::new();

    assert!(enforcer.check(ToolCategory::ExternalApi, SecurityTier::GeneralLlm).is_ok());
    assert!(enforcer.check(ToolCategory::ExternalApi, SecurityTier::ConfidentialFab).is_err());
    assert!(enforcer.check(ToolCategory::ExternalApi, SecurityTier::TopSecret).is_err());
    for tier in SecurityTier::ALL {
        assert!(enforcer.check(ToolCategory::LocalTool, tier).is_ok());
    }

    // Independent sets, not a single restriction scale
    assert!(enforcer.check(ToolCategory::FactoryApi, SecurityTier::GeneralLlm).is_err());
    assert!(enforcer.check(ToolCategory::KnowledgeGraph, SecurityTier::TopSecret).is_err());
    assert!(enforcer.check(ToolCategory::KnowledgeGraph, SecurityTier::ConfidentialFab).is_ok());
}

#[test]
fn test_designated_provider_passes_its_own_tier_only() {
    let enforcer = TierEnforcer::new();
    for tier in SecurityTier::ALL {
        for provider in [Provider::Anthropic, Provider::Factory, Provider::OnPrem] {
            let allowed = enforcer.check(provider.category(), tier).is_ok();
            assert_eq!(allowed, provider == designated_provider(tier), "{provider} in {tier}");
        }
    }
}
