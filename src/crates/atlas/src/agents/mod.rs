//! The four RCA stages and the protocol they share.
//!
//! Every stage runs the same fixed sequence in [`execute`]:
//!
//! 1. Check the invoker's provider category against the active tier
//! 2. Resolve a route through the [`ModelRouter`]
//! 3. Build the stage prompt
//! 4. Invoke the model (with optional retry)
//! 5. Track usage, exactly once
//! 6. Parse the reply, degrading instead of failing when it is not valid JSON
//!
//! Only a tier violation or an invocation failure turns into an error.

pub mod analysis;
pub mod clarification;
pub mod narrative;
pub mod parse;
pub mod phases;
pub mod prevention;

pub use analysis::{AnalysisAgent, AnalysisContext, AnalysisFindings, PhaseFinding};
pub use clarification::{ClarificationAgent, ClarificationContext, ClarificationFindings, ClarifyingQuestion};
pub use narrative::{NarrativeAgent, NarrativeContext, NarrativeFindings};
pub use phases::{extract_phases, EightDPhase};
pub use prevention::{
    FollowUpItem, KnowledgeBaseUpdate, PermanentAction, PreventionAgent, PreventionContext,
    PreventionFindings, SystemicChange,
};

use crate::error::{AtlasError, Result};
use crate::executor::{with_retry, ModelInvoker, RetryConfig};
use crate::mode::ProblemMode;
use crate::router::{ModelRouter, Provider, TaskType};
use crate::security::{SecurityTier, TierEnforcer};
use async_trait::async_trait;
use llm::LlmError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info, warn};

/// One of the four ordered stages of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Narrative,
    Clarification,
    Analysis,
    Prevention,
}

impl Stage {
    /// Execution order.
    pub const ALL: [Stage; 4] = [
        Stage::Narrative,
        Stage::Clarification,
        Stage::Analysis,
        Stage::Prevention,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Narrative => "narrative",
            Stage::Clarification => "clarification",
            Stage::Analysis => "analysis",
            Stage::Prevention => "prevention",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Narrative => "Narrative",
            Stage::Clarification => "Clarification",
            Stage::Analysis => "Analysis",
            Stage::Prevention => "Prevention",
        }
    }

    pub fn task_type(&self) -> TaskType {
        match self {
            Stage::Narrative | Stage::Clarification => TaskType::Reasoning,
            Stage::Analysis => TaskType::DeepAnalysis,
            Stage::Prevention => TaskType::Synthesis,
        }
    }

    /// Output token budget requested for the stage. The route's own limit
    /// still caps it.
    pub fn max_tokens(&self) -> usize {
        match self {
            Stage::Narrative | Stage::Clarification => 2000,
            Stage::Analysis => 8000,
            Stage::Prevention => 4000,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Input to one stage call.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentInput<C> {
    pub mode: ProblemMode,
    pub tier: SecurityTier,
    pub context: C,
}

impl<C> AgentInput<C> {
    pub fn new(mode: ProblemMode, tier: SecurityTier, context: C) -> Self {
        Self { mode, tier, context }
    }
}

/// Structured result of a stage, or the marker explaining why there is none.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageFindings<F> {
    Parsed(F),
    Degraded { marker: String },
}

impl<F> StageFindings<F> {
    pub fn parsed(&self) -> Option<&F> {
        match self {
            StageFindings::Parsed(findings) => Some(findings),
            StageFindings::Degraded { .. } => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, StageFindings::Degraded { .. })
    }

    pub fn marker(&self) -> Option<&str> {
        match self {
            StageFindings::Parsed(_) => None,
            StageFindings::Degraded { marker } => Some(marker),
        }
    }
}

/// What a stage pulls out of a well-formed reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction<F> {
    pub facts: Vec<String>,
    pub hypotheses: Vec<String>,
    pub phases: BTreeSet<EightDPhase>,
    pub findings: F,
}

/// Result of one stage call.
#[derive(Debug, Clone, Serialize)]
pub struct AgentOutput<F> {
    pub stage: Stage,
    /// Unparsed model reply
    pub content: String,
    pub facts: Vec<String>,
    pub hypotheses: Vec<String>,
    pub findings: StageFindings<F>,
    pub phases_addressed: BTreeSet<EightDPhase>,
    pub provider: Provider,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost: f64,
}

impl<F> AgentOutput<F> {
    pub fn parsed(&self) -> Option<&F> {
        self.findings.parsed()
    }

    pub fn is_degraded(&self) -> bool {
        self.findings.is_degraded()
    }
}

/// Collaborators a stage call borrows from the orchestrator.
pub struct AgentRuntime<'a> {
    pub router: &'a mut ModelRouter,
    pub invoker: &'a dyn ModelInvoker,
    pub enforcer: &'a TierEnforcer,
    pub retry: &'a RetryConfig,
}

/// One RCA stage.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Stage-specific context this stage reads.
    type Context: Send + Sync;

    /// Structured result of a successful parse.
    type Findings: Send;

    fn stage(&self) -> Stage;

    fn task_type(&self) -> TaskType {
        self.stage().task_type()
    }

    fn max_tokens(&self) -> usize {
        self.stage().max_tokens()
    }

    /// Deterministic in `input`; each problem mode yields a different prompt.
    fn build_prompt(&self, input: &AgentInput<Self::Context>) -> String;

    /// Parse a raw reply. `Err` carries the reason for the degraded marker.
    fn parse(&self, raw: &str) -> std::result::Result<Extraction<Self::Findings>, String>;

    async fn run(
        &self,
        input: &AgentInput<Self::Context>,
        runtime: &mut AgentRuntime<'_>,
    ) -> Result<AgentOutput<Self::Findings>> {
        execute(self, input, runtime).await
    }
}

/// The shared stage protocol.
pub async fn execute<A>(
    agent: &A,
    input: &AgentInput<A::Context>,
    runtime: &mut AgentRuntime<'_>,
) -> Result<AgentOutput<A::Findings>>
where
    A: Agent + ?Sized,
{
    let stage = agent.stage();
    let task = agent.task_type();
    let provider = runtime.invoker.provider();

    if let Err(violation) = runtime.enforcer.check(provider.category(), input.tier) {
        warn!(stage = %stage, tier = %input.tier, provider = %provider, "Provider blocked by tier policy");
        return Err(violation.into());
    }

    let cost_mode = runtime.router.cost_mode();
    let config = runtime.router.resolve(task, input.tier, cost_mode);
    if config.provider != provider {
        return Err(AtlasError::Config(format!(
            "route for {} at tier {} targets provider '{}' but the invoker fronts '{}'",
            task, input.tier, config.provider, provider
        )));
    }

    let prompt = agent.build_prompt(input);
    debug!(stage = %stage, mode = %input.mode, prompt_chars = prompt.len(), "Built stage prompt");

    let max_tokens = agent.max_tokens();
    let invoker = runtime.invoker;
    let prompt_ref = prompt.as_str();
    let config_ref = &config;
    let invocation = with_retry(
        runtime.retry,
        stage.as_str(),
        move || invoker.invoke(prompt_ref, config_ref, max_tokens),
        LlmError::is_retryable,
    )
    .await
    .map_err(|source| AtlasError::Invocation { stage, source })?;

    let cost = runtime.router.track_usage(
        task,
        &config,
        invocation.input_tokens,
        invocation.output_tokens,
    );

    let (facts, hypotheses, findings, phases_addressed) = match agent.parse(&invocation.text) {
        Ok(extraction) => (
            extraction.facts,
            extraction.hypotheses,
            StageFindings::Parsed(extraction.findings),
            extraction.phases,
        ),
        Err(reason) => {
            let marker = format!("[PARSE ERROR] {} response was not valid JSON: {}", stage, reason);
            warn!(stage = %stage, model = %config.model_id, reason = %reason, "Degraded stage output");
            (
                vec![marker.clone()],
                Vec::new(),
                StageFindings::Degraded { marker },
                BTreeSet::new(),
            )
        }
    };

    info!(
        stage = %stage,
        model = %config.model_id,
        input_tokens = invocation.input_tokens,
        output_tokens = invocation.output_tokens,
        cost,
        degraded = findings.is_degraded(),
        "Stage complete"
    );

    Ok(AgentOutput {
        stage,
        content: invocation.text,
        facts,
        hypotheses,
        findings,
        phases_addressed,
        provider: config.provider,
        model: config.model_id,
        input_tokens: invocation.input_tokens,
        output_tokens: invocation.output_tokens,
        cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Invocation;
    use crate::router::{CostMode, ModelConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct CannedInvoker {
        provider: Provider,
        reply: String,
        calls: AtomicUsize,
        error: Mutex<Option<LlmError>>,
    }

    impl CannedInvoker {
        fn new(provider: Provider, reply: &str) -> Self {
            Self {
                provider,
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
                error: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl ModelInvoker for CannedInvoker {
        fn provider(&self) -> Provider {
            self.provider
        }

        async fn invoke(
            &self,
            _prompt: &str,
            _config: &ModelConfig,
            _max_tokens: usize,
        ) -> std::result::Result<Invocation, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.error.lock().unwrap().take() {
                return Err(err);
            }
            Ok(Invocation {
                text: self.reply.clone(),
                input_tokens: 1000,
                output_tokens: 1000,
            })
        }
    }

    fn narrative_input(tier: SecurityTier) -> AgentInput<NarrativeContext> {
        AgentInput::new(
            ProblemMode::Excursion,
            tier,
            NarrativeContext::new("Etch rate on ETCH-07 dropped 8% after PM."),
        )
    }

    #[test]
    fn test_stage_table() {
        assert_eq!(Stage::Narrative.task_type(), TaskType::Reasoning);
        assert_eq!(Stage::Clarification.task_type(), TaskType::Reasoning);
        assert_eq!(Stage::Analysis.task_type(), TaskType::DeepAnalysis);
        assert_eq!(Stage::Prevention.task_type(), TaskType::Synthesis);
        assert_eq!(Stage::Analysis.max_tokens(), 8000);
        assert_eq!(Stage::Prevention.to_string(), "Prevention");
    }

    #[tokio::test]
    async fn test_parse_failure_degrades_and_still_tracks_cost() {
        let invoker = CannedInvoker::new(Provider::Anthropic, "I'm not able to produce JSON today.");
        let mut router = ModelRouter::new(CostMode::Dev);
        let enforcer = TierEnforcer::new();
        let retry = RetryConfig::default();
        let mut runtime = AgentRuntime {
            router: &mut router,
            invoker: &invoker,
            enforcer: &enforcer,
            retry: &retry,
        };

        let output = NarrativeAgent
            .run(&narrative_input(SecurityTier::GeneralLlm), &mut runtime)
            .await
            .unwrap();

        assert!(output.is_degraded());
        assert_eq!(output.facts.len(), 1);
        assert!(output.facts[0].starts_with("[PARSE ERROR] Narrative"));
        assert!(output.hypotheses.is_empty());
        assert!(output.phases_addressed.is_empty());
        assert_eq!(output.content, "I'm not able to produce JSON today.");
        assert!(output.cost > 0.0);
        assert_eq!(router.usage().total_calls(), 1);
        assert!((router.usage().total_cost() - output.cost).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_violation_blocks_before_invocation() {
        let invoker = CannedInvoker::new(Provider::Anthropic, "{}");
        let mut router = ModelRouter::new(CostMode::Dev);
        let enforcer = TierEnforcer::new();
        let retry = RetryConfig::default();
        let mut runtime = AgentRuntime {
            router: &mut router,
            invoker: &invoker,
            enforcer: &enforcer,
            retry: &retry,
        };

        let err = NarrativeAgent
            .run(&narrative_input(SecurityTier::TopSecret), &mut runtime)
            .await
            .unwrap_err();

        assert!(matches!(err, AtlasError::SecurityViolation(_)));
        assert_eq!(invoker.calls.load(Ordering::SeqCst), 0);
        assert_eq!(router.usage().total_calls(), 0);
    }

    #[tokio::test]
    async fn test_invocation_failure_names_stage_and_tracks_nothing() {
        let invoker = CannedInvoker::new(Provider::Factory, "{}");
        *invoker.error.lock().unwrap() = Some(LlmError::ServiceUnavailable("gateway down".into()));
        let mut router = ModelRouter::new(CostMode::Runtime);
        let enforcer = TierEnforcer::new();
        let retry = RetryConfig::default();
        let mut runtime = AgentRuntime {
            router: &mut router,
            invoker: &invoker,
            enforcer: &enforcer,
            retry: &retry,
        };

        let err = NarrativeAgent
            .run(&narrative_input(SecurityTier::ConfidentialFab), &mut runtime)
            .await
            .unwrap_err();

        assert!(matches!(err, AtlasError::Invocation { stage: Stage::Narrative, .. }));
        assert_eq!(router.usage().total_calls(), 0);
    }
}
