//! Workflow orchestrator
//!
//! Drives one RCA run through its fixed stage sequence:
//!
//! ```text
//! START -> NARRATIVE_DONE -> CLARIFICATION_DONE -> ANALYSIS_DONE -> PREVENTION_DONE -> COMPLETE
//! ```
//!
//! Stages run strictly in sequence. The only wait on a person is answer
//! collection after clarification. A degraded stage is carried forward; a
//! tier violation or invocation failure ends the run with no partial result.

pub mod collector;
pub mod result;
pub mod state;

pub use collector::{is_skip, AnswerCollector, Answers, FixedAnswers, StdinCollector};
pub use result::{StageSummary, WorkflowResult};
pub use state::WorkflowState;

use crate::agents::{
    Agent, AgentInput, AgentRuntime, AnalysisAgent, AnalysisContext, ClarificationAgent,
    ClarificationContext, NarrativeAgent, NarrativeContext, PreventionAgent, PreventionContext,
};
use crate::config::AtlasConfig;
use crate::error::Result;
use crate::executor::{ModelInvoker, RetryConfig};
use crate::mode::ProblemMode;
use crate::router::ModelRouter;
use crate::security::{SecurityTier, TierEnforcer};
use chrono::Utc;
use result::RunInfo;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Knobs for the two points the pipeline leaves open: how long to wait for
/// answers and whether to retry a failed model call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowOptions {
    /// `None` waits for the collector indefinitely.
    pub collect_timeout: Option<Duration>,
    pub retry: RetryConfig,
}

impl WorkflowOptions {
    pub fn from_config(config: &AtlasConfig) -> Self {
        Self {
            collect_timeout: config.workflow.collect_timeout(),
            retry: config.workflow.retry_config(),
        }
    }

    pub fn with_collect_timeout(mut self, timeout: Duration) -> Self {
        self.collect_timeout = Some(timeout);
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Validate string run parameters before anything runs.
pub fn parse_run_params(mode: &str, tier: &str) -> Result<(ProblemMode, SecurityTier)> {
    Ok((mode.parse()?, tier.parse()?))
}

/// Runs workflows against one router, invoker and enforcer.
///
/// The router's usage counters accumulate across every run made through
/// this orchestrator. Give concurrent runs their own orchestrator.
pub struct Orchestrator {
    router: ModelRouter,
    invoker: Arc<dyn ModelInvoker>,
    enforcer: TierEnforcer,
    options: WorkflowOptions,
    state: WorkflowState,
}

impl Orchestrator {
    pub fn new(
        router: ModelRouter,
        invoker: Arc<dyn ModelInvoker>,
        enforcer: TierEnforcer,
        options: WorkflowOptions,
    ) -> Self {
        Self {
            router,
            invoker,
            enforcer,
            options,
            state: WorkflowState::Start,
        }
    }

    pub fn router(&self) -> &ModelRouter {
        &self.router
    }

    pub fn usage_summary(&self) -> String {
        self.router.usage_summary()
    }

    /// State the most recent run reached.
    pub fn state(&self) -> WorkflowState {
        self.state
    }

    fn advance(&mut self, run_id: Uuid) {
        if let Some(next) = self.state.next() {
            match next.completed_stage() {
                Some(stage) => info!(run_id = %run_id, from = %self.state, to = %next, stage = %stage, "Workflow transition"),
                None => info!(run_id = %run_id, from = %self.state, to = %next, "Workflow transition"),
            }
            self.state = next;
        }
    }

    /// Run all four stages and fold them into a [`WorkflowResult`].
    pub async fn run_workflow(
        &mut self,
        narrative: &str,
        mode: ProblemMode,
        tier: SecurityTier,
        collector: &dyn AnswerCollector,
    ) -> Result<WorkflowResult> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let cost_mode = self.router.cost_mode();
        let mut errors = Vec::new();
        self.state = WorkflowState::Start;

        info!(
            run_id = %run_id,
            mode = %mode,
            tier = %tier,
            cost_mode = %cost_mode,
            narrative_chars = narrative.len(),
            "Starting RCA workflow"
        );

        let invoker = Arc::clone(&self.invoker);

        let narrative_out = {
            let mut runtime = self.runtime(invoker.as_ref());
            let input = AgentInput::new(mode, tier, NarrativeContext::new(narrative));
            NarrativeAgent.run(&input, &mut runtime).await?
        };
        self.advance(run_id);

        let clarification_out = {
            let mut runtime = self.runtime(invoker.as_ref());
            let input = AgentInput::new(
                mode,
                tier,
                ClarificationContext::from_narrative(narrative, &narrative_out),
            );
            ClarificationAgent.run(&input, &mut runtime).await?
        };

        let questions = clarification_out
            .parsed()
            .map(|f| f.questions.clone())
            .unwrap_or_default();
        let answers = match self.options.collect_timeout {
            Some(limit) => match tokio::time::timeout(limit, collector.collect(&questions)).await {
                Ok(answers) => answers?,
                Err(_) => {
                    let message = format!(
                        "Clarification answers not received within {:?}; continuing without answers",
                        limit
                    );
                    warn!(run_id = %run_id, questions = questions.len(), "{}", message);
                    errors.push(message);
                    Answers::new()
                }
            },
            None => collector.collect(&questions).await?,
        };
        info!(run_id = %run_id, asked = questions.len(), answered = answers.len(), "Collected clarifications");
        self.advance(run_id);

        let analysis_out = {
            let mut runtime = self.runtime(invoker.as_ref());
            let input = AgentInput::new(
                mode,
                tier,
                AnalysisContext::new(narrative, &narrative_out, answers.clone()),
            );
            AnalysisAgent.run(&input, &mut runtime).await?
        };
        self.advance(run_id);

        let prevention_out = {
            let mut runtime = self.runtime(invoker.as_ref());
            let input = AgentInput::new(
                mode,
                tier,
                PreventionContext::from_analysis(narrative, &analysis_out),
            );
            PreventionAgent.run(&input, &mut runtime).await?
        };
        self.advance(run_id);

        let result = WorkflowResult::fold(
            RunInfo {
                run_id,
                mode,
                tier,
                cost_mode,
                started_at,
                errors,
            },
            narrative_out,
            clarification_out,
            answers,
            analysis_out,
            prevention_out,
        );
        self.advance(run_id);

        info!(
            run_id = %run_id,
            total_cost = result.total_cost,
            phases = result.phases_addressed.len(),
            degraded = result.degraded_stages().len(),
            "RCA workflow complete"
        );

        Ok(result)
    }

    fn runtime<'a>(&'a mut self, invoker: &'a dyn ModelInvoker) -> AgentRuntime<'a> {
        AgentRuntime {
            router: &mut self.router,
            invoker,
            enforcer: &self.enforcer,
            retry: &self.options.retry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AtlasError;

    #[test]
    fn test_parse_run_params() {
        let (mode, tier) = parse_run_params("operations", "top_secret").unwrap();
        assert_eq!(mode, ProblemMode::Operations);
        assert_eq!(tier, SecurityTier::TopSecret);

        assert!(matches!(
            parse_run_params("panic", "general_llm"),
            Err(AtlasError::InvalidParameter(_))
        ));
        assert!(matches!(
            parse_run_params("excursion", "public"),
            Err(AtlasError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_options_from_config() {
        let mut config = AtlasConfig::default();
        config.workflow.collect_timeout_secs = Some(30);
        config.workflow.max_invocation_retries = 2;

        let options = WorkflowOptions::from_config(&config);

        assert_eq!(options.collect_timeout, Some(Duration::from_secs(30)));
        assert_eq!(options.retry.max_retries, 2);
        assert_eq!(WorkflowOptions::default().collect_timeout, None);
    }
}
