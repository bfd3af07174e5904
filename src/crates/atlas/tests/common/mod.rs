//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use atlas::router::ModelConfig;
use atlas::{
    CostMode, FixedAnswers, Invocation, ModelInvoker, ModelRouter, Orchestrator, Provider,
    TierEnforcer, WorkflowOptions,
};
use llm::LlmError;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

pub const NARRATIVE_REPLY: &str = r#"{
  "observations": ["Etch rate on ETCH-07 down 8% since Tuesday", "First wafers after PM worst"],
  "interpretations": ["Chamber condition changed during PM"],
  "constraints": ["Tool must stay qualified for hot lots"],
  "urgency_signals": ["Three hot lots queued"],
  "data_sources_mentioned": ["SPC chart ER-07", "PM log"],
  "suspected_causes": ["Seasoning skipped after PM"],
  "reflection": "Etch rate dropped after Tuesday's PM on ETCH-07."
}"#;

pub const CLARIFICATION_REPLY: &str = r#"```json
{
  "questions": [
    {"question": "When was the last lot within spec?", "rationale": "Bounds the excursion window"},
    {"question": "Was the seasoning recipe run after the PM?", "rationale": "Tests the leading hypothesis"},
    "Are other chambers of the same type affected?"
  ],
  "rationale": "Scope and timeline first"
}
```"#;

pub const ANALYSIS_REPLY: &str = r#"{
  "phases": [
    {"phase": "D2", "title": "Problem Definition", "findings": ["8% etch rate drop on ETCH-07 chamber B"], "confidence": "high"},
    {"phase": "D3", "title": "Containment", "findings": ["Lots after PM on hold"], "recommendations": ["Route hot lots to ETCH-05"], "confidence": "high"},
    {"phase": "D4", "title": "Root Cause", "findings": ["Seasoning recipe not run after PM"], "confidence": "medium"}
  ],
  "facts": ["PM completed Tuesday 14:00", "No seasoning record in MES"],
  "hypotheses": ["Unseasoned chamber walls absorb radicals"],
  "gaps": ["No OES trace for first wafers"],
  "next_steps": ["Run seasoning and re-measure"]
}"#;

pub const PREVENTION_REPLY: &str = r#"{
  "permanent_actions": [
    {"action": "Add seasoning as a required PM checklist step", "rationale": "Removes the skipped step", "owner": "Etch PE", "timeline": "1 week"}
  ],
  "systemic_prevention": [
    {"change": "MES interlock blocking release without seasoning record", "scope": "Tool type", "benefits": "No unseasoned release", "risks": "Delays when MES is down"}
  ],
  "lessons_learned": ["PM checklists must cover post-PM conditioning"],
  "knowledge_base_updates": [{"document": "SOP-ETCH-014", "update_needed": "Add seasoning step", "priority": "high"}],
  "follow_up_items": [{"item": "Audit other etch PM checklists", "owner": "Module lead", "deadline": "2 weeks"}]
}"#;

/// One scripted reply: text plus token counts, or an error.
pub enum Scripted {
    Reply { text: String, input_tokens: u64, output_tokens: u64 },
    Fail(LlmError),
}

impl Scripted {
    pub fn reply(text: &str, input_tokens: u64, output_tokens: u64) -> Self {
        Scripted::Reply {
            text: text.to_string(),
            input_tokens,
            output_tokens,
        }
    }
}

/// Invoker that replays a fixed queue of replies and records each call.
pub struct ScriptedInvoker {
    provider: Provider,
    script: Mutex<VecDeque<Scripted>>,
    prompts: Mutex<Vec<String>>,
    models: Mutex<Vec<String>>,
}

impl ScriptedInvoker {
    pub fn new(provider: Provider, script: Vec<Scripted>) -> Self {
        Self {
            provider,
            script: Mutex::new(script.into()),
            prompts: Mutex::new(Vec::new()),
            models: Mutex::new(Vec::new()),
        }
    }

    /// Well-formed replies for all four stages.
    pub fn happy_path(provider: Provider) -> Self {
        Self::new(
            provider,
            vec![
                Scripted::reply(NARRATIVE_REPLY, 1200, 400),
                Scripted::reply(CLARIFICATION_REPLY, 1500, 300),
                Scripted::reply(ANALYSIS_REPLY, 4000, 2500),
                Scripted::reply(PREVENTION_REPLY, 3000, 1800),
            ],
        )
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn models(&self) -> Vec<String> {
        self.models.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelInvoker for ScriptedInvoker {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn invoke(
        &self,
        prompt: &str,
        config: &ModelConfig,
        _max_tokens: usize,
    ) -> Result<Invocation, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.models.lock().unwrap().push(config.model_id.clone());

        match self.script.lock().unwrap().pop_front() {
            Some(Scripted::Reply {
                text,
                input_tokens,
                output_tokens,
            }) => Ok(Invocation {
                text,
                input_tokens,
                output_tokens,
            }),
            Some(Scripted::Fail(err)) => Err(err),
            None => Err(LlmError::Other("script exhausted".to_string())),
        }
    }
}

pub fn orchestrator(invoker: Arc<ScriptedInvoker>, cost_mode: CostMode, options: WorkflowOptions) -> Orchestrator {
    Orchestrator::new(ModelRouter::new(cost_mode), invoker, TierEnforcer::new(), options)
}

pub fn fixed_answers(pairs: &[(&str, &str)]) -> FixedAnswers {
    let answers: BTreeMap<String, String> = pairs
        .iter()
        .map(|(q, a)| (q.to_string(), a.to_string()))
        .collect();
    FixedAnswers::new(answers)
}
