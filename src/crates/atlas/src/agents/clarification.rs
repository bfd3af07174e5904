//! Stage 1: ask the questions that close the gaps in the narrative.

use super::narrative::NarrativeFindings;
use super::parse::{bullet_list, parse_json};
use super::{Agent, AgentInput, AgentOutput, EightDPhase, Extraction, Stage};
use crate::mode::ProblemMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What the clarification stage knows about the narrative.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClarificationContext {
    pub narrative: String,
    pub observations: Vec<String>,
    pub suspected_causes: Vec<String>,
    pub data_sources: Vec<String>,
    pub urgency_signals: Vec<String>,
    pub constraints: Vec<String>,
}

impl ClarificationContext {
    /// Built from the narrative stage. Observations and causes come from the
    /// stage facts and hypotheses, so a degraded narrative still passes its
    /// marker along.
    pub fn from_narrative(narrative: &str, output: &AgentOutput<NarrativeFindings>) -> Self {
        let findings = output.parsed().cloned().unwrap_or_default();
        Self {
            narrative: narrative.to_string(),
            observations: output.facts.clone(),
            suspected_causes: output.hypotheses.clone(),
            data_sources: findings.data_sources_mentioned,
            urgency_signals: findings.urgency_signals,
            constraints: findings.constraints,
        }
    }
}

/// A question for the engineer and why it matters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawQuestion")]
pub struct ClarifyingQuestion {
    pub question: String,
    pub rationale: String,
}

impl ClarifyingQuestion {
    pub fn new(question: impl Into<String>, rationale: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            rationale: rationale.into(),
        }
    }
}

/// Models return questions either as bare strings or as objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawQuestion {
    Text(String),
    Detailed {
        question: String,
        #[serde(default)]
        rationale: String,
    },
}

impl From<RawQuestion> for ClarifyingQuestion {
    fn from(raw: RawQuestion) -> Self {
        match raw {
            RawQuestion::Text(question) => ClarifyingQuestion::new(question, ""),
            RawQuestion::Detailed { question, rationale } => ClarifyingQuestion::new(question, rationale),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClarificationFindings {
    pub questions: Vec<ClarifyingQuestion>,
    /// Overall reasoning behind the question set
    pub rationale: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClarificationAgent;

fn mode_questions(mode: ProblemMode) -> &'static str {
    match mode {
        ProblemMode::Excursion => {
            "For an EXCURSION, make sure the questions establish:\n\
             - WHEN: first bad lot or wafer, and the last known good one\n\
             - WHERE: affected tools, chambers, products, layers, wafer zones\n\
             - BASELINE: normal values and the current deviation\n\
             - WHAT CHANGED: PMs, recipes, consumables, incoming material\n\
             - CONTAINMENT: what is on hold and what is still running\n\
             - URGENCY: customer or line impact driving the timeline"
        }
        ProblemMode::Improvement => {
            "For YIELD IMPROVEMENT, make sure the questions establish:\n\
             - HOW LONG the loss has existed and whether it is trending\n\
             - HOW WIDESPREAD it is across tools, products and lots\n\
             - VARIABILITY: tool-to-tool, lot-to-lot, within-wafer\n\
             - ROOT CAUSES already investigated and ruled out\n\
             - BASELINE capability: current yield, Cp/Cpk, defect density\n\
             - GOAL: the target and the value of reaching it"
        }
        ProblemMode::Operations => {
            "For OPERATIONS troubleshooting, make sure the questions establish:\n\
             - BLOCKING: what exactly is stopped or slowed\n\
             - URGENCY: WIP at risk, due dates, hot lots\n\
             - IMPACT: throughput, cycle time, utilization numbers\n\
             - WORKAROUNDS: what is being done today and what it costs\n\
             - ROOT CAUSE: recurring failure modes or known weak points\n\
             - PREVENTION: what would stop this from coming back"
        }
    }
}

impl Agent for ClarificationAgent {
    type Context = ClarificationContext;
    type Findings = ClarificationFindings;

    fn stage(&self) -> Stage {
        Stage::Clarification
    }

    fn build_prompt(&self, input: &AgentInput<ClarificationContext>) -> String {
        let ctx = &input.context;
        format!(
            r#"You are preparing a semiconductor root cause investigation ({label}). Before analysis starts, ask the engineer the questions whose answers would most change the investigation.

Engineer's description:
"""
{narrative}
"""

Observations so far:
{observations}

Suspected causes:
{causes}

Data sources mentioned:
{sources}

Urgency signals:
{urgency}

Constraints:
{constraints}

{mode_questions}

Also cover, where still unknown:
- Scope: how many tools, lots and products are affected
- Baseline: what normal looks like and when it was last seen
- Data: which SPC, FDC, metrology or MES data exists and who can pull it
- Context: recent changes, similar past incidents, related alarms

Ask between 5 and 10 specific questions. Skip anything the description already answers. Each question needs a one-line rationale.

Respond with JSON only:
{{
  "questions": [
    {{"question": "...", "rationale": "..."}}
  ],
  "rationale": "Why these questions matter most"
}}"#,
            label = input.mode.label(),
            narrative = ctx.narrative.trim(),
            observations = bullet_list(&ctx.observations),
            causes = bullet_list(&ctx.suspected_causes),
            sources = bullet_list(&ctx.data_sources),
            urgency = bullet_list(&ctx.urgency_signals),
            constraints = bullet_list(&ctx.constraints),
            mode_questions = mode_questions(input.mode),
        )
    }

    fn parse(&self, raw: &str) -> Result<Extraction<ClarificationFindings>, String> {
        let mut findings: ClarificationFindings = parse_json(raw)?;
        findings.questions.retain(|q| !q.question.trim().is_empty());

        Ok(Extraction {
            facts: Vec::new(),
            hypotheses: Vec::new(),
            phases: BTreeSet::from([EightDPhase::D1, EightDPhase::D2]),
            findings,
        })
    }
}
