//! Stage 0: make sense of the engineer's own account of the problem.

use super::parse::parse_json;
use super::{Agent, AgentInput, EightDPhase, Extraction, Stage};
use crate::mode::ProblemMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NarrativeContext {
    pub narrative: String,
}

impl NarrativeContext {
    pub fn new(narrative: impl Into<String>) -> Self {
        Self {
            narrative: narrative.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrativeFindings {
    /// What the engineer actually saw
    pub observations: Vec<String>,
    /// What they think it means
    pub interpretations: Vec<String>,
    pub constraints: Vec<String>,
    pub urgency_signals: Vec<String>,
    pub data_sources_mentioned: Vec<String>,
    pub suspected_causes: Vec<String>,
    /// Plain-language summary to read back to the engineer
    pub reflection: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NarrativeAgent;

fn mode_focus(mode: ProblemMode) -> &'static str {
    match mode {
        ProblemMode::Excursion => {
            "This is an EXCURSION: something deviated recently and material may still be at risk.\n\
             Pay particular attention to:\n\
             - When the deviation started and how it was detected (SPC alarm, inline metrology, yield)\n\
             - Which tools, chambers, lots, wafers or layers are affected\n\
             - Recent changes: PMs, recipe edits, consumable swaps, new material lots\n\
             - Whether wafers are still being processed on the suspect path"
        }
        ProblemMode::Improvement => {
            "This is a YIELD IMPROVEMENT problem: a chronic loss the engineer wants to engineer away.\n\
             Pay particular attention to:\n\
             - How long the loss has persisted and how large it is\n\
             - Baselines and targets (yield, Cp/Cpk, defect density)\n\
             - Variability across tools, products and time\n\
             - Experiments or fixes already tried and what they showed"
        }
        ProblemMode::Operations => {
            "This is an OPERATIONS problem: something is slowing or blocking fab flow.\n\
             Pay particular attention to:\n\
             - What is blocked: tools down, lots on hold, dispatch or WIP issues\n\
             - Throughput, cycle time or delivery impact\n\
             - Workarounds currently in place and their cost\n\
             - Whether this is a one-off or a recurring pattern"
        }
    }
}

impl Agent for NarrativeAgent {
    type Context = NarrativeContext;
    type Findings = NarrativeFindings;

    fn stage(&self) -> Stage {
        Stage::Narrative
    }

    fn build_prompt(&self, input: &AgentInput<NarrativeContext>) -> String {
        let narrative = input.context.narrative.trim();
        let narrative = if narrative.is_empty() {
            "(the engineer did not provide a description)"
        } else {
            narrative
        };

        format!(
            r#"You are a senior semiconductor process engineer helping a colleague structure a problem for root cause analysis.

Problem mode: {label}

{focus}

The engineer described the problem in their own words:

"""
{narrative}
"""

Separate what they observed from what they concluded. Do not invent details they did not state.

Extract:
1. Observations: concrete, measurable things they saw (values, trends, alarms, counts)
2. Interpretations: conclusions or opinions they drew from those observations
3. Constraints: limits on the investigation (time, access, production commitments)
4. Urgency signals: anything that indicates how fast this must be resolved
5. Data sources mentioned: SPC charts, FDC traces, metrology, logs, MES history
6. Suspected causes: causes the engineer already suspects

Then write a short reflection that restates the problem back to the engineer so they can confirm you understood it.

Respond with JSON only:
{{
  "observations": ["..."],
  "interpretations": ["..."],
  "constraints": ["..."],
  "urgency_signals": ["..."],
  "data_sources_mentioned": ["..."],
  "suspected_causes": ["..."],
  "reflection": "Here is what I understood: ..."
}}"#,
            label = input.mode.label(),
            focus = mode_focus(input.mode),
            narrative = narrative,
        )
    }

    fn parse(&self, raw: &str) -> Result<Extraction<NarrativeFindings>, String> {
        let findings: NarrativeFindings = parse_json(raw)?;
        Ok(Extraction {
            facts: findings.observations.clone(),
            hypotheses: findings.suspected_causes.clone(),
            phases: BTreeSet::from([EightDPhase::D0]),
            findings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::SecurityTier;

    fn input(mode: ProblemMode, narrative: &str) -> AgentInput<NarrativeContext> {
        AgentInput::new(mode, SecurityTier::GeneralLlm, NarrativeContext::new(narrative))
    }

    #[test]
    fn test_prompt_contains_narrative_and_mode() {
        let prompt = NarrativeAgent.build_prompt(&input(ProblemMode::Excursion, "CD shift on layer M2"));
        assert!(prompt.contains("CD shift on layer M2"));
        assert!(prompt.contains("EXCURSION"));
    }

    #[test]
    fn test_prompt_differs_by_mode() {
        let prompts: BTreeSet<String> = ProblemMode::ALL
            .iter()
            .map(|mode| NarrativeAgent.build_prompt(&input(*mode, "same text")))
            .collect();
        assert_eq!(prompts.len(), 3);
    }

    #[test]
    fn test_prompt_handles_empty_narrative() {
        let prompt = NarrativeAgent.build_prompt(&input(ProblemMode::Operations, "   "));
        assert!(prompt.contains("did not provide a description"));
    }

    #[test]
    fn test_parse_maps_observations_and_causes() {
        let raw = r#"```json
{
  "observations": ["Etch rate down 8% on ETCH-07", "Started after PM on Tuesday"],
  "suspected_causes": ["Chamber seasoning incomplete"],
  "urgency_signals": ["Hot lots waiting"],
  "reflection": "Etch rate dropped after PM."
}
```"#;
        let extraction = NarrativeAgent.parse(raw).unwrap();

        assert_eq!(extraction.facts.len(), 2);
        assert_eq!(extraction.hypotheses, vec!["Chamber seasoning incomplete"]);
        assert_eq!(extraction.phases, BTreeSet::from([EightDPhase::D0]));
        assert!(extraction.findings.interpretations.is_empty());
        assert_eq!(extraction.findings.urgency_signals, vec!["Hot lots waiting"]);
    }

    #[test]
    fn test_parse_rejects_prose() {
        assert!(NarrativeAgent.parse("The etch rate dropped.").is_err());
    }
}
