//! Stage 2: 8D root cause analysis.

use super::narrative::NarrativeFindings;
use super::parse::{bullet_list, parse_json};
use super::phases::extract_phases;
use super::{Agent, AgentInput, AgentOutput, EightDPhase, Extraction, Stage};
use crate::mode::ProblemMode;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

/// Everything known going into analysis: the narrative, what was extracted
/// from it, and the engineer's answers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisContext {
    pub narrative: String,
    pub observations: Vec<String>,
    pub suspected_causes: Vec<String>,
    pub constraints: Vec<String>,
    pub urgency_signals: Vec<String>,
    /// Question text to answer. Skipped questions are absent.
    pub answers: BTreeMap<String, String>,
}

impl AnalysisContext {
    /// Observations and causes are the narrative stage's facts and
    /// hypotheses, including a parse-failure marker if it degraded.
    pub fn new(
        narrative: &str,
        output: &AgentOutput<NarrativeFindings>,
        answers: BTreeMap<String, String>,
    ) -> Self {
        let findings = output.parsed().cloned().unwrap_or_default();
        Self {
            narrative: narrative.to_string(),
            observations: output.facts.clone(),
            suspected_causes: output.hypotheses.clone(),
            constraints: findings.constraints,
            urgency_signals: findings.urgency_signals,
            answers,
        }
    }
}

/// Findings for one 8D phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseFinding {
    /// Phase label as the model wrote it, e.g. "D4"
    pub phase: String,
    pub title: String,
    pub findings: Vec<String>,
    pub recommendations: Vec<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub confidence: String,
    pub data_sources: Vec<String>,
}

impl PhaseFinding {
    pub fn eight_d(&self) -> Option<EightDPhase> {
        self.phase.parse().ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisFindings {
    pub phases: Vec<PhaseFinding>,
    pub facts: Vec<String>,
    pub hypotheses: Vec<String>,
    /// Information still missing
    pub gaps: Vec<String>,
    pub next_steps: Vec<String>,
}

impl AnalysisFindings {
    fn phase_items(&self, phase: EightDPhase, with_recommendations: bool) -> Vec<String> {
        self.phases
            .iter()
            .filter(|p| p.eight_d() == Some(phase))
            .flat_map(|p| {
                let recs = if with_recommendations { &p.recommendations[..] } else { &[] };
                p.findings.iter().chain(recs.iter()).cloned()
            })
            .collect()
    }

    /// D4 findings.
    pub fn root_causes(&self) -> Vec<String> {
        self.phase_items(EightDPhase::D4, false)
    }

    /// D3 findings and recommendations.
    pub fn containment(&self) -> Vec<String> {
        self.phase_items(EightDPhase::D3, true)
    }

    /// D2 findings.
    pub fn problem_definition(&self) -> Vec<String> {
        self.phase_items(EightDPhase::D2, false)
    }

    /// Phases named in the reply, or keyword matches over the finding text
    /// when none of the labels parse.
    fn addressed_phases(&self) -> BTreeSet<EightDPhase> {
        let tagged: BTreeSet<EightDPhase> = self.phases.iter().filter_map(PhaseFinding::eight_d).collect();
        if !tagged.is_empty() {
            return tagged;
        }

        let text = self
            .phases
            .iter()
            .flat_map(|p| std::iter::once(&p.title).chain(&p.findings).chain(&p.recommendations))
            .cloned()
            .collect::<Vec<_>>()
            .join("\n");
        extract_phases(&text)
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::from("# 8D Analysis\n\n");
        for phase in &self.phases {
            let _ = writeln!(out, "## {}: {}\n", phase.phase, phase.title);
            if !phase.confidence.is_empty() {
                let _ = writeln!(out, "**Confidence:** {}\n", phase.confidence);
            }
            if !phase.findings.is_empty() {
                let _ = writeln!(out, "**Findings:**\n{}\n", bullet_list(&phase.findings));
            }
            if !phase.recommendations.is_empty() {
                let _ = writeln!(out, "**Recommendations:**\n{}\n", bullet_list(&phase.recommendations));
            }
        }
        if !self.gaps.is_empty() {
            let _ = writeln!(out, "## Information Gaps\n\n{}\n", bullet_list(&self.gaps));
        }
        if !self.next_steps.is_empty() {
            let _ = writeln!(out, "## Next Steps\n\n{}\n", bullet_list(&self.next_steps));
        }
        out
    }
}

/// Accept `"high"` or `0.8` for confidence.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Number(f64),
    }

    Ok(match Option::<Scalar>::deserialize(deserializer)? {
        Some(Scalar::Text(text)) => text,
        Some(Scalar::Number(n)) => n.to_string(),
        None => String::new(),
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AnalysisAgent;

fn mode_emphasis(mode: ProblemMode) -> &'static str {
    match mode {
        ProblemMode::Excursion => {
            "Mode: EXCURSION. Prioritize D3 containment of material at risk, then D4 root cause \
             of the specific deviation. Tie every hypothesis to the timeline of the excursion and \
             to what changed on the affected tools."
        }
        ProblemMode::Improvement => {
            "Mode: YIELD IMPROVEMENT. Prioritize D2 quantification of the chronic loss and D4 \
             analysis of its contributors by size. Favor hypotheses that explain variability \
             between tools, products or time periods, and propose experiments to separate them."
        }
        ProblemMode::Operations => {
            "Mode: OPERATIONS. Prioritize restoring flow: D3 workarounds with their cost, then D4 \
             causes of the downtime, queueing or dispatch issue. Quantify throughput and cycle \
             time impact wherever the data allows."
        }
    }
}

fn format_answers(answers: &BTreeMap<String, String>) -> String {
    if answers.is_empty() {
        return "(no clarifying answers were provided; work from the narrative alone)".to_string();
    }
    answers
        .iter()
        .map(|(question, answer)| format!("Q: {}\nA: {}", question, answer))
        .collect::<Vec<_>>()
        .join("\n\n")
}

impl Agent for AnalysisAgent {
    type Context = AnalysisContext;
    type Findings = AnalysisFindings;

    fn stage(&self) -> Stage {
        Stage::Analysis
    }

    fn build_prompt(&self, input: &AgentInput<AnalysisContext>) -> String {
        let ctx = &input.context;
        let phase_guide = EightDPhase::ALL
            .iter()
            .map(|p| format!("- {}: {}", p, p.title()))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"You are an expert in semiconductor failure analysis running an 8D root cause investigation.

{emphasis}

Engineer's description:
"""
{narrative}
"""

Observations:
{observations}

Suspected causes:
{causes}

Constraints:
{constraints}

Urgency signals:
{urgency}

Clarifications:
{answers}

8D phases:
{phase_guide}

Guidelines:
- Only address phases the evidence supports; not every phase applies yet
- Separate established facts from hypotheses
- State confidence for each phase as high, medium or low
- Name the data sources that support each finding
- List the information gaps that block a firm conclusion

Respond with JSON only:
{{
  "phases": [
    {{
      "phase": "D4",
      "title": "Root Cause Analysis",
      "findings": ["..."],
      "recommendations": ["..."],
      "confidence": "medium",
      "data_sources": ["..."]
    }}
  ],
  "facts": ["..."],
  "hypotheses": ["..."],
  "gaps": ["..."],
  "next_steps": ["..."]
}}"#,
            emphasis = mode_emphasis(input.mode),
            narrative = ctx.narrative.trim(),
            observations = bullet_list(&ctx.observations),
            causes = bullet_list(&ctx.suspected_causes),
            constraints = bullet_list(&ctx.constraints),
            urgency = bullet_list(&ctx.urgency_signals),
            answers = format_answers(&ctx.answers),
            phase_guide = phase_guide,
        )
    }

    fn parse(&self, raw: &str) -> Result<Extraction<AnalysisFindings>, String> {
        let findings: AnalysisFindings = parse_json(raw)?;
        Ok(Extraction {
            facts: findings.facts.clone(),
            hypotheses: findings.hypotheses.clone(),
            phases: findings.addressed_phases(),
            findings,
        })
    }
}
