//! Stage 3: permanent corrective actions, systemic prevention and lessons
//! learned (D5, D7, D8).

use super::analysis::AnalysisFindings;
use super::parse::{bullet_list, parse_json};
use super::{Agent, AgentInput, AgentOutput, EightDPhase, Extraction, Stage};
use crate::mode::ProblemMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Write as _;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreventionContext {
    pub narrative: String,
    pub problem_definition: Vec<String>,
    pub root_causes: Vec<String>,
    pub containment: Vec<String>,
    pub gaps: Vec<String>,
    pub facts: Vec<String>,
    pub hypotheses: Vec<String>,
}

impl PreventionContext {
    /// Built from the analysis stage. A degraded analysis contributes only
    /// its marker fact.
    pub fn from_analysis(narrative: &str, output: &AgentOutput<AnalysisFindings>) -> Self {
        let mut ctx = Self {
            narrative: narrative.to_string(),
            facts: output.facts.clone(),
            hypotheses: output.hypotheses.clone(),
            ..Default::default()
        };
        if let Some(findings) = output.parsed() {
            ctx.problem_definition = findings.problem_definition();
            ctx.root_causes = findings.root_causes();
            ctx.containment = findings.containment();
            ctx.gaps = findings.gaps.clone();
        }
        ctx
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermanentAction {
    pub action: String,
    pub rationale: String,
    pub owner: String,
    pub timeline: String,
    pub success_metrics: String,
    pub implementation_steps: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemicChange {
    pub change: String,
    /// Single tool, tool type or whole fab
    pub scope: String,
    pub implementation: String,
    pub benefits: String,
    pub risks: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseUpdate {
    pub document: String,
    pub update_needed: String,
    pub priority: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowUpItem {
    pub item: String,
    pub owner: String,
    pub deadline: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreventionFindings {
    pub permanent_actions: Vec<PermanentAction>,
    pub systemic_prevention: Vec<SystemicChange>,
    pub lessons_learned: Vec<String>,
    pub knowledge_base_updates: Vec<KnowledgeBaseUpdate>,
    pub follow_up_items: Vec<FollowUpItem>,
}

fn or_na(value: &str) -> &str {
    if value.trim().is_empty() {
        "N/A"
    } else {
        value
    }
}

impl PreventionFindings {
    fn facts(&self) -> Vec<String> {
        let actions = self
            .permanent_actions
            .iter()
            .map(|a| format!("D5: {} - {}", or_na(&a.action), or_na(&a.rationale)));
        let changes = self
            .systemic_prevention
            .iter()
            .map(|c| format!("D7: {} (scope: {})", or_na(&c.change), or_na(&c.scope)));
        actions.chain(changes).collect()
    }

    fn hypotheses(&self) -> Vec<String> {
        let mut hypotheses = Vec::new();
        for change in &self.systemic_prevention {
            if !change.benefits.trim().is_empty() {
                hypotheses.push(format!("Expected benefit: {}", change.benefits));
            }
            if !change.risks.trim().is_empty() {
                hypotheses.push(format!("Potential risk: {}", change.risks));
            }
        }
        hypotheses
    }

    /// Prevention plan as markdown.
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("# Prevention Plan\n\n");

        if !self.permanent_actions.is_empty() {
            out.push_str("## D5: Permanent Corrective Actions\n\n");
            for (i, action) in self.permanent_actions.iter().enumerate() {
                let _ = writeln!(out, "### {}. {}\n", i + 1, or_na(&action.action));
                let _ = writeln!(out, "- **Rationale:** {}", or_na(&action.rationale));
                let _ = writeln!(out, "- **Owner:** {}", or_na(&action.owner));
                let _ = writeln!(out, "- **Timeline:** {}", or_na(&action.timeline));
                if !action.success_metrics.is_empty() {
                    let _ = writeln!(out, "- **Success metrics:** {}", action.success_metrics);
                }
                for step in &action.implementation_steps {
                    let _ = writeln!(out, "  - {}", step);
                }
                out.push('\n');
            }
        }

        if !self.systemic_prevention.is_empty() {
            out.push_str("## D7: Systemic Prevention\n\n");
            for change in &self.systemic_prevention {
                let _ = writeln!(out, "- **{}** (scope: {})", or_na(&change.change), or_na(&change.scope));
                if !change.implementation.is_empty() {
                    let _ = writeln!(out, "  - Implementation: {}", change.implementation);
                }
            }
            out.push('\n');
        }

        if !self.lessons_learned.is_empty() {
            let _ = writeln!(out, "## D8: Lessons Learned\n\n{}\n", bullet_list(&self.lessons_learned));
        }

        if !self.knowledge_base_updates.is_empty() {
            out.push_str("## Knowledge Base Updates\n\n");
            for update in &self.knowledge_base_updates {
                let _ = writeln!(
                    out,
                    "- {}: {} (priority: {})",
                    or_na(&update.document),
                    or_na(&update.update_needed),
                    or_na(&update.priority)
                );
            }
            out.push('\n');
        }

        if !self.follow_up_items.is_empty() {
            out.push_str("## Follow-up\n\n");
            for item in &self.follow_up_items {
                let _ = writeln!(
                    out,
                    "- {} (owner: {}, due: {})",
                    or_na(&item.item),
                    or_na(&item.owner),
                    or_na(&item.deadline)
                );
            }
            out.push('\n');
        }

        out
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PreventionAgent;

fn mode_guidance(mode: ProblemMode) -> &'static str {
    match mode {
        ProblemMode::Excursion => {
            "EXCURSION RESPONSE: the goal is that this deviation never reaches product again.\n\
             - Tighten detection so a repeat is caught within one lot (SPC limits, FDC rules, interlocks)\n\
             - Close the gap in the PM, recipe or material-change procedure that let it through\n\
             - Define release criteria for material currently on hold"
        }
        ProblemMode::Improvement => {
            "YIELD IMPROVEMENT: the goal is a sustained gain, not a one-time recovery.\n\
             - Lock in process window or recipe changes with control plans\n\
             - Extend the fix to every tool and product with the same exposure\n\
             - Set metrics and review cadence that show the gain is holding"
        }
        ProblemMode::Operations => {
            "OPERATIONS TROUBLESHOOTING: the goal is stable flow.\n\
             - Remove the recurring failure mode behind the downtime or blockage\n\
             - Replace workarounds with standard work and documented escalation paths\n\
             - Add early-warning signals for WIP, queue time or tool availability"
        }
    }
}

impl Agent for PreventionAgent {
    type Context = PreventionContext;
    type Findings = PreventionFindings;

    fn stage(&self) -> Stage {
        Stage::Prevention
    }

    fn build_prompt(&self, input: &AgentInput<PreventionContext>) -> String {
        let ctx = &input.context;
        format!(
            r#"You are a semiconductor process integration lead closing out an 8D investigation. Turn the analysis into lasting prevention.

{guidance}

Original description:
"""
{narrative}
"""

Problem definition (D2):
{definition}

Root causes (D4):
{root_causes}

Containment in place (D3):
{containment}

Established facts:
{facts}

Open hypotheses:
{hypotheses}

Known gaps:
{gaps}

Produce:
- D5: permanent corrective actions that remove the root causes, each with an owner and timeline
- D7: systemic changes that stop the same class of problem elsewhere, with scope, benefits and risks
- D8: lessons learned worth sharing with other areas
- Knowledge base documents (SOPs, tool handbooks) that need updating
- Follow-up items with owners and deadlines

Be specific and actionable. Prefer prevention over detection where both are possible.

Respond with JSON only:
{{
  "permanent_actions": [
    {{"action": "...", "rationale": "...", "owner": "...", "timeline": "...", "success_metrics": "...", "implementation_steps": ["..."]}}
  ],
  "systemic_prevention": [
    {{"change": "...", "scope": "Single tool | Tool type | Entire fab", "implementation": "...", "benefits": "...", "risks": "..."}}
  ],
  "lessons_learned": ["..."],
  "knowledge_base_updates": [
    {{"document": "...", "update_needed": "...", "priority": "high | medium | low"}}
  ],
  "follow_up_items": [
    {{"item": "...", "owner": "...", "deadline": "..."}}
  ]
}}"#,
            guidance = mode_guidance(input.mode),
            narrative = ctx.narrative.trim(),
            definition = bullet_list(&ctx.problem_definition),
            root_causes = bullet_list(&ctx.root_causes),
            containment = bullet_list(&ctx.containment),
            facts = bullet_list(&ctx.facts),
            hypotheses = bullet_list(&ctx.hypotheses),
            gaps = bullet_list(&ctx.gaps),
        )
    }

    fn parse(&self, raw: &str) -> Result<Extraction<PreventionFindings>, String> {
        let findings: PreventionFindings = parse_json(raw)?;
        Ok(Extraction {
            facts: findings.facts(),
            hypotheses: findings.hypotheses(),
            phases: BTreeSet::from([EightDPhase::D5, EightDPhase::D7, EightDPhase::D8]),
            findings,
        })
    }
}
