//! The folded result of a completed run.

use crate::agents::{
    AgentOutput, AnalysisFindings, ClarificationFindings, EightDPhase, NarrativeFindings,
    PreventionFindings, Stage,
};
use crate::mode::ProblemMode;
use crate::orchestrator::collector::Answers;
use crate::router::CostMode;
use crate::security::SecurityTier;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use uuid::Uuid;

/// Everything a run produced. Only built once all four stages finished.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    pub run_id: Uuid,
    pub mode: ProblemMode,
    pub tier: SecurityTier,
    pub cost_mode: CostMode,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,

    pub narrative: AgentOutput<NarrativeFindings>,
    pub clarification: AgentOutput<ClarificationFindings>,
    pub answers: Answers,
    pub analysis: AgentOutput<AnalysisFindings>,
    pub prevention: AgentOutput<PreventionFindings>,

    /// Stages in the order they ran
    pub completed_stages: Vec<Stage>,
    /// Union of the phases every stage addressed
    pub phases_addressed: BTreeSet<EightDPhase>,
    pub total_facts: usize,
    pub total_hypotheses: usize,
    /// Sum of the four stage costs
    pub total_cost: f64,
    /// Degraded-stage markers and other non-fatal problems
    pub errors: Vec<String>,
}

/// Per-stage view used by the fold and by reports.
#[derive(Debug, Clone, PartialEq)]
pub struct StageSummary {
    pub stage: Stage,
    pub model: String,
    pub facts: usize,
    pub hypotheses: usize,
    pub cost: f64,
    pub degraded: bool,
}

fn summarize<F>(output: &AgentOutput<F>) -> StageSummary {
    StageSummary {
        stage: output.stage,
        model: output.model.clone(),
        facts: output.facts.len(),
        hypotheses: output.hypotheses.len(),
        cost: output.cost,
        degraded: output.is_degraded(),
    }
}

/// Inputs to [`WorkflowResult::fold`] that are not stage outputs.
pub(crate) struct RunInfo {
    pub run_id: Uuid,
    pub mode: ProblemMode,
    pub tier: SecurityTier,
    pub cost_mode: CostMode,
    pub started_at: DateTime<Utc>,
    pub errors: Vec<String>,
}

impl WorkflowResult {
    pub(crate) fn fold(
        info: RunInfo,
        narrative: AgentOutput<NarrativeFindings>,
        clarification: AgentOutput<ClarificationFindings>,
        answers: Answers,
        analysis: AgentOutput<AnalysisFindings>,
        prevention: AgentOutput<PreventionFindings>,
    ) -> Self {
        let mut phases_addressed = BTreeSet::new();
        for phases in [
            &narrative.phases_addressed,
            &clarification.phases_addressed,
            &analysis.phases_addressed,
            &prevention.phases_addressed,
        ] {
            phases_addressed.extend(phases.iter().copied());
        }

        let mut errors = info.errors;
        errors.extend(
            [
                narrative.findings.marker(),
                clarification.findings.marker(),
                analysis.findings.marker(),
                prevention.findings.marker(),
            ]
            .into_iter()
            .flatten()
            .map(str::to_string),
        );

        let summaries = [
            summarize(&narrative),
            summarize(&clarification),
            summarize(&analysis),
            summarize(&prevention),
        ];

        Self {
            run_id: info.run_id,
            mode: info.mode,
            tier: info.tier,
            cost_mode: info.cost_mode,
            started_at: info.started_at,
            completed_at: Utc::now(),
            completed_stages: summaries.iter().map(|s| s.stage).collect(),
            total_facts: summaries.iter().map(|s| s.facts).sum(),
            total_hypotheses: summaries.iter().map(|s| s.hypotheses).sum(),
            total_cost: summaries.iter().map(|s| s.cost).sum(),
            phases_addressed,
            errors,
            narrative,
            clarification,
            answers,
            analysis,
            prevention,
        }
    }

    pub fn stage_summaries(&self) -> [StageSummary; 4] {
        [
            summarize(&self.narrative),
            summarize(&self.clarification),
            summarize(&self.analysis),
            summarize(&self.prevention),
        ]
    }

    pub fn degraded_stages(&self) -> Vec<Stage> {
        self.stage_summaries()
            .iter()
            .filter(|s| s.degraded)
            .map(|s| s.stage)
            .collect()
    }

    pub fn duration_secs(&self) -> f64 {
        (self.completed_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }

    /// Markdown summary of the run.
    pub fn summary(&self) -> String {
        let mut out = String::from("# RCA Run Summary\n\n");
        let _ = writeln!(out, "**Run:** {}", self.run_id);
        let _ = writeln!(out, "**Mode:** {}", self.mode.label());
        let _ = writeln!(out, "**Tier:** {}", self.tier.label());
        let _ = writeln!(out, "**Cost Mode:** {}", self.cost_mode);
        let _ = writeln!(out, "**Duration:** {:.1}s", self.duration_secs());
        let _ = writeln!(out, "**Total Cost:** ${:.4}\n", self.total_cost);

        out.push_str("## Stages\n\n");
        out.push_str("| Stage | Model | Facts | Hypotheses | Cost | Status |\n");
        out.push_str("|---|---|---|---|---|---|\n");
        for s in self.stage_summaries() {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | ${:.4} | {} |",
                s.stage,
                s.model,
                s.facts,
                s.hypotheses,
                s.cost,
                if s.degraded { "degraded" } else { "ok" }
            );
        }

        let phases = self
            .phases_addressed
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(
            out,
            "\n**8D Phases Addressed:** {}",
            if phases.is_empty() { "none" } else { &phases }
        );
        let _ = writeln!(out, "**Facts:** {}  **Hypotheses:** {}", self.total_facts, self.total_hypotheses);
        let _ = writeln!(out, "**Answered Questions:** {}", self.answers.len());

        if !self.errors.is_empty() {
            out.push_str("\n## Warnings\n\n");
            for error in &self.errors {
                let _ = writeln!(out, "- {}", error);
            }
        }

        out
    }
}
