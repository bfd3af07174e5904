//! Run state machine.

use crate::agents::Stage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a run is. States only move forward, one step at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    #[default]
    Start,
    NarrativeDone,
    ClarificationDone,
    AnalysisDone,
    PreventionDone,
    Complete,
}

impl WorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Start => "start",
            WorkflowState::NarrativeDone => "narrative_done",
            WorkflowState::ClarificationDone => "clarification_done",
            WorkflowState::AnalysisDone => "analysis_done",
            WorkflowState::PreventionDone => "prevention_done",
            WorkflowState::Complete => "complete",
        }
    }

    /// Successor state, `None` once complete.
    pub fn next(&self) -> Option<WorkflowState> {
        match self {
            WorkflowState::Start => Some(WorkflowState::NarrativeDone),
            WorkflowState::NarrativeDone => Some(WorkflowState::ClarificationDone),
            WorkflowState::ClarificationDone => Some(WorkflowState::AnalysisDone),
            WorkflowState::AnalysisDone => Some(WorkflowState::PreventionDone),
            WorkflowState::PreventionDone => Some(WorkflowState::Complete),
            WorkflowState::Complete => None,
        }
    }

    /// Stage whose completion leads into this state.
    pub fn completed_stage(&self) -> Option<Stage> {
        match self {
            WorkflowState::NarrativeDone => Some(Stage::Narrative),
            WorkflowState::ClarificationDone => Some(Stage::Clarification),
            WorkflowState::AnalysisDone => Some(Stage::Analysis),
            WorkflowState::PreventionDone => Some(Stage::Prevention),
            WorkflowState::Start | WorkflowState::Complete => None,
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
