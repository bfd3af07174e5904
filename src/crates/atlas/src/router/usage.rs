//! Token and cost accounting.

use crate::router::table::TaskType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counters for one task type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskUsage {
    pub calls: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost: f64,
}

/// Cumulative usage for one router.
///
/// Fields are read-only outside the crate; only [`ModelRouter::track_usage`]
/// adds to them, so every counter only grows.
///
/// [`ModelRouter::track_usage`]: crate::router::ModelRouter::track_usage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    total_calls: u64,
    total_input_tokens: u64,
    total_output_tokens: u64,
    total_cost: f64,
    by_task: BTreeMap<TaskType, TaskUsage>,
}

impl UsageStats {
    pub(crate) fn record(&mut self, task: TaskType, input_tokens: u64, output_tokens: u64, cost: f64) {
        self.total_calls += 1;
        self.total_input_tokens += input_tokens;
        self.total_output_tokens += output_tokens;
        self.total_cost += cost;

        let entry = self.by_task.entry(task).or_default();
        entry.calls += 1;
        entry.input_tokens += input_tokens;
        entry.output_tokens += output_tokens;
        entry.cost += cost;
    }

    pub fn total_calls(&self) -> u64 {
        self.total_calls
    }

    pub fn total_input_tokens(&self) -> u64 {
        self.total_input_tokens
    }

    pub fn total_output_tokens(&self) -> u64 {
        self.total_output_tokens
    }

    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    pub fn by_task(&self) -> &BTreeMap<TaskType, TaskUsage> {
        &self.by_task
    }

    pub fn task(&self, task: TaskType) -> TaskUsage {
        self.by_task.get(&task).copied().unwrap_or_default()
    }

    /// Markdown report.
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("# Model Usage Summary\n\n");
        out.push_str(&format!("**Total Calls**: {}\n", self.total_calls));
        out.push_str(&format!("**Total Input Tokens**: {}\n", self.total_input_tokens));
        out.push_str(&format!("**Total Output Tokens**: {}\n", self.total_output_tokens));
        out.push_str(&format!("**Total Cost**: ${:.4}\n", self.total_cost));

        if !self.by_task.is_empty() {
            out.push_str("\n## By Task Type\n");
            for (task, usage) in &self.by_task {
                out.push_str(&format!("\n### {}\n", task));
                out.push_str(&format!("- Calls: {}\n", usage.calls));
                out.push_str(&format!("- Input Tokens: {}\n", usage.input_tokens));
                out.push_str(&format!("- Output Tokens: {}\n", usage.output_tokens));
                out.push_str(&format!("- Cost: ${:.4}\n", usage.cost));
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accumulates_totals_and_per_task() {
        let mut stats = UsageStats::default();
        stats.record(TaskType::Reasoning, 100, 50, 0.1);
        stats.record(TaskType::Reasoning, 200, 25, 0.2);
        stats.record(TaskType::Synthesis, 10, 10, 0.0);

        assert_eq!(stats.total_calls(), 3);
        assert_eq!(stats.total_input_tokens(), 310);
        assert_eq!(stats.total_output_tokens(), 85);
        assert!((stats.total_cost() - 0.3).abs() < 1e-9);

        let reasoning = stats.task(TaskType::Reasoning);
        assert_eq!(reasoning.calls, 2);
        assert_eq!(reasoning.input_tokens, 300);
        assert_eq!(stats.task(TaskType::Fast), TaskUsage::default());
    }

    #[test]
    fn test_markdown_layout() {
        let mut stats = UsageStats::default();
        stats.record(TaskType::DeepAnalysis, 1000, 2000, 1.23456);

        let report = stats.to_markdown();
        assert!(report.starts_with("# Model Usage Summary"));
        assert!(report.contains("**Total Cost**: $1.2346"));
        assert!(report.contains("## By Task Type"));
        assert!(report.contains("### deep_analysis"));
    }

    #[test]
    fn test_empty_report_has_no_task_section() {
        let report = UsageStats::default().to_markdown();
        assert!(report.contains("**Total Calls**: 0"));
        assert!(!report.contains("By Task Type"));
    }
}
