//! `atlas run`: one full RCA workflow from the terminal.

use crate::config::AtlasConfig;
use crate::error::{AtlasError, Result};
use crate::executor::{LlmGateway, ModelInvoker};
use crate::mode::ProblemMode;
use crate::orchestrator::{AnswerCollector, FixedAnswers, Orchestrator, StdinCollector, WorkflowOptions, WorkflowResult};
use crate::router::{CostMode, ModelRouter, Provider};
use crate::security::{SecurityTier, TierEnforcer};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RunArgs {
    pub mode: ProblemMode,
    pub tier: SecurityTier,
    /// Overrides `[routing] cost_mode`
    pub cost_mode: Option<CostMode>,
    /// Overrides the tier's designated provider. The tier gate still applies.
    pub provider: Option<Provider>,
    /// Read from stdin when absent
    pub narrative_file: Option<PathBuf>,
    /// JSON object of question to answer; prompts interactively when absent
    pub answers_file: Option<PathBuf>,
    /// Print the whole result as JSON instead of the report
    pub json: bool,
}

async fn read_narrative(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
            AtlasError::Config(format!("Failed to read narrative {}: {}", path.display(), e))
        }),
        None => {
            eprintln!("{}", "Describe the problem, then press Ctrl-D:".bold());
            let mut narrative = String::new();
            tokio::io::stdin().read_to_string(&mut narrative).await?;
            Ok(narrative)
        }
    }
}

async fn build_collector(path: Option<&PathBuf>) -> Result<Box<dyn AnswerCollector>> {
    match path {
        Some(path) => {
            let json = tokio::fs::read_to_string(path).await.map_err(|e| {
                AtlasError::Config(format!("Failed to read answers {}: {}", path.display(), e))
            })?;
            Ok(Box::new(FixedAnswers::from_json(&json)?))
        }
        None => Ok(Box::new(StdinCollector)),
    }
}

/// Run the workflow and print the outcome.
pub async fn handle_run(config: &AtlasConfig, args: RunArgs) -> Result<WorkflowResult> {
    let cost_mode = args.cost_mode.unwrap_or(config.routing.cost_mode);
    let invoker: Arc<dyn ModelInvoker> = Arc::new(match args.provider {
        Some(provider) => LlmGateway::for_provider(provider, &config.providers)?,
        None => LlmGateway::for_tier(args.tier, &config.providers)?,
    });
    debug!(provider = %invoker.provider(), cost_mode = %cost_mode, "Prepared run");

    let narrative = read_narrative(args.narrative_file.as_ref()).await?;
    let collector = build_collector(args.answers_file.as_ref()).await?;

    let mut orchestrator = Orchestrator::new(
        ModelRouter::new(cost_mode),
        invoker,
        TierEnforcer::new(),
        WorkflowOptions::from_config(config),
    );

    let result = orchestrator
        .run_workflow(&narrative, args.mode, args.tier, collector.as_ref())
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(result);
    }

    println!("{}", "✓ RCA workflow complete".green().bold());
    println!();
    println!("{}", result.summary());

    if let Some(reflection) = result.narrative.parsed().map(|f| f.reflection.as_str()) {
        if !reflection.is_empty() {
            println!("{}\n\n{}\n", "## What We Heard".bold(), reflection);
        }
    }
    if let Some(analysis) = result.analysis.parsed() {
        println!("{}", analysis.to_markdown());
    }
    match result.prevention.parsed() {
        Some(prevention) => println!("{}", prevention.to_markdown()),
        None => println!("{}\n\n{}\n", "## Prevention (unparsed)".yellow().bold(), result.prevention.content),
    }

    println!("{}", orchestrator.usage_summary());

    for stage in result.degraded_stages() {
        eprintln!("{} {} stage output could not be parsed", "⚠".yellow(), stage);
    }

    Ok(result)
}
