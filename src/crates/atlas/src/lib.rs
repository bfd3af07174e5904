//! # Atlas - Tier-Aware Root Cause Analysis
//!
//! Atlas walks a fab engineer's problem through an 8D-style investigation
//! using language models, while keeping every model call inside the
//! security tier the problem was classified under.
//!
//! ## Features
//!
//! - **Four-Stage Pipeline** - Narrative, Clarification, Analysis, Prevention
//! - **Security Tiers** - General LLM, Confidential Fab and Top Secret, each with its own allow-set
//! - **Model Routing** - Static (task, tier, cost mode) table with per-call cost accounting
//! - **Graceful Degradation** - Unparseable model replies become visible markers, not crashes
//! - **Human in the Loop** - Pluggable answer collection between clarification and analysis
//! - **Dual-Location Config** - User-level and project-level TOML configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use atlas::{
//!     AtlasConfig, FixedAnswers, LlmGateway, ModelRouter, Orchestrator, ProblemMode,
//!     SecurityTier, TierEnforcer, WorkflowOptions,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> atlas::Result<()> {
//! let config = AtlasConfig::default();
//! let tier = SecurityTier::ConfidentialFab;
//!
//! let mut orchestrator = Orchestrator::new(
//!     ModelRouter::new(config.routing.cost_mode),
//!     Arc::new(LlmGateway::for_tier(tier, &config.providers)?),
//!     TierEnforcer::new(),
//!     WorkflowOptions::from_config(&config),
//! );
//!
//! let result = orchestrator
//!     .run_workflow(
//!         "CD on M2 shifted +3nm on ETCH-07 after Tuesday's PM",
//!         ProblemMode::Excursion,
//!         tier,
//!         &FixedAnswers::none(),
//!     )
//!     .await?;
//!
//! println!("{}", result.summary());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! Stages never talk to providers directly. Each one asks the
//! [`TierEnforcer`] whether the invoker's provider is allowed, resolves a
//! route through the [`ModelRouter`], and calls a [`ModelInvoker`]. The
//! router owns the usage counters, so one router per run keeps per-run cost
//! accurate.

pub mod agents;
pub mod cli;
pub mod config;
pub mod executor;
pub mod mode;
pub mod orchestrator;
pub mod router;
pub mod security;
pub mod version;

mod error;

pub use agents::{
    Agent, AgentInput, AgentOutput, AgentRuntime, EightDPhase, Extraction, Stage, StageFindings,
};
pub use config::{AtlasConfig, ConfigLoader};
pub use executor::{Invocation, LlmGateway, ModelInvoker, RetryConfig};
pub use mode::ProblemMode;
pub use orchestrator::{
    parse_run_params, AnswerCollector, Answers, FixedAnswers, Orchestrator, StdinCollector,
    WorkflowOptions, WorkflowResult, WorkflowState,
};
pub use router::{CostMode, ModelConfig, ModelRouter, Provider, TaskType, UsageStats};
pub use security::{SecurityTier, TierEnforcer, TierViolation, ToolCategory};
pub use version::version_info;

pub use error::{AtlasError, Result};
