//! Tier-aware model routing and cost accounting.

pub mod model_router;
pub mod table;
pub mod usage;

pub use model_router::ModelRouter;
pub use table::{all_routes, designated_provider, resolve, CostMode, ModelConfig, Provider, TaskType};
pub use usage::{TaskUsage, UsageStats};
