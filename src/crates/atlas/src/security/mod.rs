//! Security tiers and the tier enforcement gate.

pub mod enforcer;
pub mod tier;

pub use enforcer::{model_category, TierEnforcer, TierViolation};
pub use tier::{SecurityTier, ToolCategory};
