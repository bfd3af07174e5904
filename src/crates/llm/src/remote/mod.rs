//! Hosted, key-authenticated providers.
//!
//! - **Claude** - Anthropic's Messages API (general tier)
//! - **OpenAI-compatible** - the factory GenAI gateway (confidential tier)

pub mod claude;
pub mod openai;

pub use claude::ClaudeClient;
pub use openai::OpenAiCompatibleClient;
