//! Self-hosted model servers.
//!
//! These run inside the fab network and carry no per-token cost. The
//! top-secret tier is routed here exclusively.

pub mod ollama;

pub use ollama::OllamaClient;
