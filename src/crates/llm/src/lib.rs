//! Chat-model provider clients for the Atlas RCA pipeline.
//!
//! Every client implements [`ChatModel`]: send a [`ChatRequest`], get back a
//! [`ChatResponse`] carrying the assistant text and the provider's token
//! counts. The pipeline never talks HTTP itself; it picks one of these
//! clients per security tier.
//!
//! # Remote Providers
//!
//! - **Claude** - Anthropic's hosted models, for general (non-sensitive) work
//! - **OpenAI-compatible** - the factory GenAI gateway for confidential data
//!
//! # Local Providers
//!
//! - **Ollama** - the on-prem model server for top-secret data
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use llm::local::OllamaClient;
//! use llm::config::LocalLlmConfig;
//! use llm::{ChatModel, ChatRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = LocalLlmConfig::new("http://localhost:11434", "onprem-reasoning");
//!     let client = OllamaClient::new(config)?;
//!
//!     let request = ChatRequest::from_prompt("What changed on etch tool 4?")
//!         .with_max_tokens(2000);
//!
//!     let response = client.chat(request).await?;
//!     println!("Response: {}", response.text());
//!
//!     Ok(())
//! }
//! ```

pub mod chat;
pub mod config;
pub mod error;

#[cfg(feature = "local")]
pub mod local;

#[cfg(feature = "remote")]
pub mod remote;

pub use chat::{ChatConfig, ChatModel, ChatRequest, ChatResponse, Message, MessageRole, UsageMetadata};
pub use config::{LocalLlmConfig, RemoteLlmConfig};
pub use error::{LlmError, Result};
