//! Model invocation and retry.

pub mod invoker;
pub mod retry;

pub use invoker::{Invocation, LlmGateway, ModelInvoker};
pub use retry::{with_retry, RetryConfig};
