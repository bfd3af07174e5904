//! Layered TOML configuration.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{AtlasConfig, EndpointConfig, LoggingConfig, ProvidersConfig, RoutingConfig, WorkflowConfig};
