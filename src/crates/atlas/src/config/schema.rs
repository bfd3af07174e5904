//! Configuration schema for Atlas

use crate::error::Result;
use crate::executor::RetryConfig;
use crate::router::{CostMode, Provider};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main Atlas configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AtlasConfig {
    /// Provider endpoints
    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    /// Workflow timeouts and retries
    #[serde(default)]
    pub workflow: WorkflowConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Endpoint settings for every provider, one block each.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProvidersConfig {
    #[serde(default = "default_anthropic")]
    pub anthropic: EndpointConfig,

    #[serde(default = "default_factory")]
    pub factory: EndpointConfig,

    #[serde(default = "default_onprem")]
    pub onprem: EndpointConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            anthropic: default_anthropic(),
            factory: default_factory(),
            onprem: default_onprem(),
        }
    }
}

impl ProvidersConfig {
    pub fn endpoint(&self, provider: Provider) -> &EndpointConfig {
        match provider {
            Provider::Anthropic => &self.anthropic,
            Provider::Factory => &self.factory,
            Provider::OnPrem => &self.onprem,
        }
    }
}

/// Connection settings for one provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndpointConfig {
    pub base_url: String,

    /// API key; supports `${VAR}` interpolation
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl EndpointConfig {
    fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Configured key, else the provider's environment variable.
    ///
    /// A key still of the form `${VAR}` after interpolation counts as unset.
    pub fn resolve_api_key(&self, provider: Provider) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.is_empty() && !key.starts_with("${"))
            .or_else(|| std::env::var(provider.api_key_env()).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

fn default_anthropic() -> EndpointConfig {
    EndpointConfig::with_base_url(llm::config::ANTHROPIC_BASE_URL)
}

fn default_factory() -> EndpointConfig {
    EndpointConfig::with_base_url("http://factory-genai.fab.local/v1")
}

fn default_onprem() -> EndpointConfig {
    EndpointConfig::with_base_url(llm::config::OLLAMA_BASE_URL)
}

fn default_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RoutingConfig {
    /// "dev" for cheap models, "runtime" for production models
    #[serde(default)]
    pub cost_mode: CostMode,
}

/// Workflow configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowConfig {
    /// Deadline for clarification answers. Unset means wait forever.
    #[serde(default)]
    pub collect_timeout_secs: Option<u64>,

    /// Retries for transient provider failures (0 = single attempt)
    #[serde(default)]
    pub max_invocation_retries: usize,

    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,

    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,

    #[serde(default = "default_retry_multiplier")]
    pub retry_multiplier: f64,
}

fn default_retry_initial_delay_ms() -> u64 {
    1000
}

fn default_retry_max_delay_ms() -> u64 {
    30_000
}

fn default_retry_multiplier() -> f64 {
    2.0
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            collect_timeout_secs: None,
            max_invocation_retries: 0,
            retry_initial_delay_ms: default_retry_initial_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            retry_multiplier: default_retry_multiplier(),
        }
    }
}

impl WorkflowConfig {
    pub fn collect_timeout(&self) -> Option<Duration> {
        self.collect_timeout_secs.map(Duration::from_secs)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_invocation_retries,
            initial_delay_ms: self.retry_initial_delay_ms,
            max_delay_ms: self.retry_max_delay_ms,
            multiplier: self.retry_multiplier,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "compact", "pretty"
    #[serde(default = "default_log_format")]
    pub format: String,

    #[serde(default = "default_true")]
    pub timestamps: bool,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            timestamps: true,
        }
    }
}

impl AtlasConfig {
    /// Resolve environment variables in configuration values
    ///
    /// Supports ${VAR_NAME} syntax in endpoint URLs and keys
    pub fn resolve_env_vars(&mut self) {
        for endpoint in [&mut self.providers.anthropic, &mut self.providers.factory, &mut self.providers.onprem] {
            endpoint.base_url = expand_env_var(&endpoint.base_url);
            if let Some(ref key) = endpoint.api_key {
                endpoint.api_key = Some(expand_env_var(key));
            }
        }
    }

    /// Apply `ATLAS_COST_MODE` and `ATLAS_LOG_LEVEL` when set.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(mode) = std::env::var("ATLAS_COST_MODE") {
            self.routing.cost_mode = mode.parse()?;
        }
        if let Ok(level) = std::env::var("ATLAS_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }
}

/// Expand a whole-value `${VAR}` reference; unknown variables are left as-is.
fn expand_env_var(value: &str) -> String {
    match value.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
        Some(var_name) => std::env::var(var_name).unwrap_or_else(|_| value.to_string()),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AtlasConfig::default();
        assert_eq!(config.routing.cost_mode, CostMode::Dev);
        assert_eq!(config.providers.anthropic.base_url, "https://api.anthropic.com");
        assert_eq!(config.providers.onprem.base_url, "http://localhost:11434");
        assert_eq!(config.workflow.collect_timeout(), None);
        assert_eq!(config.workflow.retry_config().max_retries, 0);
        assert_eq!(config.logging.format, "compact");
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml_str = r#"
            [routing]
            cost_mode = "runtime"

            [providers.factory]
            base_url = "https://genai.fab12.internal/v1"
            api_key = "${FACTORY_TOKEN}"

            [workflow]
            collect_timeout_secs = 600
            max_invocation_retries = 2
        "#;

        let config: AtlasConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.routing.cost_mode, CostMode::Runtime);
        assert_eq!(config.providers.factory.base_url, "https://genai.fab12.internal/v1");
        assert_eq!(config.providers.factory.timeout_secs, 120);
        // Untouched sections keep their defaults
        assert_eq!(config.providers.anthropic.base_url, "https://api.anthropic.com");
        assert_eq!(config.workflow.collect_timeout(), Some(Duration::from_secs(600)));
        assert_eq!(config.workflow.retry_config().max_retries, 2);
        assert_eq!(config.workflow.retry_multiplier, 2.0);
    }

    #[test]
    fn test_invalid_cost_mode_rejected() {
        let result: std::result::Result<AtlasConfig, _> = toml::from_str("[routing]\ncost_mode = \"turbo\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_expand_env_var() {
        std::env::set_var("ATLAS_SCHEMA_TEST_KEY", "sk-test");
        assert_eq!(expand_env_var("${ATLAS_SCHEMA_TEST_KEY}"), "sk-test");
        assert_eq!(expand_env_var("plain"), "plain");
        assert_eq!(expand_env_var("${ATLAS_SCHEMA_TEST_UNSET}"), "${ATLAS_SCHEMA_TEST_UNSET}");
    }

    #[test]
    fn test_unresolved_placeholder_counts_as_missing_key() {
        let endpoint = EndpointConfig {
            base_url: "http://x".to_string(),
            api_key: Some("${ATLAS_SCHEMA_TEST_NEVER_SET}".to_string()),
            timeout_secs: 5,
        };
        std::env::remove_var("ONPREM_API_KEY");
        assert_eq!(endpoint.resolve_api_key(Provider::OnPrem), None);
    }

    #[test]
    fn test_resolve_env_vars_in_endpoints() {
        std::env::set_var("ATLAS_SCHEMA_TEST_URL", "http://gpu-cluster:11434");
        let mut config = AtlasConfig::default();
        config.providers.onprem.base_url = "${ATLAS_SCHEMA_TEST_URL}".to_string();

        config.resolve_env_vars();

        assert_eq!(config.providers.onprem.base_url, "http://gpu-cluster:11434");
    }
}
