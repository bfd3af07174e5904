//! Error types for Atlas
//!
//! Parse failures in a stage are not errors: they degrade the stage output
//! and the run continues. Everything in [`AtlasError`] ends the run.

use crate::agents::Stage;
use crate::security::TierViolation;
use llm::LlmError;
use thiserror::Error;

/// Result type alias for Atlas operations
pub type Result<T> = std::result::Result<T, AtlasError>;

/// Main error type for Atlas operations
#[derive(Debug, Error)]
pub enum AtlasError {
    /// The active tier does not allow the requested tool category.
    #[error("Security violation: {0}")]
    SecurityViolation(#[from] TierViolation),

    /// The model provider failed to return a response.
    #[error("{stage} stage invocation failed: {source}")]
    Invocation {
        stage: Stage,
        #[source]
        source: LlmError,
    },

    /// Unknown mode, tier, cost mode or task type.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl AtlasError {
    pub fn invalid_parameter(kind: &str, value: &str, expected: &str) -> Self {
        AtlasError::InvalidParameter(format!(
            "unknown {} '{}' (expected one of: {})",
            kind, value, expected
        ))
    }
}

impl From<toml::de::Error> for AtlasError {
    fn from(err: toml::de::Error) -> Self {
        AtlasError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter_message() {
        let err = AtlasError::invalid_parameter("security tier", "secret", "general_llm, confidential_fab, top_secret");
        assert_eq!(
            err.to_string(),
            "Invalid parameter: unknown security tier 'secret' (expected one of: general_llm, confidential_fab, top_secret)"
        );
    }

    #[test]
    fn test_invocation_error_names_stage() {
        let err = AtlasError::Invocation {
            stage: Stage::Analysis,
            source: LlmError::Timeout("read timed out".into()),
        };
        assert_eq!(err.to_string(), "Analysis stage invocation failed: Request timeout: read timed out");
    }
}
