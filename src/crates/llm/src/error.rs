//! Error types for LLM provider implementations.

use thiserror::Error;

/// Result type for LLM operations.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors that can occur when working with LLM providers.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Failed to serialize/deserialize data.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// API authentication failed.
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// API key not found in environment.
    #[error("API key not found: {0}")]
    ApiKeyNotFound(String),

    /// Model not found or unavailable.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Provider service unavailable (e.g., the on-prem server is down).
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Invalid request parameters.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid response from provider.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Request timeout.
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// General provider error.
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error with context.
    #[error("{0}")]
    Other(String),
}

impl LlmError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::HttpError(_)
                | LlmError::ServiceUnavailable(_)
                | LlmError::Timeout(_)
                | LlmError::RateLimitExceeded(_)
        )
    }

    /// Check if this error is due to authentication.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            LlmError::AuthenticationError(_) | LlmError::ApiKeyNotFound(_)
        )
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::SerializationError(err.to_string())
    }
}

impl LlmError {
    /// Map a non-success HTTP status to the matching error variant.
    pub fn from_status(provider: &str, status: reqwest::StatusCode, body: String) -> Self {
        match status.as_u16() {
            401 | 403 => LlmError::AuthenticationError(body),
            404 => LlmError::ModelNotFound(body),
            429 => LlmError::RateLimitExceeded(body),
            502..=504 => LlmError::ServiceUnavailable(format!("{} returned {}: {}", provider, status, body)),
            _ => LlmError::ProviderError(format!("{} API error {}: {}", provider, status, body)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_status_mapping() {
        let err = LlmError::from_status("factory", StatusCode::UNAUTHORIZED, "bad key".into());
        assert!(err.is_auth_error());
        assert!(!err.is_retryable());

        let err = LlmError::from_status("anthropic", StatusCode::TOO_MANY_REQUESTS, "slow down".into());
        assert!(matches!(err, LlmError::RateLimitExceeded(_)));
        assert!(err.is_retryable());

        let err = LlmError::from_status("onprem", StatusCode::BAD_GATEWAY, String::new());
        assert!(matches!(err, LlmError::ServiceUnavailable(_)));
        assert!(err.is_retryable());

        let err = LlmError::from_status("anthropic", StatusCode::BAD_REQUEST, "max_tokens".into());
        assert!(matches!(err, LlmError::ProviderError(ref m) if m.contains("400")));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_missing_key_is_auth_error() {
        let err = LlmError::ApiKeyNotFound("FACTORY_API_KEY".into());
        assert!(err.is_auth_error());
        assert_eq!(err.to_string(), "API key not found: FACTORY_API_KEY");
    }
}

