//! LLM error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during LLM operations
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API key not configured: set the {env} environment variable")]
    MissingApiKey { env: String },

    #[error("Unknown LLM provider: '{0}'. Supported: gemini, openai")]
    UnknownProvider(String),

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Response blocked: {0}")]
    Blocked(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Build an `ApiError`, pulling the message out of a JSON error body when present
    ///
    /// Both Gemini and OpenAI wrap failures as `{"error": {"message": ...}}`.
    pub fn api(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or_else(|| body.trim().to_string());
        LlmError::ApiError { status, message }
    }

    /// Map a reqwest failure, keeping timeouts distinct from other network errors
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(timeout)
        } else {
            LlmError::Network(err)
        }
    }

    /// Check if this error comes from local configuration rather than the call itself
    pub fn is_configuration(&self) -> bool {
        matches!(self, LlmError::MissingApiKey { .. } | LlmError::UnknownProvider(_))
    }

    /// Check if this is a rate limit error
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, LlmError::ApiError { status: 429, .. })
    }

    /// Check if retrying the same request by hand could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::MissingApiKey { .. } | LlmError::UnknownProvider(_) => false,
            LlmError::ApiError { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            LlmError::Network(_) => true,
            LlmError::Timeout(_) => true,
            LlmError::Blocked(_) => true,
            LlmError::InvalidResponse(_) => true,
            LlmError::Json(_) => true,
        }
    }
}
