//! LLM request/response types
//!
//! Deliberately small: itinerary generation is one prompt in, one block of text out.

use tracing::debug;

/// Default cap on response tokens when a request does not set one
pub const DEFAULT_MAX_TOKENS: u32 = 8192;

/// A completion request - everything needed for one LLM call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// The full prompt text
    pub prompt: String,

    /// Max tokens for response (capped again by the client's configured limit)
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        debug!(prompt_len = prompt.len(), "CompletionRequest::new: called");
        Self {
            prompt,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Response from a completion request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionResponse {
    /// Raw text produced by the model
    pub text: String,

    /// Provider-specific reason the model stopped, if reported
    pub finish_reason: Option<String>,

    /// Token usage for cost tracking
    pub usage: TokenUsage,
}

impl CompletionResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Token usage as reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_request_defaults() {
        let req = CompletionRequest::new("Plan a trip");
        assert_eq!(req.prompt, "Plan a trip");
        assert_eq!(req.max_tokens, DEFAULT_MAX_TOKENS);

        let req = req.with_max_tokens(100);
        assert_eq!(req.max_tokens, 100);
    }

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage {
            input_tokens: 1200,
            output_tokens: 800,
        };
        assert_eq!(usage.total(), 2000);
    }
}
