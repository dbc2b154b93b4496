//! LlmClient trait definition

use async_trait::async_trait;
#[allow(unused_imports)]
use tracing::debug;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless LLM client - each call is independent
///
/// One `complete` call is exactly one request to the provider. Implementations
/// never retry internally; retry is a user decision made above the pipeline.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request and wait for the full response
    ///
    /// A missing credential is reported as [`LlmError::MissingApiKey`] without
    /// any network I/O.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Provider name for logging
    fn provider(&self) -> &str;

    /// Model identifier for logging
    fn model(&self) -> &str;
}
