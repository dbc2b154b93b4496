//! Google Gemini API client implementation
//!
//! Implements the LlmClient trait for the Generative Language API
//! `generateContent` endpoint. One HTTP request per call, no retries.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, TokenUsage};
use crate::config::LlmConfig;

/// Gemini API client
pub struct GeminiClient {
    model: String,
    api_key: Option<String>,
    api_key_env: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
    json_mode: bool,
    timeout: Duration,
}

impl GeminiClient {
    /// Create a new client from configuration
    ///
    /// The API key is resolved now but only required when a call is made, so a
    /// missing key surfaces as a configuration error from `complete`.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(model = %config.model, "GeminiClient::from_config: called");
        let timeout = config.timeout();
        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key: config.get_api_key(),
            api_key_env: config.api_key_env.clone(),
            base_url: config.base_url(),
            http,
            max_tokens: config.max_tokens,
            json_mode: config.json_mode,
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    /// Build the request body for the generateContent API
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        debug!(%self.model, %request.max_tokens, "build_request_body: called");
        let mut generation_config = serde_json::json!({
            "maxOutputTokens": request.max_tokens.min(self.max_tokens),
        });
        if self.json_mode {
            generation_config["responseMimeType"] = serde_json::json!("application/json");
        }

        serde_json::json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [{ "text": request.prompt }],
                }
            ],
            "generationConfig": generation_config,
        })
    }

    /// Parse the generateContent response into plain text
    fn parse_response(&self, api_response: GeminiResponse) -> Result<CompletionResponse, LlmError> {
        debug!(candidates = api_response.candidates.len(), "parse_response: called");
        let usage = api_response
            .usage_metadata
            .map(|u| TokenUsage {
                input_tokens: u.prompt_token_count.unwrap_or(0),
                output_tokens: u.candidates_token_count.unwrap_or(0),
            })
            .unwrap_or_default();

        let Some(candidate) = api_response.candidates.into_iter().next() else {
            let reason = api_response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates returned".to_string());
            debug!(%reason, "parse_response: no candidates");
            return Err(LlmError::Blocked(reason));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "empty response".to_string());
            debug!(%reason, "parse_response: empty candidate");
            return Err(LlmError::Blocked(reason));
        }

        Ok(CompletionResponse {
            text,
            finish_reason: candidate.finish_reason,
            usage,
        })
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, %request.max_tokens, "complete: called");
        let api_key = self.api_key.as_deref().ok_or_else(|| LlmError::MissingApiKey {
            env: self.api_key_env.clone(),
        })?;

        let body = self.build_request_body(&request);
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::from_reqwest(e, self.timeout))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::from_reqwest(e, self.timeout))?;

        if !(200..300).contains(&status) {
            warn!(%status, "complete: API error");
            return Err(LlmError::api(status, &text));
        }

        debug!("complete: success");
        let api_response: GeminiResponse = serde_json::from_str(&text)?;
        self.parse_response(api_response)
    }

    fn provider(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// Gemini API response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(api_key: Option<&str>) -> GeminiClient {
        GeminiClient {
            model: "gemini-2.5-flash".to_string(),
            api_key: api_key.map(str::to_string),
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            http: Client::new(),
            max_tokens: 4096,
            json_mode: true,
            timeout: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_endpoint() {
        let client = test_client(Some("k"));
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_build_request_body() {
        let client = test_client(Some("k"));
        let body = client.build_request_body(&CompletionRequest::new("Plan Goa").with_max_tokens(1000));

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Plan Goa");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1000);
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn test_max_tokens_capped_and_json_mode_off() {
        let mut client = test_client(Some("k"));
        client.json_mode = false;
        let body = client.build_request_body(&CompletionRequest::new("x").with_max_tokens(50_000));

        assert_eq!(body["generationConfig"]["maxOutputTokens"], 4096);
        assert!(body["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn test_parse_response_joins_parts() {
        let client = test_client(Some("k"));
        let raw = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "{\"itinerary\""}, {"text": ": []}"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 120, "candidatesTokenCount": 30, "totalTokenCount": 150}
        }"#;
        let parsed: GeminiResponse = serde_json::from_str(raw).unwrap();
        let response = client.parse_response(parsed).unwrap();

        assert_eq!(response.text, r#"{"itinerary": []}"#);
        assert_eq!(response.finish_reason.as_deref(), Some("STOP"));
        assert_eq!(response.usage.input_tokens, 120);
        assert_eq!(response.usage.output_tokens, 30);
    }

    #[test]
    fn test_parse_response_blocked_prompt() {
        let client = test_client(Some("k"));
        let parsed: GeminiResponse = serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();

        match client.parse_response(parsed) {
            Err(LlmError::Blocked(reason)) => assert_eq!(reason, "SAFETY"),
            other => panic!("Expected Blocked, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_response_empty_candidate() {
        let client = test_client(Some("k"));
        let parsed: GeminiResponse =
            serde_json::from_str(r#"{"candidates": [{"finishReason": "RECITATION"}]}"#).unwrap();

        match client.parse_response(parsed) {
            Err(LlmError::Blocked(reason)) => assert_eq!(reason, "RECITATION"),
            other => panic!("Expected Blocked, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_network() {
        let client = test_client(None);
        let err = client.complete(CompletionRequest::new("x")).await.unwrap_err();

        assert!(err.is_configuration());
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }
}
