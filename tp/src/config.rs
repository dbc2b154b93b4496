//! Trip planner configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::pipeline::Strictness;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Generation pipeline settings
    pub pipeline: PipelineConfig,

    /// Prompt template lookup
    pub prompts: PromptsConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that a credential is available. Call this before commands that
    /// talk to the model to fail fast with a clear message.
    pub fn validate(&self) -> Result<()> {
        if self.llm.get_api_key().is_none() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.llm.api_key_env
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .tripplanner.yml
        let local_config = PathBuf::from(".tripplanner.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/tripplanner/tripplanner.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("tripplanner").join("tripplanner.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name ("gemini" or "openai")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// File holding the API key, used when the environment variable is unset
    #[serde(rename = "api-key-file", skip_serializing_if = "Option::is_none")]
    pub api_key_file: Option<String>,

    /// API base URL; the provider's public endpoint when unset
    #[serde(rename = "base-url", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// HTTP request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Ask the provider for JSON-only output
    #[serde(rename = "json-mode")]
    pub json_mode: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            api_key_file: None,
            base_url: None,
            max_tokens: 8192,
            timeout_ms: 60_000,
            json_mode: true,
        }
    }
}

impl LlmConfig {
    /// Resolve the API key from the environment, then from `api-key-file`
    ///
    /// Blank values count as missing.
    pub fn get_api_key(&self) -> Option<String> {
        if let Ok(key) = std::env::var(&self.api_key_env) {
            let key = key.trim();
            if !key.is_empty() {
                return Some(key.to_string());
            }
        }

        let path = expand_home(self.api_key_file.as_deref()?);
        match fs::read_to_string(&path) {
            Ok(content) => {
                let key = content.trim();
                (!key.is_empty()).then(|| key.to_string())
            }
            Err(e) => {
                tracing::warn!("Failed to read API key file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Configured base URL, or the public endpoint of the configured provider
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None if self.provider == "openai" => OPENAI_BASE_URL.to_string(),
            None => GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Generation pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Upper bound on one generation attempt in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// How strictly model output is validated
    pub strictness: Strictness,

    /// Currency used in prompts when the budget does not name one
    #[serde(rename = "default-currency")]
    pub default_currency: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 60_000,
            strictness: Strictness::Strict,
            default_currency: "INR".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Prompt template lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Directory searched for `.tripplanner/prompts/` and `prompts/`
    pub root: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self { root: ".".to_string() }
    }
}

impl PromptsConfig {
    pub fn root_path(&self) -> PathBuf {
        expand_home(&self.root)
    }
}

/// Expand a leading `~/` to the home directory
fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}
