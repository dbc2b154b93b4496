//! Pipeline error taxonomy
//!
//! Every failure of a generation attempt ends up as one of four kinds. Each kind
//! maps to a message fit for the user and is logged with its kind so telemetry
//! can tell an unreachable model from a model that answered badly.

use serde::Serialize;
use thiserror::Error;

use super::parser::ParseError;
use crate::llm::LlmError;
use crate::prompts::PromptError;
use crate::store::StoreError;

/// Coarse classification of a pipeline failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Trip fields, credential, provider or template missing; not retryable
    Configuration,
    /// The model call failed, timed out or was rejected
    Transport,
    /// The reply held no parseable JSON
    Format,
    /// The JSON did not have the itinerary shape
    Validation,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Transport => write!(f, "transport"),
            Self::Format => write!(f, "format"),
            Self::Validation => write!(f, "validation"),
        }
    }
}

/// Errors from one generation attempt
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Transport error: {0}")]
    Transport(#[source] LlmError),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Configuration(_) => ErrorKind::Configuration,
            PipelineError::Transport(_) => ErrorKind::Transport,
            PipelineError::Format(_) => ErrorKind::Format,
            PipelineError::Validation(_) => ErrorKind::Validation,
        }
    }

    /// Whether a manual "Try Again" can help
    pub fn is_retryable(&self) -> bool {
        self.kind() != ErrorKind::Configuration
    }

    /// Human-readable message for the person planning the trip
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Configuration(message) => message.clone(),
            PipelineError::Transport(LlmError::Timeout(_)) => {
                "The itinerary service took too long to respond. Please try again.".to_string()
            }
            PipelineError::Transport(e) if e.is_rate_limit() => {
                "The itinerary service is busy right now. Please try again in a moment.".to_string()
            }
            PipelineError::Transport(LlmError::Blocked(_)) => {
                "The AI declined to produce an itinerary for this request. Try adjusting your trip details.".to_string()
            }
            PipelineError::Transport(_) => {
                "Could not reach the itinerary service. Please check your connection and try again.".to_string()
            }
            PipelineError::Format(_) => {
                "The AI returned a response that could not be read. Please try again.".to_string()
            }
            PipelineError::Validation(_) => "The AI returned an incomplete itinerary. Please try again.".to_string(),
        }
    }
}

impl From<PromptError> for PipelineError {
    fn from(err: PromptError) -> Self {
        match err {
            PromptError::MissingDestination => {
                PipelineError::Configuration("Choose a destination before generating an itinerary.".to_string())
            }
            PromptError::MissingDays => {
                PipelineError::Configuration("Set the number of days before generating an itinerary.".to_string())
            }
            other => PipelineError::Configuration(other.to_string()),
        }
    }
}

impl From<LlmError> for PipelineError {
    fn from(err: LlmError) -> Self {
        if err.is_configuration() {
            PipelineError::Configuration(err.to_string())
        } else {
            PipelineError::Transport(err)
        }
    }
}

impl From<ParseError> for PipelineError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Format(_) => PipelineError::Format(err.to_string()),
            ParseError::Validation { .. } => PipelineError::Validation(err.to_string()),
        }
    }
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidPatch(reason) => PipelineError::Validation(reason),
            other => PipelineError::Configuration(format!("Trip store unavailable: {}", other)),
        }
    }
}
