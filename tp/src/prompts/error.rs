//! Prompt error types

use thiserror::Error;

/// Errors from building a prompt
///
/// All of them mean generation cannot start; none involve the model.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Trip destination is not set")]
    MissingDestination,

    #[error("Trip length is not set")]
    MissingDays,

    #[error("Prompt template not found: {0}")]
    TemplateNotFound(String),

    #[error("Failed to read prompt {path}: {message}")]
    TemplateRead { path: String, message: String },

    #[error("Failed to render template {name}: {message}")]
    Render { name: String, message: String },
}
