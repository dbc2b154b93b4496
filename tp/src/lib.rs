//! TripPlanner - AI itinerary generation for trip plans
//!
//! A trip is entered step by step into a shared [`TripPlan`] store. Generation
//! turns the plan into a prompt, makes one call to a generative model, parses
//! and validates the reply, and merges the day-by-day itinerary back into the
//! store.
//!
//! # Modules
//!
//! - [`domain`] - TripPlan, itinerary days, activities and the merge-patch
//! - [`store`] - actor that owns the TripPlan
//! - [`prompts`] - Handlebars prompt templates and the itinerary prompt builder
//! - [`llm`] - LLM client trait with Gemini and OpenAI implementations
//! - [`pipeline`] - response parser and the generation orchestrator
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface
//! - [`render`] - terminal rendering of itineraries

pub mod cli;
pub mod config;
pub mod domain;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod render;
pub mod store;

// Re-export commonly used types
pub use config::{Config, LlmConfig, PipelineConfig};
pub use domain::{Activity, Budget, Coordinates, ItineraryDay, TripPlan, TripPlanPatch};
pub use llm::{CompletionRequest, CompletionResponse, GeminiClient, LlmClient, LlmError, OpenAIClient, create_client};
pub use pipeline::{
    ErrorKind, GeneratedItinerary, GenerationOutcome, GenerationSnapshot, GenerationState, ItineraryGenerator,
    ParseError, PipelineError, PipelineOptions, Strictness, parse_response,
};
pub use prompts::{PromptLoader, build_itinerary_prompt};
pub use store::{StoreError, StoreEvent, TripStore, VersionedPlan};
