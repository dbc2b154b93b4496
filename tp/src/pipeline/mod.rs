//! Itinerary generation pipeline
//!
//! [`ItineraryGenerator`] sequences the prompt builder, the model call and the
//! [`parser`], then commits the validated days to the trip store.

mod error;
mod orchestrator;
pub mod parser;

pub use error::{ErrorKind, PipelineError};
pub use orchestrator::{GenerationOutcome, GenerationSnapshot, GenerationState, ItineraryGenerator, PipelineOptions};
pub use parser::{GeneratedItinerary, ParseError, Strictness, extract_json, parse_response};
