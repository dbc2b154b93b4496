//! Prompt Template System
//!
//! Loads and renders `.pmt` (prompt template) files and builds the itinerary
//! generation prompt from a TripPlan.
//!
//! Template loading chain:
//! 1. `.tripplanner/prompts/{name}.pmt` (user override)
//! 2. `prompts/{name}.pmt` (repo default)
//! 3. Embedded fallback in code
//!
//! Templates use Handlebars syntax for variable substitution.

mod builder;
pub mod embedded;
mod error;
mod loader;

pub use builder::{ITINERARY_TEMPLATE, ItineraryPromptContext, build_itinerary_prompt, format_amount};
pub use error::PromptError;
pub use loader::PromptLoader;
