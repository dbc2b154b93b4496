//! Domain types for trip planning
//!
//! - [`TripPlan`] - the trip details and their generated itinerary
//! - [`TripPlanPatch`] - the merge-patch every change goes through
//! - [`ItineraryDay`], [`Activity`], [`Coordinates`] - the generated schedule

mod itinerary;
mod plan;

pub use itinerary::{Activity, Coordinates, ItineraryDay, check_day_sequence};
pub use plan::{Budget, PatchEffect, TripPlan, TripPlanPatch, normalize_interests};
