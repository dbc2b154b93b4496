//! Trip plan store with actor pattern
//!
//! TripStore owns the TripPlan and processes commands via channels; it is the
//! only writer of the plan.

mod manager;
mod messages;

pub use manager::TripStore;
pub use messages::{StoreCommand, StoreError, StoreEvent, StoreResponse, VersionedPlan};
