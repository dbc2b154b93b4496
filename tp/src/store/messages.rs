//! Trip store messages
//!
//! Commands and responses for the actor pattern.

use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::{TripPlan, TripPlanPatch};

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid patch: {0}")]
    InvalidPatch(String),

    #[error("Stale commit: plan changed since epoch {expected} (now {current})")]
    Stale { expected: u64, current: u64 },

    #[error("Channel error")]
    ChannelError,
}

/// Response from store operations
pub type StoreResponse<T> = Result<T, StoreError>;

/// The current plan together with the epoch it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedPlan {
    pub epoch: u64,
    pub plan: Option<TripPlan>,
}

/// Event broadcast after the plan changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A patch was merged
    Patched { epoch: u64, inputs_changed: bool },
    /// The plan was removed
    Cleared { epoch: u64 },
}

/// Commands sent to the TripStore actor
#[derive(Debug)]
pub enum StoreCommand {
    Read {
        reply: oneshot::Sender<VersionedPlan>,
    },
    Patch {
        patch: TripPlanPatch,
        /// Only apply if the store is still at this epoch
        expected_epoch: Option<u64>,
        reply: oneshot::Sender<StoreResponse<TripPlan>>,
    },
    Clear {
        reply: oneshot::Sender<u64>,
    },
    Shutdown,
}
