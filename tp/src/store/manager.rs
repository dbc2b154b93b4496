//! TripStore - actor that owns the TripPlan
//!
//! All reads and writes go through the handle's channel, so the plan has a single
//! writer and every mutation is a whole-document merge-patch.

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info};

use crate::domain::{TripPlan, TripPlanPatch};

use super::messages::{StoreCommand, StoreError, StoreEvent, StoreResponse, VersionedPlan};

/// Plan plus epoch, owned by the actor task
///
/// The epoch increments whenever the plan is cleared or a generation input
/// (destination, country, day count, interests, budget) changes value.
#[derive(Debug, Default)]
struct StoreState {
    plan: Option<TripPlan>,
    epoch: u64,
}

impl StoreState {
    fn read(&self) -> VersionedPlan {
        VersionedPlan {
            epoch: self.epoch,
            plan: self.plan.clone(),
        }
    }

    fn patch(&mut self, patch: TripPlanPatch, expected_epoch: Option<u64>) -> StoreResponse<(TripPlan, bool)> {
        if let Some(expected) = expected_epoch
            && expected != self.epoch
        {
            debug!(%expected, current = %self.epoch, "StoreState::patch: stale epoch");
            return Err(StoreError::Stale {
                expected,
                current: self.epoch,
            });
        }

        let mut next = self.plan.clone().unwrap_or_else(TripPlan::empty);
        let effect = next.apply(patch).map_err(StoreError::InvalidPatch)?;
        if effect.inputs_changed {
            self.epoch += 1;
        }
        self.plan = Some(next.clone());
        Ok((next, effect.inputs_changed))
    }

    fn clear(&mut self) -> u64 {
        self.plan = None;
        self.epoch += 1;
        self.epoch
    }
}

/// Handle to send commands to the TripStore actor
#[derive(Clone)]
pub struct TripStore {
    tx: mpsc::Sender<StoreCommand>,
    /// Broadcast sender for change notifications
    event_tx: broadcast::Sender<StoreEvent>,
}

impl TripStore {
    /// Spawn a new store actor with no plan
    pub fn spawn() -> Self {
        Self::spawn_with(None)
    }

    /// Spawn a new store actor seeded with `plan`
    pub fn spawn_with(plan: Option<TripPlan>) -> Self {
        debug!(has_plan = plan.is_some(), "TripStore::spawn_with: called");
        let (tx, rx) = mpsc::channel(64);
        let (event_tx, _) = broadcast::channel(64);

        let state = StoreState { plan, epoch: 0 };
        tokio::spawn(actor_loop(state, rx, event_tx.clone()));

        info!("TripStore spawned");
        Self { tx, event_tx }
    }

    /// Subscribe to change events
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.event_tx.subscribe()
    }

    /// Current plan, if one exists
    pub async fn read(&self) -> StoreResponse<Option<TripPlan>> {
        debug!("TripStore::read: called");
        Ok(self.read_versioned().await?.plan)
    }

    /// Current plan together with the store epoch
    pub async fn read_versioned(&self) -> StoreResponse<VersionedPlan> {
        debug!("TripStore::read_versioned: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::Read { reply: reply_tx })
            .await
            .map_err(|_| StoreError::ChannelError)?;
        reply_rx.await.map_err(|_| StoreError::ChannelError)
    }

    /// Merge `patch` into the plan, creating it from the empty state if needed
    ///
    /// Returns the merged plan.
    pub async fn patch(&self, patch: TripPlanPatch) -> StoreResponse<TripPlan> {
        debug!("TripStore::patch: called");
        self.send_patch(patch, None).await
    }

    /// Merge `patch` only if the store is still at `epoch`
    pub async fn patch_at(&self, epoch: u64, patch: TripPlanPatch) -> StoreResponse<TripPlan> {
        debug!(%epoch, "TripStore::patch_at: called");
        self.send_patch(patch, Some(epoch)).await
    }

    async fn send_patch(&self, patch: TripPlanPatch, expected_epoch: Option<u64>) -> StoreResponse<TripPlan> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::Patch {
                patch,
                expected_epoch,
                reply: reply_tx,
            })
            .await
            .map_err(|_| StoreError::ChannelError)?;
        reply_rx.await.map_err(|_| StoreError::ChannelError)?
    }

    /// Remove the plan (reset / new trip); returns the new epoch
    pub async fn clear(&self) -> StoreResponse<u64> {
        debug!("TripStore::clear: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::Clear { reply: reply_tx })
            .await
            .map_err(|_| StoreError::ChannelError)?;
        reply_rx.await.map_err(|_| StoreError::ChannelError)
    }

    /// Stop the actor; later calls fail with `ChannelError`
    pub async fn shutdown(&self) -> StoreResponse<()> {
        debug!("TripStore::shutdown: called");
        self.tx
            .send(StoreCommand::Shutdown)
            .await
            .map_err(|_| StoreError::ChannelError)
    }
}

async fn actor_loop(mut state: StoreState, mut rx: mpsc::Receiver<StoreCommand>, event_tx: broadcast::Sender<StoreEvent>) {
    debug!("TripStore actor started");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            StoreCommand::Read { reply } => {
                debug!("actor_loop: Read command");
                let _ = reply.send(state.read());
            }

            StoreCommand::Patch {
                patch,
                expected_epoch,
                reply,
            } => {
                debug!(?expected_epoch, "actor_loop: Patch command");
                let result = state.patch(patch, expected_epoch).map(|(plan, inputs_changed)| {
                    let _ = event_tx.send(StoreEvent::Patched {
                        epoch: state.epoch,
                        inputs_changed,
                    });
                    plan
                });
                let _ = reply.send(result);
            }

            StoreCommand::Clear { reply } => {
                debug!("actor_loop: Clear command");
                let epoch = state.clear();
                let _ = event_tx.send(StoreEvent::Cleared { epoch });
                let _ = reply.send(epoch);
            }

            StoreCommand::Shutdown => {
                info!("TripStore shutting down");
                break;
            }
        }
    }

    debug!("TripStore actor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ItineraryDay;

    fn days(n: u32) -> Vec<ItineraryDay> {
        (1..=n).map(|d| ItineraryDay::new(d, format!("Day {}", d), "")).collect()
    }

    #[tokio::test]
    async fn test_read_empty_store() {
        let store = TripStore::spawn();
        assert!(store.read().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_patch_creates_plan_from_empty_state() {
        let store = TripStore::spawn();
        let plan = store.patch(TripPlanPatch::new().destination("Goa")).await.unwrap();

        assert_eq!(plan.destination, "Goa");
        assert_eq!(plan.number_of_days, 0);
        assert!(plan.interests.is_empty());
        assert_eq!(store.read().await.unwrap(), Some(plan));
    }

    #[tokio::test]
    async fn test_interests_round_trip_last_write_wins() {
        let store = TripStore::spawn();
        store.patch(TripPlanPatch::new().interests(["food"])).await.unwrap();
        store
            .patch(TripPlanPatch::new().interests(["food", "hiking"]))
            .await
            .unwrap();

        let plan = store.read().await.unwrap().unwrap();
        assert_eq!(plan.interests, vec!["food".to_string(), "hiking".to_string()]);
    }

    #[tokio::test]
    async fn test_epoch_moves_on_input_change_and_clear() {
        let store = TripStore::spawn();
        let start = store.read_versioned().await.unwrap().epoch;

        store.patch(TripPlanPatch::new().destination("Goa").days(3)).await.unwrap();
        let after_input = store.read_versioned().await.unwrap().epoch;
        assert!(after_input > start);

        store.patch(TripPlanPatch::new().itinerary(days(3))).await.unwrap();
        assert_eq!(store.read_versioned().await.unwrap().epoch, after_input);

        let cleared = store.clear().await.unwrap();
        assert!(cleared > after_input);
        assert!(store.read().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_patch_at_rejects_stale_epoch() {
        let store = TripStore::spawn();
        store.patch(TripPlanPatch::new().destination("Goa").days(2)).await.unwrap();
        let epoch = store.read_versioned().await.unwrap().epoch;

        store.clear().await.unwrap();

        let err = store.patch_at(epoch, TripPlanPatch::new().itinerary(days(2))).await;
        assert!(matches!(err, Err(StoreError::Stale { .. })));
        assert!(store.read().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_itinerary_patch_leaves_plan_untouched() {
        let store = TripStore::spawn();
        store.patch(TripPlanPatch::new().destination("Goa").days(2)).await.unwrap();

        let err = store.patch(TripPlanPatch::new().itinerary(days(3))).await;
        assert!(matches!(err, Err(StoreError::InvalidPatch(_))));
        assert!(store.read().await.unwrap().unwrap().itinerary.is_none());
    }

    #[tokio::test]
    async fn test_events_are_broadcast() {
        let store = TripStore::spawn();
        let mut events = store.subscribe();

        store.patch(TripPlanPatch::new().destination("Goa")).await.unwrap();
        let event = events.recv().await.unwrap();
        assert!(matches!(event, StoreEvent::Patched { inputs_changed: true, .. }));

        store.clear().await.unwrap();
        assert!(matches!(events.recv().await.unwrap(), StoreEvent::Cleared { .. }));
    }

    #[tokio::test]
    async fn test_shutdown_closes_channel() {
        let store = TripStore::spawn();
        store.shutdown().await.unwrap();
        tokio::task::yield_now().await;

        let result = store.patch(TripPlanPatch::new().destination("Goa")).await;
        assert!(matches!(result, Err(StoreError::ChannelError)));
    }
}
