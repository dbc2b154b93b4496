//! ItineraryGenerator - drives one generation attempt end to end
//!
//! State machine: Idle -> Generating -> (Success | Failed), back to Generating on
//! retry. Observers follow it through a `watch` channel of [`GenerationSnapshot`].
//!
//! An attempt may only write to the store while it is still the live attempt and
//! the store epoch it read at the start is unchanged. Clearing the trip, editing
//! a generation input, calling [`ItineraryGenerator::cancel`] or dropping the
//! `generate` future before the model replies all revoke that right, and the
//! late result is discarded.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use super::error::{ErrorKind, PipelineError};
use super::parser::{GeneratedItinerary, Strictness, parse_response};
use crate::config::Config;
use crate::domain::{ItineraryDay, TripPlan, TripPlanPatch, check_day_sequence};
use crate::llm::{CompletionRequest, DEFAULT_MAX_TOKENS, LlmClient, LlmError};
use crate::prompts::{PromptLoader, build_itinerary_prompt};
use crate::store::{StoreError, TripStore};

/// Generation state visible to observers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationState {
    #[default]
    Idle,
    Generating,
    Success,
    Failed,
}

/// What observers see: state plus the result or error of the last attempt
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerationSnapshot {
    pub state: GenerationState,
    /// Days written by the last successful attempt
    pub itinerary: Option<Vec<ItineraryDay>>,
    /// User-facing message of the last failure
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl GenerationSnapshot {
    pub fn is_generating(&self) -> bool {
        self.state == GenerationState::Generating
    }

    fn failed(error: &PipelineError) -> Self {
        Self {
            state: GenerationState::Failed,
            itinerary: None,
            error: Some(error.user_message()),
            error_kind: Some(error.kind()),
        }
    }
}

/// Result of one `generate` call
#[derive(Debug)]
pub enum GenerationOutcome {
    /// Itinerary validated and written to the store
    Completed(GeneratedItinerary),
    /// Attempt failed; any previously stored itinerary is untouched
    Failed(PipelineError),
    /// Another attempt was already in flight; nothing was started
    AlreadyRunning,
    /// The result arrived after the trip was cleared, edited or the attempt cancelled
    Discarded,
}

/// Pipeline tunables
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Upper bound on the model call
    pub timeout: Duration,
    pub max_tokens: u32,
    pub strictness: Strictness,
    /// Currency named in prompts when the budget has none
    pub default_currency: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_tokens: DEFAULT_MAX_TOKENS,
            strictness: Strictness::Strict,
            default_currency: "INR".to_string(),
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.pipeline.timeout(),
            max_tokens: config.llm.max_tokens,
            strictness: config.pipeline.strictness,
            default_currency: config.pipeline.default_currency.clone(),
        }
    }
}

/// Orchestrates prompt building, the model call, parsing and the store commit
pub struct ItineraryGenerator {
    store: TripStore,
    client: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    options: PipelineOptions,
    attempts: Arc<AttemptState>,
    next_token: AtomicU64,
}

impl ItineraryGenerator {
    pub fn new(store: TripStore, client: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>, options: PipelineOptions) -> Self {
        debug!(provider = %client.provider(), model = %client.model(), "ItineraryGenerator::new: called");
        let (state_tx, _) = watch::channel(GenerationSnapshot::default());
        Self {
            store,
            client,
            prompts,
            options,
            attempts: Arc::new(AttemptState {
                state_tx,
                active: AtomicU64::new(0),
                commit_lock: Mutex::new(()),
            }),
            next_token: AtomicU64::new(0),
        }
    }

    /// Follow state changes
    pub fn subscribe(&self) -> watch::Receiver<GenerationSnapshot> {
        self.attempts.state_tx.subscribe()
    }

    /// Current state
    pub fn snapshot(&self) -> GenerationSnapshot {
        self.attempts.state_tx.borrow().clone()
    }

    pub fn store(&self) -> &TripStore {
        &self.store
    }

    /// Run one generation attempt for the current trip
    ///
    /// Exactly one model call is made per accepted attempt. A trip without a
    /// destination or day count fails with a configuration error and no call.
    ///
    /// Dropping the future before the model replies abandons the attempt. Once the
    /// reply is in, the commit runs in its own task and finishes the attempt even
    /// if the future is dropped.
    pub async fn generate(&self) -> GenerationOutcome {
        debug!("generate: called");
        if self.attempts.state_tx.borrow().is_generating() {
            info!("generate: attempt already in flight, ignoring");
            return GenerationOutcome::AlreadyRunning;
        }

        let versioned = match self.store.read_versioned().await {
            Ok(versioned) => versioned,
            Err(e) => return self.fail_before_start(e.into()),
        };
        let Some(plan) = versioned.plan else {
            return self.fail_before_start(PipelineError::Configuration(
                "Create a trip before generating an itinerary.".to_string(),
            ));
        };
        if !plan.has_destination() || !plan.has_days() {
            let err = if plan.has_destination() {
                "Set the number of days before generating an itinerary."
            } else {
                "Choose a destination before generating an itinerary."
            };
            return self.fail_before_start(PipelineError::Configuration(err.to_string()));
        }

        let Some(token) = self.begin() else {
            info!("generate: attempt already in flight, ignoring");
            return GenerationOutcome::AlreadyRunning;
        };
        let mut guard = AttemptGuard {
            attempts: &self.attempts,
            token,
            armed: true,
        };
        info!(%token, destination = %plan.destination, days = %plan.number_of_days, "Generation attempt started");

        let result = self.run(&plan).await;

        // The commit task owns the attempt from here on
        guard.armed = false;
        let attempts = self.attempts.clone();
        let store = self.store.clone();
        let epoch = versioned.epoch;
        let commit = tokio::spawn(async move { attempts.commit(&store, token, epoch, result).await });

        match commit.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(%token, error = %e, "generate: commit task failed");
                self.attempts.abandon(token);
                GenerationOutcome::Discarded
            }
        }
    }

    /// Abandon the live attempt, if any; its result will be discarded
    ///
    /// Returns true if an attempt was cancelled.
    pub async fn cancel(&self) -> bool {
        debug!("cancel: called");
        let _lock = self.attempts.commit_lock.lock().await;
        let token = self.attempts.active.load(Ordering::SeqCst);
        if token == 0 {
            return false;
        }
        info!(%token, "Generation attempt cancelled");
        self.attempts.abandon(token)
    }

    async fn run(&self, plan: &TripPlan) -> Result<GeneratedItinerary, PipelineError> {
        let prompt = build_itinerary_prompt(&self.prompts, plan, &self.options.default_currency)?;
        let request = CompletionRequest::new(prompt).with_max_tokens(self.options.max_tokens);

        let response = match tokio::time::timeout(self.options.timeout, self.client.complete(request)).await {
            Ok(response) => response?,
            Err(_) => return Err(PipelineError::Transport(LlmError::Timeout(self.options.timeout))),
        };
        debug!(
            input_tokens = %response.usage.input_tokens,
            output_tokens = %response.usage.output_tokens,
            finish_reason = ?response.finish_reason,
            "run: model replied"
        );

        let mut generated = parse_response(&response.text, self.options.strictness)?;
        generated.itinerary.sort_by_key(|d| d.day);
        check_day_sequence(&generated.itinerary, plan.number_of_days).map_err(PipelineError::Validation)?;
        Ok(generated)
    }

    /// Enter Generating; None if another attempt got there first
    fn begin(&self) -> Option<u64> {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst) + 1;
        let attempts = &self.attempts;
        let started = attempts.state_tx.send_if_modified(|s| {
            if s.is_generating() {
                return false;
            }
            attempts.active.store(token, Ordering::SeqCst);
            *s = GenerationSnapshot {
                state: GenerationState::Generating,
                ..Default::default()
            };
            true
        });
        started.then_some(token)
    }

    /// Failure detected before the attempt started; never clobbers a live attempt
    fn fail_before_start(&self, err: PipelineError) -> GenerationOutcome {
        let applied = self.attempts.state_tx.send_if_modified(|s| {
            if s.is_generating() {
                return false;
            }
            *s = GenerationSnapshot::failed(&err);
            true
        });
        if !applied {
            return GenerationOutcome::AlreadyRunning;
        }
        warn!(kind = %err.kind(), error = %err, "Generation not started");
        GenerationOutcome::Failed(err)
    }
}

/// Attempt bookkeeping shared between the generator and its commit tasks
struct AttemptState {
    state_tx: watch::Sender<GenerationSnapshot>,
    /// Token of the attempt allowed to commit; 0 when none is live
    active: AtomicU64,
    /// Serialises the commit step with `cancel`
    commit_lock: Mutex<()>,
}

impl AttemptState {
    async fn commit(
        &self,
        store: &TripStore,
        token: u64,
        epoch: u64,
        result: Result<GeneratedItinerary, PipelineError>,
    ) -> GenerationOutcome {
        let _lock = self.commit_lock.lock().await;
        if self.active.load(Ordering::SeqCst) != token {
            info!(%token, "Discarding result of cancelled attempt");
            return GenerationOutcome::Discarded;
        }

        let generated = match result {
            Ok(generated) => generated,
            Err(err) => return self.finish_failed(token, err),
        };

        // The center always travels with its itinerary, including an absent one
        let patch = TripPlanPatch {
            itinerary: Some(generated.itinerary.clone()),
            center_coordinates: generated.center_coordinates,
            ..Default::default()
        };

        match store.patch_at(epoch, patch).await {
            Ok(_) => {
                self.finish(token, |s| {
                    *s = GenerationSnapshot {
                        state: GenerationState::Success,
                        itinerary: Some(generated.itinerary.clone()),
                        error: None,
                        error_kind: None,
                    };
                });
                info!(%token, days = generated.itinerary.len(), "Itinerary generated");
                GenerationOutcome::Completed(generated)
            }
            Err(StoreError::Stale { expected, current }) => {
                info!(%token, %expected, %current, "Trip changed during generation, discarding result");
                self.abandon(token);
                GenerationOutcome::Discarded
            }
            Err(e) => self.finish_failed(token, e.into()),
        }
    }

    fn finish(&self, token: u64, update: impl FnOnce(&mut GenerationSnapshot)) -> bool {
        self.state_tx.send_if_modified(|s| {
            if self.active.load(Ordering::SeqCst) != token {
                return false;
            }
            self.active.store(0, Ordering::SeqCst);
            update(s);
            true
        })
    }

    fn finish_failed(&self, token: u64, err: PipelineError) -> GenerationOutcome {
        warn!(%token, kind = %err.kind(), error = %err, "Generation attempt failed");
        self.finish(token, |s| *s = GenerationSnapshot::failed(&err));
        GenerationOutcome::Failed(err)
    }

    /// Back to Idle if `token` is still the live attempt
    fn abandon(&self, token: u64) -> bool {
        self.finish(token, |s| *s = GenerationSnapshot::default())
    }
}

/// Returns the generator to Idle when a `generate` future is dropped before the commit
struct AttemptGuard<'a> {
    attempts: &'a AttemptState,
    token: u64,
    armed: bool,
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if self.armed && self.attempts.abandon(self.token) {
            debug!(token = %self.token, "AttemptGuard::drop: attempt abandoned");
        }
    }
}
