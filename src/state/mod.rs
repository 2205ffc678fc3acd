//! Shared in-memory state for one race session and the single-writer
//! transition driver that guards every phase change.

/// Broadcast hub for outbound events.
pub mod events;
/// Per-session runtime data (roster, race start).
pub mod session;
/// The one-way race phase state machine.
pub mod state_machine;

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, watch};
use tokio::time::timeout;
use tracing::warn;

use crate::{
    clock::ClockSource,
    config::RaceConfig,
    dto::event::OutboundEvent,
    error::ServiceError,
    services::{finish_tracker::FinishTracker, leaderboard::LeaderboardAggregator},
};

pub use self::events::EventHub;
pub use self::state_machine::{AbortError, ApplyError, Plan, PlanError, PlanId, Snapshot};
use self::{
    session::RaceSession,
    state_machine::{RaceEvent, RacePhase, RaceStateMachine},
};

/// Cheaply cloneable handle to the session state.
pub type SharedState = Arc<SessionState>;

/// Central state for one race session.
///
/// All mutation funnels through this structure: the phase machine behind a
/// write lock, transitions serialized by `transition_gate`, and the finish
/// pipeline (tracker check + aggregator submit) serialized by `finish_gate`
/// so two reports can never interleave those steps.
pub struct SessionState {
    config: RaceConfig,
    clock: Arc<dyn ClockSource>,
    events: EventHub,
    machine: RwLock<RaceStateMachine>,
    session: RwLock<RaceSession>,
    finish_tracker: FinishTracker,
    aggregator: LeaderboardAggregator,
    cancelled: watch::Sender<bool>,
    transition_gate: Mutex<()>,
    finish_gate: Mutex<()>,
}

impl SessionState {
    /// Construct a new session wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: RaceConfig, clock: Arc<dyn ClockSource>) -> SharedState {
        let (cancelled_tx, _rx) = watch::channel(false);
        let events = EventHub::new(config.event_capacity);
        Arc::new(Self {
            config,
            clock,
            events,
            machine: RwLock::new(RaceStateMachine::new()),
            session: RwLock::new(RaceSession::new()),
            finish_tracker: FinishTracker::new(),
            aggregator: LeaderboardAggregator::new(),
            cancelled: cancelled_tx,
            transition_gate: Mutex::new(()),
            finish_gate: Mutex::new(()),
        })
    }

    /// Session configuration.
    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    /// Current reading of the authoritative clock.
    pub fn clock_now(&self) -> std::time::Duration {
        self.clock.now()
    }

    /// Broadcast hub used for outbound events.
    pub fn events(&self) -> &EventHub {
        &self.events
    }

    /// Subscribe to the outbound event stream (transport layer entry point).
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<OutboundEvent> {
        self.events.subscribe()
    }

    /// Per-participant finish dedup set.
    pub fn finish_tracker(&self) -> &FinishTracker {
        &self.finish_tracker
    }

    /// Finish record aggregator producing the final leaderboard.
    pub fn aggregator(&self) -> &LeaderboardAggregator {
        &self.aggregator
    }

    /// Snapshot the current phase of the race state machine.
    pub async fn phase(&self) -> RacePhase {
        self.machine.read().await.phase()
    }

    /// Full state machine snapshot including any pending transition.
    pub async fn snapshot(&self) -> Snapshot {
        self.machine.read().await.snapshot()
    }

    /// Read the session data under the lock.
    pub async fn read_session<R>(&self, f: impl FnOnce(&RaceSession) -> R) -> R {
        let guard = self.session.read().await;
        f(&guard)
    }

    /// Mutate the session data under the lock.
    pub async fn with_session<R>(&self, f: impl FnOnce(&mut RaceSession) -> R) -> R {
        let mut guard = self.session.write().await;
        f(&mut guard)
    }

    /// Whether the session has been aborted.
    pub fn is_aborted(&self) -> bool {
        *self.cancelled.borrow()
    }

    /// Flip the abort flag; idempotent. Background tasks observe the change
    /// through [`SessionState::abort_watcher`] and stop.
    pub fn mark_aborted(&self) {
        self.cancelled.send_replace(true);
    }

    /// Subscribe to abort notifications.
    pub fn abort_watcher(&self) -> watch::Receiver<bool> {
        self.cancelled.subscribe()
    }

    /// Mutex serializing the tracker-check / aggregator-submit pipeline.
    pub(crate) fn finish_gate(&self) -> &Mutex<()> {
        &self.finish_gate
    }

    /// Plan a transition on the race state machine, returning the plan.
    async fn plan_transition(&self, event: RaceEvent) -> Result<Plan, PlanError> {
        let mut sm = self.machine.write().await;
        sm.plan(event)
    }

    /// Apply the planned transition, returning the next phase.
    async fn apply_planned_transition(&self, plan_id: PlanId) -> Result<RacePhase, ApplyError> {
        let mut sm = self.machine.write().await;
        sm.apply(plan_id)
    }

    /// Abort a planned transition of the race state machine.
    async fn abort_transition(&self, plan_id: PlanId) -> Result<(), AbortError> {
        let mut sm = self.machine.write().await;
        sm.abort(plan_id)
    }

    /// Run `work` inside a planned phase transition.
    ///
    /// The transition gate admits one transition at a time; the plan is only
    /// applied when `work` succeeds within the configured timeout, otherwise
    /// it is aborted and the phase is left untouched.
    pub async fn run_transition<F, Fut, T>(
        &self,
        event: RaceEvent,
        work: F,
    ) -> Result<(T, RacePhase), ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, ServiceError>>,
    {
        let gate = self.transition_gate.lock().await;
        let Plan { id: plan_id, .. } = self.plan_transition(event).await?;

        let work_future = work();
        let outcome = if let Some(limit) = self.config.transition_timeout {
            match timeout(limit, work_future).await {
                Ok(result) => result,
                Err(_) => {
                    if let Err(abort_err) = self.abort_transition(plan_id).await {
                        warn!(
                            event = ?event,
                            plan_id = %plan_id,
                            error = ?abort_err,
                            "failed to abort transition after timeout"
                        );
                    }
                    drop(gate);
                    return Err(ServiceError::Timeout);
                }
            }
        } else {
            work_future.await
        };

        match outcome {
            Ok(value) => {
                let next = self.apply_planned_transition(plan_id).await?;
                drop(gate);
                Ok((value, next))
            }
            Err(err) => {
                if let Err(abort_err) = self.abort_transition(plan_id).await {
                    warn!(
                        event = ?event,
                        plan_id = %plan_id,
                        error = ?abort_err,
                        "failed to abort transition after work error"
                    );
                }
                drop(gate);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn new_state() -> SharedState {
        SessionState::new(RaceConfig::default(), Arc::new(ManualClock::new()))
    }

    #[tokio::test]
    async fn run_transition_applies_on_success() {
        let state = new_state();
        let (value, next) = state
            .run_transition(RaceEvent::RoomFull, || async { Ok(42) })
            .await
            .unwrap();
        assert_eq!(value, 42);
        assert_eq!(next, RacePhase::Countdown);
        assert_eq!(state.phase().await, RacePhase::Countdown);
    }

    #[tokio::test]
    async fn run_transition_rolls_back_on_work_error() {
        let state = new_state();
        let err = state
            .run_transition(RaceEvent::RoomFull, || async {
                Err::<(), _>(ServiceError::InvalidInput("boom".into()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        assert_eq!(state.phase().await, RacePhase::NotStarted);
    }

    #[tokio::test]
    async fn run_transition_rejects_invalid_event() {
        let state = new_state();
        let err = state
            .run_transition(RaceEvent::RaceFinished, || async { Ok(()) })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn abort_flag_is_idempotent_and_observable() {
        let state = new_state();
        let mut watcher = state.abort_watcher();
        assert!(!state.is_aborted());

        state.mark_aborted();
        state.mark_aborted();

        assert!(state.is_aborted());
        watcher.changed().await.unwrap();
        assert!(*watcher.borrow());
    }
}
