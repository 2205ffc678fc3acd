use std::time::Instant;

use thiserror::Error;
use uuid::Uuid;

/// Authoritative race phase for one session.
///
/// Transitions are one-directional; no phase is ever revisited and nothing
/// leaves [`RacePhase::Complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RacePhase {
    /// Waiting for the roster to fill up.
    NotStarted,
    /// The synchronized countdown is running.
    Countdown,
    /// The finish line is open and reports are accepted.
    Racing,
    /// The leaderboard has been published; the session is torn down afterwards.
    Complete,
}

/// Events that can be applied to the race state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceEvent {
    /// The roster reached the configured room size.
    RoomFull,
    /// The countdown task ran to completion without being cancelled.
    CountdownElapsed,
    /// The aggregator finalized the leaderboard (all reported, or forced).
    RaceFinished,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: RacePhase,
    /// The event that cannot be applied from this phase.
    pub event: RaceEvent,
}

/// Errors that can occur when planning a state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A transition is already pending and must be applied or aborted.
    AlreadyPending,
    /// The requested transition is not valid from the current phase.
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
    /// State machine phase changed since the plan was created.
    PhaseMismatch {
        /// Phase when plan was created.
        expected: RacePhase,
        /// Current phase.
        actual: RacePhase,
    },
    /// State machine version changed since the plan was created.
    VersionMismatch {
        /// Version when plan was created.
        expected: usize,
        /// Current version.
        actual: usize,
    },
}

/// Errors that can occur when aborting a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Unique identifier for a planned phase transition.
pub type PlanId = Uuid;

/// A planned transition that has been validated but not yet applied.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Phase the state machine is currently in.
    pub from: RacePhase,
    /// Phase the state machine will transition to.
    pub to: RacePhase,
    /// Event that triggered this transition.
    pub event: RaceEvent,
    /// Version number after applying this transition.
    pub version_next: usize,
    /// Timestamp when this plan was created.
    pub pending_since: Instant,
}

/// Snapshot of the current state machine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Current phase of the state machine.
    pub phase: RacePhase,
    /// Version number of the state machine (increments on each transition).
    pub version: usize,
    /// Pending transition phase, if a transition is planned but not yet applied.
    pub pending: Option<RacePhase>,
}

/// State machine implementing the one-way race lifecycle.
///
/// The plan/apply split lets the coordinator attach work to a transition and
/// guarantees the transition itself lands exactly once: a second caller either
/// fails to plan (already pending) or fails to apply (version moved on).
#[derive(Debug, Clone)]
pub struct RaceStateMachine {
    phase: RacePhase,
    version: usize,
    pending: Option<Plan>,
}

impl Default for RaceStateMachine {
    fn default() -> Self {
        Self {
            phase: RacePhase::NotStarted,
            version: 0,
            pending: None,
        }
    }
}

impl RaceStateMachine {
    /// Create a new state machine initialised before the countdown.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> RacePhase {
        self.phase
    }

    /// Create a snapshot of the current state machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            version: self.version,
            pending: self.pending.as_ref().map(|plan| plan.to),
        }
    }

    /// Plan a transition by validating that the event can be applied from the
    /// current phase. Returns a [`Plan`] that can later be applied or aborted.
    pub fn plan(&mut self, event: RaceEvent) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self
            .compute_transition(event)
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.phase,
            to: next,
            event,
            version_next: self.version + 1,
            pending_since: Instant::now(),
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply a planned transition, moving the state machine to the next phase.
    /// Returns the new phase after the transition.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<RacePhase, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected_plan_id = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected: expected_plan_id,
                got: plan_id,
            });
        }

        if self.phase != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from,
                actual: self.phase,
            });
        }

        if self.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version_next,
                actual: self.version + 1,
            });
        }

        self.phase = plan.to;
        self.version = plan.version_next;
        self.pending = None;

        Ok(self.phase)
    }

    /// Abort a planned transition without applying it, leaving the phase untouched.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: RaceEvent) -> Result<RacePhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (RacePhase::NotStarted, RaceEvent::RoomFull) => RacePhase::Countdown,
            (RacePhase::Countdown, RaceEvent::CountdownElapsed) => RacePhase::Racing,
            (RacePhase::Racing, RaceEvent::RaceFinished) => RacePhase::Complete,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut RaceStateMachine, event: RaceEvent) -> RacePhase {
        let plan = sm.plan(event).unwrap();
        sm.apply(plan.id).unwrap()
    }

    #[test]
    fn initial_phase_is_not_started() {
        let sm = RaceStateMachine::new();
        assert_eq!(sm.phase(), RacePhase::NotStarted);
    }

    #[test]
    fn full_happy_path_through_race() {
        let mut sm = RaceStateMachine::new();

        assert_eq!(apply(&mut sm, RaceEvent::RoomFull), RacePhase::Countdown);
        assert_eq!(
            apply(&mut sm, RaceEvent::CountdownElapsed),
            RacePhase::Racing
        );
        assert_eq!(apply(&mut sm, RaceEvent::RaceFinished), RacePhase::Complete);
    }

    #[test]
    fn no_transition_leaves_complete() {
        let mut sm = RaceStateMachine::new();
        apply(&mut sm, RaceEvent::RoomFull);
        apply(&mut sm, RaceEvent::CountdownElapsed);
        apply(&mut sm, RaceEvent::RaceFinished);

        for event in [
            RaceEvent::RoomFull,
            RaceEvent::CountdownElapsed,
            RaceEvent::RaceFinished,
        ] {
            let err = sm.plan(event).unwrap_err();
            match err {
                PlanError::InvalidTransition(invalid) => {
                    assert_eq!(invalid.from, RacePhase::Complete);
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn phases_are_never_revisited() {
        let mut sm = RaceStateMachine::new();
        apply(&mut sm, RaceEvent::RoomFull);

        let err = sm.plan(RaceEvent::RoomFull).unwrap_err();
        assert_eq!(
            err,
            PlanError::InvalidTransition(InvalidTransition {
                from: RacePhase::Countdown,
                event: RaceEvent::RoomFull,
            })
        );
    }

    #[test]
    fn second_plan_while_pending_is_rejected() {
        let mut sm = RaceStateMachine::new();
        let _plan = sm.plan(RaceEvent::RoomFull).unwrap();

        let err = sm.plan(RaceEvent::RoomFull).unwrap_err();
        assert_eq!(err, PlanError::AlreadyPending);
    }

    #[test]
    fn apply_with_wrong_id_keeps_plan_pending() {
        let mut sm = RaceStateMachine::new();
        let plan = sm.plan(RaceEvent::RoomFull).unwrap();

        let err = sm.apply(Uuid::new_v4()).unwrap_err();
        match err {
            ApplyError::IdMismatch { expected, .. } => assert_eq!(expected, plan.id),
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(sm.apply(plan.id).unwrap(), RacePhase::Countdown);
    }

    #[test]
    fn abort_clears_pending() {
        let mut sm = RaceStateMachine::new();
        let plan = sm.plan(RaceEvent::RoomFull).unwrap();
        sm.abort(plan.id).unwrap();
        assert_eq!(sm.phase(), RacePhase::NotStarted);
        assert!(sm.snapshot().pending.is_none());
    }

    #[test]
    fn snapshot_reflects_pending_transition() {
        let mut sm = RaceStateMachine::new();
        let _plan = sm.plan(RaceEvent::RoomFull).unwrap();
        let snapshot = sm.snapshot();
        assert_eq!(snapshot.phase, RacePhase::NotStarted);
        assert_eq!(snapshot.pending, Some(RacePhase::Countdown));
        assert_eq!(snapshot.version, 0);
    }
}
