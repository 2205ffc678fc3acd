//! Coordinator operations driving the race lifecycle: roster intake, the
//! countdown hand-off, finish-report handling, and leaderboard publication.
//!
//! Misbehaving or lagging clients must not be able to disrupt a session, so
//! protocol violations (reports outside the racing phase, unknown or
//! duplicate participants) are logged and dropped rather than surfaced as
//! errors.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::{
    dto::{
        command::InboundCommand,
        event::OutboundEvent,
        leaderboard::{FinishRecord, Leaderboard, ParticipantId},
    },
    error::ServiceError,
    services::countdown,
    state::{
        SharedState,
        state_machine::{RaceEvent, RacePhase},
    },
};

/// Dispatch one inbound transport message to the matching operation.
pub async fn handle_command(state: &SharedState, command: InboundCommand) {
    match command {
        InboundCommand::ParticipantReady { participant_id } => {
            participant_ready(state, participant_id).await;
        }
        InboundCommand::ReportFinish {
            participant_id,
            display_name,
        } => {
            report_finish(state, participant_id, display_name).await;
        }
        InboundCommand::AbortSession => abort_session(state).await,
    }
}

/// Register a ready participant; starts the countdown once the roster reaches
/// the configured room size.
pub async fn participant_ready(state: &SharedState, participant_id: ParticipantId) {
    if state.is_aborted() {
        debug!(%participant_id, "ready signal after abort ignored");
        return;
    }
    if state.phase().await != RacePhase::NotStarted {
        debug!(%participant_id, "ready signal after race start ignored");
        return;
    }

    let (added, roster_len) = state
        .with_session(|session| {
            let added = session.join(participant_id);
            (added, session.roster_len())
        })
        .await;

    if !added {
        debug!(%participant_id, "duplicate ready signal ignored");
        return;
    }

    let room_size = state.config().room_size;
    if roster_len > room_size {
        warn!(%participant_id, roster_len, room_size, "roster overflow; extra participant ignored");
        return;
    }

    info!(%participant_id, roster_len, room_size, "participant ready");

    if roster_len == room_size
        && let Err(err) = start_countdown(state).await
    {
        warn!(error = %err, "room filled but countdown could not start");
    }
}

/// Handle a finish assertion from the transport layer.
///
/// A no-op unless the race is running, the participant is on the roster, and
/// it has not finished before. The finish time is computed here from the
/// authoritative clock, never taken from the report. The first submission that
/// completes the expected count flips the session to `Complete` and publishes
/// the leaderboard, exactly once.
pub async fn report_finish(
    state: &SharedState,
    participant_id: ParticipantId,
    display_name: String,
) {
    // One report at a time through the dedup-check / submit pipeline.
    let _gate = state.finish_gate().lock().await;

    if state.is_aborted() {
        debug!(%participant_id, "finish report after abort ignored");
        return;
    }
    if state.phase().await != RacePhase::Racing {
        debug!(%participant_id, "finish report outside racing phase ignored");
        return;
    }

    let (on_roster, race_start) = state
        .read_session(|session| (session.is_on_roster(&participant_id), session.race_start()))
        .await;

    if !on_roster {
        warn!(%participant_id, "finish report from unknown participant ignored");
        return;
    }
    let race_start = race_start.expect("race start is recorded before the racing phase");

    if !state.finish_tracker().record(participant_id) {
        debug!(%participant_id, "duplicate finish report ignored");
        return;
    }

    let finish_time = state.clock_now().saturating_sub(race_start);
    info!(
        %participant_id,
        display_name,
        finish_secs = finish_time.as_secs_f64(),
        "participant finished"
    );

    let outcome = state.aggregator().submit(FinishRecord {
        participant_id,
        display_name,
        finish_time,
    });

    if outcome.complete {
        let leaderboard = outcome
            .leaderboard
            .expect("complete outcome carries the leaderboard");
        // The aggregator hands `complete` to exactly one submit, so this
        // transition cannot race with another finish report.
        state
            .run_transition(RaceEvent::RaceFinished, || async { Ok(()) })
            .await
            .expect("race completion transition applies exactly once");
        publish_leaderboard(state, leaderboard);
    }
}

/// Close the race with a partial leaderboard.
///
/// Hook for an external supervisor when a participant disconnects without
/// finishing and the expected count can never be satisfied; the timeout
/// policy that decides *when* to call this lives with the supervisor.
pub async fn force_complete(state: &SharedState) -> Result<Leaderboard, ServiceError> {
    let _gate = state.finish_gate().lock().await;

    if state.is_aborted() {
        return Err(ServiceError::Aborted);
    }

    let (leaderboard, _next) = state
        .run_transition(RaceEvent::RaceFinished, || async {
            Ok(state.aggregator().finalize())
        })
        .await?;

    let expected = state
        .read_session(|session| session.expected_participants())
        .await;
    warn!(
        recorded = leaderboard.len(),
        ?expected,
        "race force-completed with partial leaderboard"
    );
    publish_leaderboard(state, leaderboard.clone());
    Ok(leaderboard)
}

/// Abort the session: stops the countdown and turns every subsequent inbound
/// operation into a no-op. Idempotent.
pub async fn abort_session(state: &SharedState) {
    if state.is_aborted() {
        return;
    }
    state.mark_aborted();
    info!(phase = ?state.phase().await, "session aborted");
}

/// Running race time for presentation layers; `None` before the race starts.
pub async fn elapsed(state: &SharedState) -> Option<Duration> {
    let race_start = state.read_session(|session| session.race_start()).await?;
    Some(state.clock_now().saturating_sub(race_start))
}

/// Freeze the roster, arm the aggregator, and spawn the countdown task.
async fn start_countdown(state: &SharedState) -> Result<(), ServiceError> {
    let (expected, _next) = state
        .run_transition(RaceEvent::RoomFull, || async {
            let expected = state.with_session(|session| session.capture_expected()).await;
            state.aggregator().arm(expected);
            Ok(expected)
        })
        .await?;

    info!(expected, "room full; countdown started");

    let task_state = Arc::clone(state);
    tokio::spawn(async move {
        let config = task_state.config();
        let completed = countdown::run(
            config.countdown,
            config.countdown_tick,
            task_state.events(),
            task_state.abort_watcher(),
        )
        .await;

        if completed
            && let Err(err) = begin_racing(&task_state).await
        {
            warn!(error = %err, "countdown elapsed but the race could not start");
        }
    });

    Ok(())
}

/// Open the finish line: record the race-start timestamp and announce the start.
async fn begin_racing(state: &SharedState) -> Result<(), ServiceError> {
    if state.is_aborted() {
        debug!("countdown finished after abort; race not started");
        return Ok(());
    }

    let (start_timestamp, _next) = state
        .run_transition(RaceEvent::CountdownElapsed, || async {
            let start = state.clock_now();
            state
                .with_session(|session| session.set_race_start(start))
                .await;
            Ok(start)
        })
        .await?;

    info!(start_secs = start_timestamp.as_secs_f64(), "race started");
    state
        .events()
        .broadcast(OutboundEvent::RaceStarted { start_timestamp });
    Ok(())
}

fn publish_leaderboard(state: &SharedState, leaderboard: Leaderboard) {
    info!(entries = leaderboard.len(), "leaderboard published");
    state
        .events()
        .broadcast(OutboundEvent::LeaderboardPublished { leaderboard });
}
