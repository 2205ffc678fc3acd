use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{DurationSecondsWithFrac, serde_as};
use uuid::Uuid;

/// Opaque identifier for a connected player, stable for the session lifetime.
///
/// The transport layer allocates it; the core only compares and stores it. Its
/// `Ord` impl is the deterministic tie-break for equal finish times.
pub type ParticipantId = Uuid;

/// A single participant's finalized finish, immutable once created.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishRecord {
    /// Participant that crossed the finish line.
    pub participant_id: ParticipantId,
    /// Display name reported alongside the finish.
    pub display_name: String,
    /// Duration between the race start and the finish, measured on the authority.
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub finish_time: Duration,
}

/// Final ordered ranking of all recorded finish times for a session.
///
/// Entries are ascending in finish time, ties broken by ascending participant
/// id. Built once, immutable after publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Leaderboard {
    /// Ranked finish records, winner first.
    pub entries: Vec<FinishRecord>,
}

impl Leaderboard {
    /// Number of ranked participants.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no participant was recorded (e.g. a forced completion before
    /// any finish).
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
