use std::time::Duration;

use indexmap::IndexSet;

use crate::dto::leaderboard::ParticipantId;

/// Mutable per-session data owned by the coordinator: who joined, how many
/// finishers are expected, and when the race actually started.
///
/// Lives exactly as long as the coordinator itself; discarded after the
/// leaderboard is published or the session is aborted.
#[derive(Debug, Default)]
pub struct RaceSession {
    roster: IndexSet<ParticipantId>,
    expected_participants: Option<usize>,
    race_start: Option<Duration>,
}

impl RaceSession {
    /// Fresh session with an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a ready participant. Returns `false` when the id was already
    /// on the roster (duplicate delivery).
    pub fn join(&mut self, participant_id: ParticipantId) -> bool {
        self.roster.insert(participant_id)
    }

    /// Number of participants currently on the roster.
    pub fn roster_len(&self) -> usize {
        self.roster.len()
    }

    /// Whether the given participant ever announced itself ready.
    pub fn is_on_roster(&self, participant_id: &ParticipantId) -> bool {
        self.roster.contains(participant_id)
    }

    /// Freeze the room size at race start; the aggregator completes against
    /// this count.
    pub fn capture_expected(&mut self) -> usize {
        let expected = self.roster.len();
        self.expected_participants = Some(expected);
        expected
    }

    /// The frozen participant count, if the countdown already started.
    pub fn expected_participants(&self) -> Option<usize> {
        self.expected_participants
    }

    /// Record the authoritative race-start clock reading.
    pub fn set_race_start(&mut self, start: Duration) {
        self.race_start = Some(start);
    }

    /// Clock reading at race start, present from the `Racing` phase onwards.
    pub fn race_start(&self) -> Option<Duration> {
        self.race_start
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn duplicate_join_is_detected() {
        let mut session = RaceSession::new();
        let id = Uuid::from_u128(1);

        assert!(session.join(id));
        assert!(!session.join(id));
        assert_eq!(session.roster_len(), 1);
    }

    #[test]
    fn expected_count_is_frozen_at_capture_time() {
        let mut session = RaceSession::new();
        session.join(Uuid::from_u128(1));
        session.join(Uuid::from_u128(2));

        assert_eq!(session.expected_participants(), None);
        assert_eq!(session.capture_expected(), 2);

        // Later joins must not move the completion target.
        session.join(Uuid::from_u128(3));
        assert_eq!(session.expected_participants(), Some(2));
    }

    #[test]
    fn race_start_is_absent_until_recorded() {
        let mut session = RaceSession::new();
        assert_eq!(session.race_start(), None);

        session.set_race_start(Duration::from_secs(5));
        assert_eq!(session.race_start(), Some(Duration::from_secs(5)));
    }
}
