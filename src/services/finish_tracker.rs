//! Per-participant finish dedup. Duplicate network delivery and multiple
//! finish-line triggers for the same player are absorbed here.

use dashmap::DashMap;

use crate::dto::leaderboard::ParticipantId;

/// Records which participants already finished, exactly once each.
///
/// The lookup-and-insert is a single atomic check-and-set per id: no two
/// concurrent calls for the same participant can both observe `true`.
#[derive(Debug, Default)]
pub struct FinishTracker {
    finished: DashMap<ParticipantId, ()>,
}

impl FinishTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finish for `participant_id`.
    ///
    /// Returns `true` only the first time the id is seen; later calls are
    /// no-ops returning `false`.
    pub fn record(&self, participant_id: ParticipantId) -> bool {
        self.finished.insert(participant_id, ()).is_none()
    }

    /// Number of distinct participants recorded so far.
    pub fn len(&self) -> usize {
        self.finished.len()
    }

    /// True when nobody has finished yet.
    pub fn is_empty(&self) -> bool {
        self.finished.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use uuid::Uuid;

    use super::*;

    #[test]
    fn first_record_accepted_later_ones_rejected() {
        let tracker = FinishTracker::new();
        let id = Uuid::from_u128(1);

        assert!(tracker.record(id));
        assert!(!tracker.record(id));
        assert!(!tracker.record(id));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn distinct_participants_are_independent() {
        let tracker = FinishTracker::new();
        assert!(tracker.record(Uuid::from_u128(1)));
        assert!(tracker.record(Uuid::from_u128(2)));
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn concurrent_records_for_same_id_accept_exactly_one() {
        let tracker = Arc::new(FinishTracker::new());
        let id = Uuid::from_u128(42);
        let accepted = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                let accepted = Arc::clone(&accepted);
                std::thread::spawn(move || {
                    if tracker.record(id) {
                        accepted.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(accepted.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.len(), 1);
    }
}
