//! Aggregation of finalized finish records into the ordered leaderboard and
//! the exactly-once race-completion decision.

use std::sync::Mutex;

use indexmap::IndexMap;

use crate::dto::leaderboard::{FinishRecord, Leaderboard, ParticipantId};

/// Result of submitting one finish record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// True for exactly one submit per session: the one that filled the
    /// expected participant count.
    pub complete: bool,
    /// The final ordered leaderboard, present iff `complete`.
    pub leaderboard: Option<Leaderboard>,
}

#[derive(Debug, Default)]
struct AggregatorInner {
    expected: Option<usize>,
    records: IndexMap<ParticipantId, FinishRecord>,
    completed: bool,
}

/// Collects finish records and decides when the race is over.
///
/// All checks and the completion flip happen under one mutex, so exactly one
/// caller observes `complete = true` even when the triggering condition is
/// reached by concurrent submissions.
#[derive(Debug, Default)]
pub struct LeaderboardAggregator {
    inner: Mutex<AggregatorInner>,
}

impl LeaderboardAggregator {
    /// Unarmed aggregator; [`LeaderboardAggregator::arm`] must run at race start.
    pub fn new() -> Self {
        Self::default()
    }

    /// Freeze the number of finishers required for natural completion.
    pub fn arm(&self, expected: usize) {
        let mut inner = self.inner.lock().expect("aggregator lock poisoned");
        assert!(
            inner.expected.is_none() && inner.records.is_empty(),
            "aggregator armed twice for the same session"
        );
        assert!(expected >= 1, "a race needs at least one participant");
        inner.expected = Some(expected);
    }

    /// Record one finish and report whether it completed the race.
    ///
    /// Callers must have deduplicated the participant id already (the finish
    /// tracker and this map must agree); a duplicate or post-completion submit
    /// means the single-writer discipline was violated upstream.
    pub fn submit(&self, record: FinishRecord) -> SubmitOutcome {
        let mut inner = self.inner.lock().expect("aggregator lock poisoned");

        assert!(
            !inner.completed,
            "finish record submitted after leaderboard completion"
        );
        let expected = inner
            .expected
            .expect("finish record submitted before the aggregator was armed");
        assert!(
            !inner.records.contains_key(&record.participant_id),
            "duplicate finish record slipped past the finish tracker"
        );

        inner.records.insert(record.participant_id, record);
        debug_assert!(inner.records.len() <= expected);

        if inner.records.len() == expected {
            inner.completed = true;
            SubmitOutcome {
                complete: true,
                leaderboard: Some(build_leaderboard(&inner.records)),
            }
        } else {
            SubmitOutcome {
                complete: false,
                leaderboard: None,
            }
        }
    }

    /// Close the race with whatever records exist (forced completion after a
    /// participant dropped out). The ordering rule is the same as for natural
    /// completion.
    pub fn finalize(&self) -> Leaderboard {
        let mut inner = self.inner.lock().expect("aggregator lock poisoned");
        assert!(
            !inner.completed,
            "leaderboard finalized twice for the same session"
        );
        inner.completed = true;
        build_leaderboard(&inner.records)
    }

    /// Number of distinct finishers recorded so far.
    pub fn records_len(&self) -> usize {
        self.inner
            .lock()
            .expect("aggregator lock poisoned")
            .records
            .len()
    }
}

/// Ascending finish time, ties broken by ascending participant id.
fn build_leaderboard(records: &IndexMap<ParticipantId, FinishRecord>) -> Leaderboard {
    let mut entries: Vec<FinishRecord> = records.values().cloned().collect();
    entries.sort_by(|a, b| {
        a.finish_time
            .cmp(&b.finish_time)
            .then_with(|| a.participant_id.cmp(&b.participant_id))
    });
    Leaderboard { entries }
}
