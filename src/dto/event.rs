use std::time::Duration;

use serde::Serialize;
use serde_with::{DurationSecondsWithFrac, serde_as};

use crate::dto::leaderboard::Leaderboard;

/// Events broadcast from the authority to every participant.
///
/// The embedding network layer drains these from the session's broadcast
/// subscription and fans them out; the core never talks to sockets itself.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// The countdown display value changed.
    CountdownPhase {
        /// Whole seconds left before the race starts (ceiling of remaining time).
        seconds_remaining: u64,
    },
    /// Remaining time crossed below two seconds; participants leave their
    /// resting pose. Fires exactly once per countdown.
    CountdownCue,
    /// The countdown elapsed and the race is on.
    RaceStarted {
        /// Authoritative clock reading at race start.
        #[serde_as(as = "DurationSecondsWithFrac<f64>")]
        start_timestamp: Duration,
    },
    /// All expected participants reported (or completion was forced); the
    /// ranking is final.
    LeaderboardPublished {
        /// The final ordered leaderboard.
        leaderboard: Leaderboard,
    },
}
