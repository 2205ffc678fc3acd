/// Countdown timer task emitting phase events.
pub mod countdown;
/// Per-participant finish deduplication.
pub mod finish_tracker;
/// Finish aggregation, leaderboard ordering, and the completion decision.
pub mod leaderboard;
/// Coordinator operations driving the race lifecycle.
pub mod session_service;
