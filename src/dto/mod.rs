//! Message contracts exchanged with the embedding transport layer.

/// Inbound commands delivered by the transport to the authority.
pub mod command;
/// Outbound events broadcast from the authority to all participants.
pub mod event;
/// Finish records and the final ordered leaderboard.
pub mod leaderboard;
