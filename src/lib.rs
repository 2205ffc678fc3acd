//! Authoritative race-session coordinator: synchronized countdown, per-participant
//! finish dedup, leaderboard aggregation, and the exactly-once completion decision.
//!
//! The crate is transport-agnostic: inbound commands ([`dto::command::InboundCommand`])
//! are assumed to be delivered reliably and in order per participant, and outbound
//! events ([`dto::event::OutboundEvent`]) are handed to the embedding network layer
//! through a broadcast subscription.

pub mod clock;
pub mod config;
pub mod dto;
pub mod error;
pub mod services;
pub mod state;

pub use clock::{ClockSource, ManualClock, MonotonicClock};
pub use config::RaceConfig;
pub use dto::command::InboundCommand;
pub use dto::event::OutboundEvent;
pub use dto::leaderboard::{FinishRecord, Leaderboard, ParticipantId};
pub use error::ServiceError;
pub use state::state_machine::RacePhase;
pub use state::{SessionState, SharedState};
