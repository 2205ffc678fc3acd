use serde::{Deserialize, Serialize};

use crate::dto::leaderboard::ParticipantId;

/// Commands delivered to the authority by the transport layer.
///
/// Delivery is assumed reliable and ordered per participant; duplicates may
/// still occur and are absorbed by the coordinator's idempotent handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum InboundCommand {
    /// A participant joined the room and is ready to race.
    ParticipantReady {
        /// Identifier assigned by the transport layer.
        participant_id: ParticipantId,
    },
    /// A participant asserts it crossed the finish line.
    ///
    /// The finish time is deliberately absent: the authority stamps it from
    /// its own clock to keep client skew out of the leaderboard.
    ReportFinish {
        /// Identifier assigned by the transport layer.
        participant_id: ParticipantId,
        /// Name to show on the leaderboard.
        display_name: String,
    },
    /// Tear the session down, cancelling any countdown or race in progress.
    AbortSession,
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn commands_round_trip_through_the_wire_shape() {
        let command = InboundCommand::ReportFinish {
            participant_id: Uuid::from_u128(3),
            display_name: "Bo".into(),
        };

        let json = serde_json::to_value(&command).unwrap();
        assert_eq!(json["command"], "report_finish");

        let back: InboundCommand = serde_json::from_value(json).unwrap();
        assert_eq!(back, command);
    }
}
