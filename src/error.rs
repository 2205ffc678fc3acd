use thiserror::Error;

use crate::state::state_machine::{AbortError, ApplyError, PlanError};

/// Errors that can occur in coordinator operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Operation cannot be performed in the current race phase.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Invalid input provided by the embedding layer.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The session has been aborted and no longer accepts operations.
    #[error("session aborted")]
    Aborted,
    /// Transition work exceeded its timeout limit.
    #[error("operation timed out")]
    Timeout,
}

impl From<PlanError> for ServiceError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::AlreadyPending => {
                ServiceError::InvalidState("phase transition already pending".into())
            }
            PlanError::InvalidTransition(invalid) => {
                ServiceError::InvalidState(invalid.to_string())
            }
        }
    }
}

impl From<ApplyError> for ServiceError {
    fn from(err: ApplyError) -> Self {
        match err {
            ApplyError::NoPending => ServiceError::InvalidState("no transition is pending".into()),
            ApplyError::IdMismatch { .. } => {
                ServiceError::InvalidState("pending transition does not match".into())
            }
            ApplyError::PhaseMismatch { expected, actual } => ServiceError::InvalidState(format!(
                "phase changed during transition (expected {expected:?}, got {actual:?})"
            )),
            ApplyError::VersionMismatch { expected, actual } => {
                ServiceError::InvalidState(format!(
                    "phase version mismatch during transition (expected {expected}, got {actual})"
                ))
            }
        }
    }
}

impl From<AbortError> for ServiceError {
    fn from(err: AbortError) -> Self {
        match err {
            AbortError::NoPending => ServiceError::InvalidState("no pending transition".into()),
            AbortError::IdMismatch { .. } => {
                ServiceError::InvalidState("transition plan does not match".into())
            }
        }
    }
}
