//! Failure taxonomy for the lock gate
//!
//! None of these are returned from a controller operation. Collaborator failures
//! are absorbed into state and the most recent one is kept for diagnostics.

use thiserror::Error;

use crate::types::PermissionResponse;

/// A failure absorbed by the controller
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    /// The position provider could not produce a fix
    #[error("Position unavailable: {0}")]
    PositionUnavailable(String),

    /// Denied, blocked and unavailable are all handled the same way
    #[error("Location permission not granted ({0:?})")]
    PermissionNotGranted(PermissionResponse),

    /// The user did not pass the biometric prompt
    #[error("Biometric challenge failed")]
    ChallengeFailed,

    /// Sensor or hardware fault during the prompt
    #[error("Biometric challenge error: {0}")]
    ChallengeError(String),
}

/// Failure reported by a position provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Position fix failed: {reason}")]
pub struct PositionError {
    pub reason: String,
}

impl PositionError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Failure reported by a biometric challenger
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChallengeError {
    #[error("No biometric sensor available")]
    SensorUnavailable,

    #[error("Prompt dismissed")]
    Cancelled,

    #[error("Sensor fault: {0}")]
    Hardware(String),
}

impl From<PositionError> for GateError {
    fn from(e: PositionError) -> Self {
        GateError::PositionUnavailable(e.reason)
    }
}

impl From<ChallengeError> for GateError {
    fn from(e: ChallengeError) -> Self {
        GateError::ChallengeError(e.to_string())
    }
}
