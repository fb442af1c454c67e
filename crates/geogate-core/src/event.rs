//! Messages into and out of the lock controller

use crate::error::{ChallengeError, PositionError};
use crate::types::{
    AppLifecycle, ChallengeId, Coordinate, FixOptions, PermissionId, PermissionRequestId,
    PermissionResponse, SensorAvailability,
};

/// Everything the controller reacts to
#[derive(Debug, Clone, PartialEq)]
pub enum LockEvent {
    /// Answer to [`Effect::CheckAvailability`]
    SensorAvailability(Result<SensorAvailability, ChallengeError>),

    /// Answer to [`Effect::RequestPosition`]
    PositionResult(Result<Coordinate, PositionError>),

    /// Answer to [`Effect::RequestPermission`]
    PermissionResult {
        request: PermissionRequestId,
        response: PermissionResponse,
    },

    /// Answer to [`Effect::IssueChallenge`]; `Ok(false)` is a rejected attempt
    ChallengeResult {
        challenge: ChallengeId,
        result: Result<bool, ChallengeError>,
    },

    /// Host moved between foreground and background
    Lifecycle(AppLifecycle),

    /// The user tapped the unlock control
    UnlockRequested,

    /// Explicit request for a new biometric challenge
    StartChallenge,
}

impl LockEvent {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            LockEvent::SensorAvailability(_) => "sensor_availability",
            LockEvent::PositionResult(_) => "position_result",
            LockEvent::PermissionResult { .. } => "permission_result",
            LockEvent::ChallengeResult { .. } => "challenge_result",
            LockEvent::Lifecycle(_) => "lifecycle",
            LockEvent::UnlockRequested => "unlock_requested",
            LockEvent::StartChallenge => "start_challenge",
        }
    }
}

/// Work the runtime performs on behalf of the controller
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Query the biometric sensor for its capability class
    CheckAvailability,

    /// Ask the position provider for one fix
    RequestPosition(FixOptions),

    /// Ask the permission gate for a permission
    RequestPermission {
        request: PermissionRequestId,
        permission: PermissionId,
    },

    /// Show one biometric prompt
    IssueChallenge {
        challenge: ChallengeId,
        prompt: String,
    },

    /// Show the user-visible success confirmation
    Confirm {
        challenge: ChallengeId,
        message: String,
    },
}
