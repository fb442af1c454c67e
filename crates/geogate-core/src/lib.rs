//! Geogate Core - Lock state machine for a location-gated biometric unlock
//!
//! This crate provides:
//! - The session data model (coordinate, permission, challenge, lock and lifecycle state)
//! - Typed events delivered by the collaborators and the effects the controller requests
//! - The [`LockController`] that serializes those events into one consistent lock state
//! - The absorbed-failure taxonomy ([`GateError`])
//!
//! Nothing in here performs I/O. The controller is driven one event at a time and
//! answers with the [`Effect`]s the runtime must carry out.

pub mod controller;
pub mod error;
pub mod event;
pub mod policy;
pub mod types;

pub use controller::LockController;
pub use error::{ChallengeError, GateError, PositionError};
pub use event::{Effect, LockEvent};
pub use policy::{ControllerPolicy, UnlockRequestPolicy};
pub use types::{
    AppLifecycle, BiometryKind, ChallengeId, ChallengeOutcome, Coordinate, FixOptions,
    LockSnapshot, LockState, PermissionId, PermissionRequestId, PermissionResponse,
    PermissionState, SensorAvailability,
};
