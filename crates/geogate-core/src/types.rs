//! Session data model for the lock gate

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::GateError;

/// Permission requested before an unlock attempt (Android fine location)
pub const DEFAULT_PERMISSION: &str = "android.permission.ACCESS_FINE_LOCATION";

/// A resolved geographic fix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

/// Answer from the permission gate for a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionResponse {
    /// The capability does not exist on this device
    Unavailable,
    /// The user declined, a later request may still be granted
    Denied,
    Granted,
    /// The user declined permanently
    Blocked,
}

impl PermissionResponse {
    pub fn is_granted(self) -> bool {
        matches!(self, PermissionResponse::Granted)
    }
}

/// Recorded permission state
///
/// `Unrequested` is the initial value and is never re-entered once a response arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    #[default]
    Unrequested,
    Unavailable,
    Denied,
    Granted,
    Blocked,
}

impl From<PermissionResponse> for PermissionState {
    fn from(response: PermissionResponse) -> Self {
        match response {
            PermissionResponse::Unavailable => PermissionState::Unavailable,
            PermissionResponse::Denied => PermissionState::Denied,
            PermissionResponse::Granted => PermissionState::Granted,
            PermissionResponse::Blocked => PermissionState::Blocked,
        }
    }
}

/// Outcome of the most recent biometric challenge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeOutcome {
    Pending,
    Succeeded,
    Failed,
}

/// What the user is shown
///
/// `Unlocked` means the unlock control is offered. It says nothing about whether
/// the user passed a biometric challenge; that record lives in [`ChallengeOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    #[default]
    Locked,
    Unlocked,
}

impl LockState {
    pub fn is_unlocked(self) -> bool {
        matches!(self, LockState::Unlocked)
    }
}

/// Host activity state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppLifecycle {
    /// Visible and active
    #[default]
    Foreground,
    /// Suspended or inactive
    Background,
}

/// Biometric capability class reported by the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiometryKind {
    #[default]
    None,
    Fingerprint,
    Face,
    Generic,
}

impl fmt::Display for BiometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BiometryKind::None => "none",
            BiometryKind::Fingerprint => "fingerprint",
            BiometryKind::Face => "face",
            BiometryKind::Generic => "generic biometrics",
        };
        f.write_str(name)
    }
}

/// Sensor availability metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SensorAvailability {
    pub available: bool,
    pub kind: BiometryKind,
}

impl SensorAvailability {
    pub fn new(available: bool, kind: BiometryKind) -> Self {
        Self { available, kind }
    }

    /// Effective capability class; an unavailable sensor has none
    pub fn capability(&self) -> BiometryKind {
        if self.available {
            self.kind
        } else {
            BiometryKind::None
        }
    }
}

/// Name of a permission understood by the permission gate
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionId(pub String);

impl PermissionId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PermissionId {
    fn default() -> Self {
        Self::new(DEFAULT_PERMISSION)
    }
}

impl fmt::Display for PermissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Options passed to the position provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FixOptions {
    /// Ask for a GPS-grade fix instead of a coarse one
    pub high_accuracy: bool,
    /// Maximum age of a cached fix in milliseconds (0 = always fresh)
    pub max_age_ms: u64,
}

impl FixOptions {
    pub fn max_age(&self) -> Duration {
        Duration::from_millis(self.max_age_ms)
    }
}

/// Correlation id of an issued biometric challenge
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChallengeId(pub u64);

impl fmt::Display for ChallengeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "challenge#{}", self.0)
    }
}

/// Correlation id of an issued permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PermissionRequestId(pub u64);

impl fmt::Display for PermissionRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "permission#{}", self.0)
    }
}

/// Point-in-time copy of everything the controller owns
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LockSnapshot {
    pub lock_state: LockState,
    pub coordinate: Option<Coordinate>,
    pub permission: PermissionState,
    /// Outcome of the latest challenge, `None` until one is issued
    pub challenge: Option<ChallengeOutcome>,
    pub lifecycle: AppLifecycle,
    /// Diagnostic only, never consulted by a transition
    pub sensor: Option<SensorAvailability>,
    /// Permission requests issued but not yet answered
    pub permission_requests_in_flight: usize,
    pub permission_requests_issued: u64,
    pub challenges_issued: u64,
    pub confirmations_emitted: u64,
    pub events_handled: u64,
    /// Most recent failure absorbed into state
    pub last_failure: Option<GateError>,
}

impl LockSnapshot {
    pub fn challenge_pending(&self) -> bool {
        self.challenge == Some(ChallengeOutcome::Pending)
    }
}
