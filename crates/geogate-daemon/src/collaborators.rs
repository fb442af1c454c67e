//! Collaborator seams
//!
//! Each request is one-shot: no retries, no timeouts, no cancellation. A call
//! that never returns simply leaves the controller waiting.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use geogate_core::{
    AppLifecycle, ChallengeError, Coordinate, FixOptions, PermissionId, PermissionResponse,
    PositionError, SensorAvailability,
};

/// Source of a single geographic fix
#[async_trait]
pub trait PositionProvider: Send + Sync {
    async fn get_fix(&self, options: FixOptions) -> Result<Coordinate, PositionError>;
}

/// OS permission dialog
#[async_trait]
pub trait PermissionGate: Send + Sync {
    async fn request(&self, permission: &PermissionId) -> PermissionResponse;
}

/// Biometric sensor and prompt
#[async_trait]
pub trait BiometricChallenger: Send + Sync {
    /// Sensor availability and capability class
    async fn check_availability(&self) -> Result<SensorAvailability, ChallengeError>;

    /// Show one prompt; `Ok(false)` means the user did not pass
    async fn challenge(&self, prompt: &str) -> Result<bool, ChallengeError>;
}

/// Host foreground/background transitions
pub trait LifecycleSignal: Send + Sync {
    /// Receive every transition from now on, in emission order
    ///
    /// Delivery is lossless: a slow subscriber queues transitions instead of
    /// skipping them. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<AppLifecycle>;
}

/// Sink for the user-visible success confirmation
pub trait Notifier: Send + Sync {
    fn confirm(&self, message: &str);
}

/// The set of collaborators owned by one lock actor
#[derive(Clone)]
pub struct Collaborators {
    pub position: Arc<dyn PositionProvider>,
    pub permissions: Arc<dyn PermissionGate>,
    pub biometrics: Arc<dyn BiometricChallenger>,
    pub lifecycle: Arc<dyn LifecycleSignal>,
    pub notifier: Arc<dyn Notifier>,
}
