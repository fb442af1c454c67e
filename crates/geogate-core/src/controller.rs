//! Lock controller
//!
//! Owns the lock state and decides when a biometric challenge is issued.
//!
//! Rules:
//! - A position fix is the only way to reach `Unlocked`, and `Unlocked` is never left
//! - At most one challenge is pending; a second start while pending is dropped
//! - Returning to the foreground while unlocked starts a challenge
//! - A granted permission starts a challenge only if a fix is already known
//! - A passed challenge emits one confirmation and leaves the lock state alone
//! - Failures are absorbed into state; no operation reports an error to its caller

use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::error::{ChallengeError, GateError, PositionError};
use crate::event::{Effect, LockEvent};
use crate::policy::{ControllerPolicy, UnlockRequestPolicy};
use crate::types::{
    AppLifecycle, BiometryKind, ChallengeId, ChallengeOutcome, Coordinate, LockSnapshot,
    LockState, PermissionRequestId, PermissionResponse, PermissionState, SensorAvailability,
};

/// Latest challenge and the id its result must carry
#[derive(Debug, Clone, Copy)]
struct ChallengeRecord {
    id: ChallengeId,
    outcome: ChallengeOutcome,
}

/// Session-scoped lock state machine
#[derive(Debug)]
pub struct LockController {
    policy: ControllerPolicy,
    lock_state: LockState,
    coordinate: Option<Coordinate>,
    permission: PermissionState,
    challenge: Option<ChallengeRecord>,
    lifecycle: AppLifecycle,
    sensor: Option<SensorAvailability>,
    permissions_in_flight: BTreeSet<PermissionRequestId>,
    next_challenge: u64,
    next_permission_request: u64,
    challenges_issued: u64,
    confirmations_emitted: u64,
    events_handled: u64,
    last_failure: Option<GateError>,
    started: bool,
}

impl Default for LockController {
    fn default() -> Self {
        Self::new(ControllerPolicy::default())
    }
}

impl LockController {
    /// Create a controller in its initial session state
    pub fn new(policy: ControllerPolicy) -> Self {
        Self {
            policy,
            lock_state: LockState::Locked,
            coordinate: None,
            permission: PermissionState::Unrequested,
            challenge: None,
            lifecycle: AppLifecycle::default(),
            sensor: None,
            permissions_in_flight: BTreeSet::new(),
            next_challenge: 0,
            next_permission_request: 0,
            challenges_issued: 0,
            confirmations_emitted: 0,
            events_handled: 0,
            last_failure: None,
            started: false,
        }
    }

    pub fn policy(&self) -> &ControllerPolicy {
        &self.policy
    }

    pub fn lock_state(&self) -> LockState {
        self.lock_state
    }

    pub fn coordinate(&self) -> Option<Coordinate> {
        self.coordinate
    }

    pub fn permission(&self) -> PermissionState {
        self.permission
    }

    pub fn challenge_outcome(&self) -> Option<ChallengeOutcome> {
        self.challenge.map(|c| c.outcome)
    }

    pub fn lifecycle(&self) -> AppLifecycle {
        self.lifecycle
    }

    pub fn sensor(&self) -> Option<SensorAvailability> {
        self.sensor
    }

    fn challenge_pending(&self) -> bool {
        self.challenge_outcome() == Some(ChallengeOutcome::Pending)
    }

    /// Startup requests: sensor availability and one position fix
    ///
    /// The two are independent and may resolve in either order. Listening to
    /// lifecycle transitions is the runtime's job. Calling this twice is a no-op.
    pub fn start(&mut self) -> Vec<Effect> {
        if self.started {
            debug!("Controller already started");
            return Vec::new();
        }
        self.started = true;
        vec![
            Effect::CheckAvailability,
            Effect::RequestPosition(self.policy.fix_options),
        ]
    }

    /// Apply one event to completion and return the effects it produced
    pub fn handle(&mut self, event: LockEvent) -> Vec<Effect> {
        self.events_handled += 1;
        debug!(event = event.name(), "Handling event");

        match event {
            LockEvent::SensorAvailability(result) => {
                self.on_sensor_availability(result);
                Vec::new()
            }
            LockEvent::PositionResult(result) => {
                self.on_position_result(result);
                Vec::new()
            }
            LockEvent::PermissionResult { request, response } => {
                self.on_permission_result(request, response)
            }
            LockEvent::ChallengeResult { challenge, result } => {
                self.on_challenge_result(challenge, result)
            }
            LockEvent::Lifecycle(state) => self.on_lifecycle_change(state),
            LockEvent::UnlockRequested => self.request_unlock(),
            LockEvent::StartChallenge => self.start_challenge(),
        }
    }

    /// Record the sensor capability class
    pub fn on_sensor_availability(&mut self, result: Result<SensorAvailability, ChallengeError>) {
        let sensor = match result {
            Ok(sensor) => sensor,
            Err(e) => {
                warn!("Biometric availability check failed: {}", e);
                SensorAvailability::default()
            }
        };

        match sensor.capability() {
            BiometryKind::None => info!("Biometrics not supported"),
            kind => info!("Biometric sensor available: {}", kind),
        }
        self.sensor = Some(sensor);
    }

    /// Apply the answer to the startup position request
    ///
    /// The first fix is kept for the rest of the session and latches the lock
    /// open. A failure leaves everything as it was.
    pub fn on_position_result(&mut self, result: Result<Coordinate, PositionError>) {
        match result {
            Ok(coordinate) => {
                if let Some(known) = self.coordinate {
                    debug!("Ignoring fix {}, already have {}", coordinate, known);
                    return;
                }
                info!("Position fix at {}, unlock offered", coordinate);
                self.coordinate = Some(coordinate);
                self.lock_state = LockState::Unlocked;
            }
            Err(e) => {
                warn!("{}", e);
                self.last_failure = Some(e.into());
            }
        }
    }

    /// Track the host lifecycle; a foreground return while unlocked re-authenticates
    pub fn on_lifecycle_change(&mut self, state: AppLifecycle) -> Vec<Effect> {
        info!("Lifecycle changed to {:?}", state);
        self.lifecycle = state;

        if state == AppLifecycle::Foreground && self.lock_state.is_unlocked() {
            debug!("Foreground while unlocked, attempting to unlock");
            return self.start_challenge();
        }
        Vec::new()
    }

    /// Issue a biometric challenge unless one is already pending
    pub fn start_challenge(&mut self) -> Vec<Effect> {
        if self.challenge_pending() {
            debug!("Challenge already pending, dropping start");
            return Vec::new();
        }

        self.next_challenge += 1;
        let id = ChallengeId(self.next_challenge);
        self.challenge = Some(ChallengeRecord {
            id,
            outcome: ChallengeOutcome::Pending,
        });
        self.challenges_issued += 1;
        debug!("Issuing {}", id);

        vec![Effect::IssueChallenge {
            challenge: id,
            prompt: self.policy.prompt_message.clone(),
        }]
    }

    /// Settle the pending challenge
    pub fn on_challenge_result(
        &mut self,
        id: ChallengeId,
        result: Result<bool, ChallengeError>,
    ) -> Vec<Effect> {
        let Some(record) = self.challenge.as_mut() else {
            warn!("Result for {} with no challenge issued", id);
            return Vec::new();
        };
        if record.id != id || record.outcome != ChallengeOutcome::Pending {
            warn!("Ignoring stale result for {}", id);
            return Vec::new();
        }

        match result {
            Ok(true) => {
                record.outcome = ChallengeOutcome::Succeeded;
                self.confirmations_emitted += 1;
                info!("Biometric authentication successful for {}", id);
                vec![Effect::Confirm {
                    challenge: id,
                    message: self.policy.confirmation_message.clone(),
                }]
            }
            Ok(false) => {
                record.outcome = ChallengeOutcome::Failed;
                info!("Biometric authentication failed, lock remains closed");
                self.last_failure = Some(GateError::ChallengeFailed);
                Vec::new()
            }
            Err(e) => {
                record.outcome = ChallengeOutcome::Failed;
                warn!("Biometric authentication error: {}", e);
                self.last_failure = Some(e.into());
                Vec::new()
            }
        }
    }

    /// The user tapped unlock: ask for the location permission
    pub fn request_unlock(&mut self) -> Vec<Effect> {
        if self.policy.unlock_requests == UnlockRequestPolicy::SingleFlight
            && !self.permissions_in_flight.is_empty()
        {
            debug!("Permission request already outstanding, dropping unlock request");
            return Vec::new();
        }

        self.next_permission_request += 1;
        let id = PermissionRequestId(self.next_permission_request);
        self.permissions_in_flight.insert(id);
        debug!("Requesting {} as {}", self.policy.permission, id);

        vec![Effect::RequestPermission {
            request: id,
            permission: self.policy.permission.clone(),
        }]
    }

    /// Apply a permission answer; granted plus a known fix starts a challenge
    pub fn on_permission_result(
        &mut self,
        id: PermissionRequestId,
        response: PermissionResponse,
    ) -> Vec<Effect> {
        if !self.permissions_in_flight.remove(&id) {
            warn!("Ignoring answer for unknown {}", id);
            return Vec::new();
        }
        self.permission = response.into();

        if !response.is_granted() {
            debug!("Permission {:?}, no challenge", response);
            self.last_failure = Some(GateError::PermissionNotGranted(response));
            return Vec::new();
        }

        if self.coordinate.is_none() {
            debug!("Permission granted without a fix, unlock attempt dropped");
            return Vec::new();
        }
        self.start_challenge()
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> LockSnapshot {
        LockSnapshot {
            lock_state: self.lock_state,
            coordinate: self.coordinate,
            permission: self.permission,
            challenge: self.challenge_outcome(),
            lifecycle: self.lifecycle,
            sensor: self.sensor,
            permission_requests_in_flight: self.permissions_in_flight.len(),
            permission_requests_issued: self.next_permission_request,
            challenges_issued: self.challenges_issued,
            confirmations_emitted: self.confirmations_emitted,
            events_handled: self.events_handled,
            last_failure: self.last_failure.clone(),
        }
    }
}
