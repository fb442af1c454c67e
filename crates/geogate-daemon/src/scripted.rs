//! Scripted collaborators
//!
//! Deterministic stand-ins for the device services. The interactive binary uses
//! them to simulate a phone; tests use them to hold requests open and to count
//! how often each service was called.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tracing::info;

use geogate_core::{
    AppLifecycle, ChallengeError, Coordinate, FixOptions, PermissionId, PermissionResponse,
    PositionError, SensorAvailability,
};

use crate::collaborators::{
    BiometricChallenger, LifecycleSignal, Notifier, PermissionGate, PositionProvider,
};

/// How long a scripted call takes to answer
#[derive(Debug, Default)]
struct Pacing {
    delay: Option<Duration>,
    /// Each call consumes one permit before answering
    gate: Option<Semaphore>,
}

impl Pacing {
    async fn wait(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
    }

    fn release(&self, calls: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(calls);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Position provider answering with a fixed fix or failure
#[derive(Debug)]
pub struct ScriptedPosition {
    fix: Mutex<Result<Coordinate, PositionError>>,
    pacing: Pacing,
    calls: AtomicUsize,
}

impl ScriptedPosition {
    pub fn new(fix: Result<Coordinate, PositionError>) -> Self {
        Self {
            fix: Mutex::new(fix),
            pacing: Pacing::default(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn fix(latitude: f64, longitude: f64) -> Self {
        Self::new(Ok(Coordinate::new(latitude, longitude)))
    }

    pub fn failing(reason: &str) -> Self {
        Self::new(Err(PositionError::new(reason)))
    }

    /// Answer after `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.pacing.delay = Some(delay);
        self
    }

    /// Answer only after [`release`](Self::release)
    pub fn held(mut self) -> Self {
        self.pacing.gate = Some(Semaphore::new(0));
        self
    }

    pub fn release(&self, calls: usize) {
        self.pacing.release(calls);
    }

    pub fn set_fix(&self, fix: Result<Coordinate, PositionError>) {
        *lock(&self.fix) = fix;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PositionProvider for ScriptedPosition {
    async fn get_fix(&self, options: FixOptions) -> Result<Coordinate, PositionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        info!(
            "Fix requested (high accuracy: {}, max age: {:?})",
            options.high_accuracy,
            options.max_age()
        );
        self.pacing.wait().await;
        lock(&self.fix).clone()
    }
}

/// Permission gate answering with a fixed response
#[derive(Debug)]
pub struct ScriptedPermission {
    response: Mutex<PermissionResponse>,
    requested: Mutex<Vec<PermissionId>>,
    pacing: Pacing,
    calls: AtomicUsize,
}

impl ScriptedPermission {
    pub fn new(response: PermissionResponse) -> Self {
        Self {
            response: Mutex::new(response),
            requested: Mutex::new(Vec::new()),
            pacing: Pacing::default(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.pacing.delay = Some(delay);
        self
    }

    pub fn held(mut self) -> Self {
        self.pacing.gate = Some(Semaphore::new(0));
        self
    }

    pub fn release(&self, calls: usize) {
        self.pacing.release(calls);
    }

    pub fn set_response(&self, response: PermissionResponse) {
        *lock(&self.response) = response;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Permissions asked for, in call order
    pub fn requested(&self) -> Vec<PermissionId> {
        lock(&self.requested).clone()
    }
}

#[async_trait]
impl PermissionGate for ScriptedPermission {
    async fn request(&self, permission: &PermissionId) -> PermissionResponse {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.requested).push(permission.clone());
        self.pacing.wait().await;
        *lock(&self.response)
    }
}

/// Biometric challenger with a fixed sensor and verdict
#[derive(Debug)]
pub struct ScriptedChallenger {
    availability: SensorAvailability,
    verdict: Mutex<Result<bool, ChallengeError>>,
    prompts: Mutex<Vec<String>>,
    pacing: Pacing,
    calls: AtomicUsize,
}

impl ScriptedChallenger {
    pub fn new(availability: SensorAvailability, verdict: Result<bool, ChallengeError>) -> Self {
        Self {
            availability,
            verdict: Mutex::new(verdict),
            prompts: Mutex::new(Vec::new()),
            pacing: Pacing::default(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Available generic sensor that always passes
    pub fn passing() -> Self {
        Self::new(
            SensorAvailability::new(true, geogate_core::BiometryKind::Generic),
            Ok(true),
        )
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.pacing.delay = Some(delay);
        self
    }

    pub fn held(mut self) -> Self {
        self.pacing.gate = Some(Semaphore::new(0));
        self
    }

    pub fn release(&self, calls: usize) {
        self.pacing.release(calls);
    }

    pub fn set_verdict(&self, verdict: Result<bool, ChallengeError>) {
        *lock(&self.verdict) = verdict;
    }

    /// Number of prompts shown
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }
}

#[async_trait]
impl BiometricChallenger for ScriptedChallenger {
    async fn check_availability(&self) -> Result<SensorAvailability, ChallengeError> {
        Ok(self.availability)
    }

    async fn challenge(&self, prompt: &str) -> Result<bool, ChallengeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.prompts).push(prompt.to_string());
        info!("Prompt shown: {}", prompt);
        self.pacing.wait().await;
        lock(&self.verdict).clone()
    }
}

/// Lifecycle signal driven by hand
#[derive(Debug, Default)]
pub struct ManualLifecycle {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<AppLifecycle>>>,
}

impl ManualLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a transition; returns how many subscribers saw it
    pub fn emit(&self, state: AppLifecycle) -> usize {
        let mut subscribers = lock(&self.subscribers);
        subscribers.retain(|tx| tx.send(state).is_ok());
        subscribers.len()
    }

    /// Subscribers whose receiver is still alive
    pub fn subscribers(&self) -> usize {
        lock(&self.subscribers)
            .iter()
            .filter(|tx| !tx.is_closed())
            .count()
    }
}

impl LifecycleSignal for ManualLifecycle {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<AppLifecycle> {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.subscribers).push(tx);
        rx
    }
}

/// Notifier that logs and records confirmations
#[derive(Debug, Default)]
pub struct LogNotifier {
    confirmations: Mutex<Vec<String>>,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confirmations(&self) -> Vec<String> {
        lock(&self.confirmations).clone()
    }
}

impl Notifier for LogNotifier {
    fn confirm(&self, message: &str) {
        info!("{}", message);
        lock(&self.confirmations).push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_held_permission_waits_for_release() {
        let gate = std::sync::Arc::new(ScriptedPermission::new(PermissionResponse::Granted).held());
        let permission = PermissionId::default();

        let pending = {
            let gate = std::sync::Arc::clone(&gate);
            tokio::spawn(async move { gate.request(&permission).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pending.is_finished());
        assert_eq!(gate.calls(), 1);

        gate.release(1);
        assert_eq!(pending.await.unwrap(), PermissionResponse::Granted);
    }

    #[tokio::test]
    async fn test_challenger_records_prompts() {
        let challenger = ScriptedChallenger::passing();
        assert!(challenger.challenge("Unlock").await.unwrap());

        challenger.set_verdict(Err(ChallengeError::Cancelled));
        assert!(challenger.challenge("Again").await.is_err());
        assert_eq!(challenger.prompts(), vec!["Unlock", "Again"]);
        assert_eq!(challenger.calls(), 2);
    }

    #[test]
    fn test_manual_lifecycle_without_subscribers() {
        let lifecycle = ManualLifecycle::new();
        assert_eq!(lifecycle.emit(AppLifecycle::Background), 0);

        let rx = lifecycle.subscribe();
        assert_eq!(lifecycle.emit(AppLifecycle::Foreground), 1);

        drop(rx);
        assert_eq!(lifecycle.subscribers(), 0);
        assert_eq!(lifecycle.emit(AppLifecycle::Background), 0);
    }

    #[tokio::test]
    async fn test_manual_lifecycle_keeps_every_transition() {
        let lifecycle = ManualLifecycle::new();
        let mut rx = lifecycle.subscribe();

        for _ in 0..100 {
            lifecycle.emit(AppLifecycle::Background);
            lifecycle.emit(AppLifecycle::Foreground);
        }

        for i in 0..200 {
            let expected = if i % 2 == 0 {
                AppLifecycle::Background
            } else {
                AppLifecycle::Foreground
            };
            assert_eq!(rx.recv().await, Some(expected));
        }
        assert!(rx.try_recv().is_err());
    }
}
