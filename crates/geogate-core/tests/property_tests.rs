//! Property-based tests for geogate-core using proptest
//!
//! Random interleavings of collaborator results, lifecycle transitions and user
//! taps are fed through the controller one at a time, the way the runtime does.

use std::collections::BTreeSet;

use geogate_core::{
    AppLifecycle, BiometryKind, ChallengeError, ChallengeId, ChallengeOutcome, ControllerPolicy,
    Coordinate, Effect, LockController, LockEvent, LockState, PermissionRequestId,
    PermissionResponse, PositionError, SensorAvailability,
};
use proptest::prelude::*;

// ============================================
// Strategies
// ============================================

fn arb_coordinate() -> impl Strategy<Value = Coordinate> {
    (-90.0f64..=90.0, -180.0f64..=180.0).prop_map(|(lat, lon)| Coordinate::new(lat, lon))
}

fn arb_permission_response() -> impl Strategy<Value = PermissionResponse> {
    prop_oneof![
        Just(PermissionResponse::Unavailable),
        Just(PermissionResponse::Denied),
        Just(PermissionResponse::Granted),
        Just(PermissionResponse::Blocked),
    ]
}

fn arb_lifecycle() -> impl Strategy<Value = AppLifecycle> {
    prop_oneof![Just(AppLifecycle::Foreground), Just(AppLifecycle::Background)]
}

fn arb_biometry_kind() -> impl Strategy<Value = BiometryKind> {
    prop_oneof![
        Just(BiometryKind::None),
        Just(BiometryKind::Fingerprint),
        Just(BiometryKind::Face),
        Just(BiometryKind::Generic),
    ]
}

fn arb_challenge_result() -> impl Strategy<Value = Result<bool, ChallengeError>> {
    prop_oneof![
        any::<bool>().prop_map(Ok),
        Just(Err(ChallengeError::Cancelled)),
        Just(Err(ChallengeError::Hardware("sensor fault".to_string()))),
    ]
}

/// Ids are drawn from a small range so that some results match an issued
/// request and others are stale or unknown.
fn arb_event() -> impl Strategy<Value = LockEvent> {
    prop_oneof![
        (any::<bool>(), arb_biometry_kind()).prop_map(|(available, kind)| {
            LockEvent::SensorAvailability(Ok(SensorAvailability::new(available, kind)))
        }),
        arb_coordinate().prop_map(|c| LockEvent::PositionResult(Ok(c))),
        Just(LockEvent::PositionResult(Err(PositionError::new("no fix")))),
        (1u64..6, arb_permission_response()).prop_map(|(id, response)| {
            LockEvent::PermissionResult {
                request: PermissionRequestId(id),
                response,
            }
        }),
        (1u64..6, arb_challenge_result()).prop_map(|(id, result)| LockEvent::ChallengeResult {
            challenge: ChallengeId(id),
            result,
        }),
        arb_lifecycle().prop_map(LockEvent::Lifecycle),
        Just(LockEvent::UnlockRequested),
        Just(LockEvent::StartChallenge),
    ]
}

fn challenges_in(effects: &[Effect]) -> Vec<ChallengeId> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::IssueChallenge { challenge, .. } => Some(*challenge),
            _ => None,
        })
        .collect()
}

fn confirmations_in(effects: &[Effect]) -> usize {
    effects
        .iter()
        .filter(|e| matches!(e, Effect::Confirm { .. }))
        .count()
}

// ============================================
// Property Tests
// ============================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn never_two_challenges_outstanding(events in prop::collection::vec(arb_event(), 0..60)) {
        let mut controller = LockController::default();
        controller.start();
        let mut outstanding: BTreeSet<ChallengeId> = BTreeSet::new();

        for event in events {
            let was_pending = controller.challenge_outcome() == Some(ChallengeOutcome::Pending);
            let settles = match &event {
                LockEvent::ChallengeResult { challenge, .. } => Some(*challenge),
                _ => None,
            };

            let effects = controller.handle(event);
            let issued = challenges_in(&effects);
            prop_assert!(issued.len() <= 1);
            if was_pending {
                prop_assert!(issued.is_empty());
            }

            if let Some(id) = settles {
                if controller.challenge_outcome() != Some(ChallengeOutcome::Pending) {
                    outstanding.remove(&id);
                }
            }
            outstanding.extend(issued);
            prop_assert!(outstanding.len() <= 1);
        }
    }

    #[test]
    fn unlocked_iff_a_fix_was_recorded(events in prop::collection::vec(arb_event(), 0..60)) {
        let mut controller = LockController::default();
        controller.start();
        let mut saw_fix = false;
        let mut was_unlocked = false;

        for event in events {
            if matches!(event, LockEvent::PositionResult(Ok(_))) {
                saw_fix = true;
            }
            controller.handle(event);

            let unlocked = controller.lock_state() == LockState::Unlocked;
            prop_assert_eq!(unlocked, saw_fix);
            prop_assert_eq!(unlocked, controller.coordinate().is_some());
            if was_unlocked {
                prop_assert!(unlocked);
            }
            was_unlocked = unlocked;
        }
    }

    #[test]
    fn granted_challenges_only_with_a_fix(
        fix in prop::option::of(arb_coordinate()),
    ) {
        let mut controller = LockController::default();
        controller.start();
        if let Some(c) = fix {
            controller.handle(LockEvent::PositionResult(Ok(c)));
        }

        let request = match controller.handle(LockEvent::UnlockRequested).as_slice() {
            [Effect::RequestPermission { request, .. }] => *request,
            other => return Err(TestCaseError::fail(format!("unexpected effects {:?}", other))),
        };
        let effects = controller.handle(LockEvent::PermissionResult {
            request,
            response: PermissionResponse::Granted,
        });

        let expected = if fix.is_some() { 1 } else { 0 };
        prop_assert_eq!(challenges_in(&effects).len(), expected);
    }

    #[test]
    fn foreground_challenges_depend_only_on_lock_state(
        fix in prop::option::of(arb_coordinate()),
        prior in prop::collection::vec(arb_challenge_result(), 0..5),
    ) {
        let mut controller = LockController::default();
        controller.start();
        if let Some(c) = fix {
            controller.handle(LockEvent::PositionResult(Ok(c)));
        }

        // Settle some earlier challenges with arbitrary outcomes
        for result in prior {
            if let [id] = challenges_in(&controller.handle(LockEvent::StartChallenge)).as_slice() {
                controller.handle(LockEvent::ChallengeResult { challenge: *id, result });
            }
        }

        controller.handle(LockEvent::Lifecycle(AppLifecycle::Background));
        let effects = controller.handle(LockEvent::Lifecycle(AppLifecycle::Foreground));

        let expected = if fix.is_some() { 1 } else { 0 };
        prop_assert_eq!(challenges_in(&effects).len(), expected);
    }

    #[test]
    fn confirmations_match_successes(events in prop::collection::vec(arb_event(), 0..60)) {
        let mut controller = LockController::default();
        controller.start();
        let mut confirmations = 0usize;
        let mut successes = 0usize;

        for event in events {
            let before = controller.challenge_outcome();
            let effects = controller.handle(event);
            let count = confirmations_in(&effects);
            prop_assert!(count <= 1);
            confirmations += count;

            if before == Some(ChallengeOutcome::Pending)
                && controller.challenge_outcome() == Some(ChallengeOutcome::Succeeded)
            {
                successes += 1;
            }
        }

        prop_assert_eq!(confirmations, successes);
        prop_assert_eq!(controller.snapshot().confirmations_emitted as usize, confirmations);
    }

    #[test]
    fn sensor_availability_is_inert(
        available in any::<bool>(),
        kind in arb_biometry_kind(),
        fix in prop::option::of(arb_coordinate()),
    ) {
        let mut controller = LockController::default();
        if let Some(c) = fix {
            controller.handle(LockEvent::PositionResult(Ok(c)));
        }
        let before = controller.snapshot();

        let effects = controller.handle(LockEvent::SensorAvailability(Ok(
            SensorAvailability::new(available, kind),
        )));
        let after = controller.snapshot();

        prop_assert!(effects.is_empty());
        prop_assert_eq!(before.lock_state, after.lock_state);
        prop_assert_eq!(before.challenge, after.challenge);
        prop_assert_eq!(before.challenges_issued, after.challenges_issued);
    }

    #[test]
    fn single_flight_limits_permission_requests(taps in 1usize..10) {
        let mut guarded = LockController::new(ControllerPolicy::single_flight());
        let mut open = LockController::default();

        let mut guarded_requests = 0;
        let mut open_requests = 0;
        for _ in 0..taps {
            guarded_requests += guarded.handle(LockEvent::UnlockRequested).len();
            open_requests += open.handle(LockEvent::UnlockRequested).len();
        }

        prop_assert_eq!(guarded_requests, 1);
        prop_assert_eq!(open_requests, taps);
        prop_assert_eq!(open.snapshot().permission_requests_in_flight, taps);
    }
}
