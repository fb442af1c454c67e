//! Text rendering of the lock state for the terminal

use geogate_core::{ChallengeOutcome, LockSnapshot, LockState};

/// One status block: coordinates, then the lock line, then the last challenge
pub fn render_status(snapshot: &LockSnapshot) -> String {
    let (latitude, longitude) = match snapshot.coordinate {
        Some(c) => (c.latitude.to_string(), c.longitude.to_string()),
        None => (String::new(), String::new()),
    };

    let lock_line = match snapshot.lock_state {
        LockState::Locked => "Lock closed".to_string(),
        LockState::Unlocked if snapshot.permission_requests_in_flight > 0 => {
            "[ requesting location permission... ]".to_string()
        }
        LockState::Unlocked => "[ Unlock ]".to_string(),
    };

    let challenge = match snapshot.challenge {
        None => "none",
        Some(ChallengeOutcome::Pending) => "pending",
        Some(ChallengeOutcome::Succeeded) => "succeeded",
        Some(ChallengeOutcome::Failed) => "failed",
    };

    format!(
        "Latitude: {}\nLongitude: {}\n{}\nChallenge: {} ({} issued) | Lifecycle: {:?}",
        latitude, longitude, lock_line, challenge, snapshot.challenges_issued, snapshot.lifecycle
    )
}
