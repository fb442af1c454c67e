//! Controller policy

use serde::{Deserialize, Serialize};

use crate::types::{FixOptions, PermissionId};

/// Prompt shown by the biometric challenger
pub const DEFAULT_PROMPT: &str = "Unlock with biometrics";

/// Confirmation shown after a passed challenge
pub const DEFAULT_CONFIRMATION: &str = "Biometric authentication successful. Unlocking...";

/// How overlapping unlock requests are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockRequestPolicy {
    /// Every tap issues its own permission request
    #[default]
    AllowOverlap,
    /// A tap while a permission request is outstanding is dropped
    SingleFlight,
}

/// Tunables for the lock controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerPolicy {
    pub unlock_requests: UnlockRequestPolicy,
    pub prompt_message: String,
    pub confirmation_message: String,
    pub permission: PermissionId,
    pub fix_options: FixOptions,
}

impl Default for ControllerPolicy {
    fn default() -> Self {
        Self {
            unlock_requests: UnlockRequestPolicy::default(),
            prompt_message: DEFAULT_PROMPT.to_string(),
            confirmation_message: DEFAULT_CONFIRMATION.to_string(),
            permission: PermissionId::default(),
            fix_options: FixOptions::default(),
        }
    }
}

impl ControllerPolicy {
    /// Policy with the in-flight guard on unlock requests
    pub fn single_flight() -> Self {
        Self {
            unlock_requests: UnlockRequestPolicy::SingleFlight,
            ..Self::default()
        }
    }
}
