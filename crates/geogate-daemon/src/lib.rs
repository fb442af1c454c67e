//! Geogate Daemon - Runtime for the location-gated biometric lock
//!
//! This crate provides:
//! - Collaborator traits for the position provider, permission gate,
//!   biometric challenger, lifecycle signal and confirmation sink
//! - A single-consumer actor that feeds their results to the lock controller
//! - JSON configuration
//! - Scripted collaborators for the interactive binary and for tests

pub mod actor;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod scripted;
pub mod status;

pub use actor::{LockActor, LockHandle};
pub use collaborators::{
    BiometricChallenger, Collaborators, LifecycleSignal, Notifier, PermissionGate,
    PositionProvider,
};
pub use config::GateConfig;
pub use error::{DaemonError, Result};
pub use status::render_status;
