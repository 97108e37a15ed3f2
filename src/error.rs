use std::time::Duration;
use thiserror::Error;

use crate::engine::state::SessionState;

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors surfaced by the acquisition session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No {kind} device found")]
    DeviceNotFound { kind: String },

    #[error("Connection to {address} failed: {reason}")]
    ConnectionFailed { address: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Producer thread did not exit within the grace period. Logged during
    /// teardown, never returned from it.
    #[error("Acquisition thread still running after {grace:?}")]
    StreamingStallTimeout { grace: Duration },

    #[error("Cannot go from {from:?} to {to:?}")]
    InvalidTransition { from: SessionState, to: SessionState },

    #[error(transparent)]
    Device(#[from] anyhow::Error),
}
