//! Error types for role authentication.

use std::time::Duration;

use racetrack_protocol::Role;

/// How long a wrong key waits before the failure is reported.
pub const INVALID_KEY_DELAY: Duration = Duration::from_millis(500);

/// Reasons an `authenticate` request is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The interface name is not one of the controllable roles.
    #[error("unknown interface `{0}`")]
    UnknownInterface(String),

    /// The key did not match the secret configured for the role.
    #[error("invalid key for {0}")]
    InvalidKey(Role),
}

impl AuthError {
    /// The message sent back in `auth-failure`.
    ///
    /// Deliberately vaguer than `Display`: the client already knows which
    /// interface it asked for.
    pub fn client_message(&self) -> &'static str {
        match self {
            AuthError::UnknownInterface(_) => "unknown interface",
            AuthError::InvalidKey(_) => "invalid key",
        }
    }

    /// How long to hold the failure before answering.
    ///
    /// Unknown interfaces are answered at once; wrong keys are slowed down to
    /// blunt guessing.
    pub fn response_delay(&self) -> Duration {
        match self {
            AuthError::UnknownInterface(_) => Duration::ZERO,
            AuthError::InvalidKey(_) => INVALID_KEY_DELAY,
        }
    }
}
