//! Checking presented keys against the configured role secrets.

use std::fmt;

use racetrack_protocol::Role;
use subtle::ConstantTimeEq;

use crate::AuthError;

/// Validates an `(interface, key)` pair and returns the role it unlocks.
///
/// Race control holds one of these behind the [`AuthGate`](crate::AuthGate);
/// tests substitute their own.
pub trait Authenticator: Send + Sync + 'static {
    /// Returns the role for `interface` if `key` is its secret.
    ///
    /// # Errors
    /// - [`AuthError::UnknownInterface`] when `interface` is not a role
    /// - [`AuthError::InvalidKey`] when the key does not match
    fn authenticate(&self, interface: &str, key: &str) -> Result<Role, AuthError>;
}

/// The three static secrets, one per controllable role.
#[derive(Clone)]
pub struct RoleKeys {
    front_desk: String,
    race_control: String,
    lap_line_tracker: String,
}

impl RoleKeys {
    /// Creates the key set. Empty secrets are rejected by configuration
    /// loading, not here.
    pub fn new(
        front_desk: impl Into<String>,
        race_control: impl Into<String>,
        lap_line_tracker: impl Into<String>,
    ) -> Self {
        Self {
            front_desk: front_desk.into(),
            race_control: race_control.into(),
            lap_line_tracker: lap_line_tracker.into(),
        }
    }

    fn secret(&self, role: Role) -> &str {
        match role {
            Role::FrontDesk => &self.front_desk,
            Role::RaceControl => &self.race_control,
            Role::LapLineTracker => &self.lap_line_tracker,
        }
    }
}

impl Authenticator for RoleKeys {
    fn authenticate(&self, interface: &str, key: &str) -> Result<Role, AuthError> {
        let role = Role::from_interface(interface)
            .ok_or_else(|| AuthError::UnknownInterface(interface.to_owned()))?;

        let matches: bool = self.secret(role).as_bytes().ct_eq(key.as_bytes()).into();
        if matches {
            Ok(role)
        } else {
            Err(AuthError::InvalidKey(role))
        }
    }
}

// Secrets must never end up in logs.
impl fmt::Debug for RoleKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleKeys")
            .field("front_desk", &"<redacted>")
            .field("race_control", &"<redacted>")
            .field("lap_line_tracker", &"<redacted>")
            .finish()
    }
}
