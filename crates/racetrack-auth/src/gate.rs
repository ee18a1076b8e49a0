//! The auth gate: which connection holds which role.
//!
//! # Concurrency note
//!
//! `AuthGate` is a plain single-owner structure. Race control owns it inside
//! its actor task, so every lookup sees the effect of every earlier
//! `authenticate` from the same connection.

use std::collections::{BTreeSet, HashMap};

use racetrack_protocol::Role;
use racetrack_transport::ConnectionId;

use crate::{AuthError, Authenticator};

/// Tracks authorized connections and the member set of each role.
///
/// ```text
/// authenticate() ──ok──→ [tagged with role, member of role group]
///       │                        │
///       └──err──→ [unchanged]    └── revoke() on disconnect
/// ```
///
/// A connection holds at most one role. Authenticating again successfully
/// replaces the old role and moves the connection to the new group; a failed
/// attempt leaves any existing role untouched.
pub struct AuthGate {
    authenticator: Box<dyn Authenticator>,
    roles: HashMap<ConnectionId, Role>,
    groups: HashMap<Role, BTreeSet<ConnectionId>>,
}

impl AuthGate {
    /// Creates an empty gate that checks keys with `authenticator`.
    pub fn new(authenticator: impl Authenticator) -> Self {
        Self {
            authenticator: Box::new(authenticator),
            roles: HashMap::new(),
            groups: HashMap::new(),
        }
    }

    /// Checks the presented key and, on success, tags the connection.
    ///
    /// # Errors
    /// Whatever the [`Authenticator`] rejects the pair with.
    pub fn authenticate(
        &mut self,
        conn: ConnectionId,
        interface: &str,
        key: &str,
    ) -> Result<Role, AuthError> {
        let role = self.authenticator.authenticate(interface, key)?;

        if let Some(previous) = self.roles.insert(conn, role) {
            if previous != role {
                self.leave_group(conn, previous);
            }
        }
        self.groups.entry(role).or_default().insert(conn);

        tracing::info!(%conn, %role, "connection authorized");
        Ok(role)
    }

    /// The role the connection currently holds.
    pub fn role_of(&self, conn: ConnectionId) -> Option<Role> {
        self.roles.get(&conn).copied()
    }

    /// `true` if the connection holds exactly `role`.
    pub fn is_authorized(&self, conn: ConnectionId, role: Role) -> bool {
        self.role_of(conn) == Some(role)
    }

    /// Forgets a connection, e.g. when it disconnects.
    ///
    /// Returns the role it held. Revoking an unknown connection is a no-op.
    pub fn revoke(&mut self, conn: ConnectionId) -> Option<Role> {
        let role = self.roles.remove(&conn)?;
        self.leave_group(conn, role);
        tracing::debug!(%conn, %role, "authorization revoked");
        Some(role)
    }

    /// Connections currently holding `role`, in connection order.
    pub fn members(&self, role: Role) -> impl Iterator<Item = ConnectionId> + '_ {
        self.groups.get(&role).into_iter().flatten().copied()
    }

    /// Number of authorized connections.
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Returns `true` if no connection is authorized.
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    fn leave_group(&mut self, conn: ConnectionId, role: Role) {
        if let Some(members) = self.groups.get_mut(&role) {
            members.remove(&conn);
            if members.is_empty() {
                self.groups.remove(&role);
            }
        }
    }
}
