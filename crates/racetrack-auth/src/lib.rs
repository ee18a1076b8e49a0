//! Role authentication for the racetrack server.
//!
//! Three operator stations can write to race state, each unlocked by one
//! shared secret supplied at process start:
//!
//! 1. **Key check**: [`Authenticator`] maps an `(interface, key)` pair to a
//!    [`Role`](racetrack_protocol::Role); [`RoleKeys`] is the static-secret
//!    implementation.
//! 2. **Gate**: [`AuthGate`] remembers which connection holds which role and
//!    keeps one member set per role.
//!
//! Every command is re-checked against the gate. Failed checks are not
//! reported to the client; only `authenticate` itself answers.

mod error;
mod gate;
mod keys;

pub use error::AuthError;
pub use gate::AuthGate;
pub use keys::{Authenticator, RoleKeys};
