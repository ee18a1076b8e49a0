//! # Racetrack
//!
//! Realtime race coordinator for a go-kart track.
//!
//! Operator stations (front desk, race control, lap-line tracker) and
//! passive displays connect over WebSocket. Stations authenticate with a
//! per-role secret and send commands; every accepted change is pushed to
//! every connected client as a full `state-update`, and a running race
//! pushes a `timer-tick` once per second.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use racetrack::prelude::*;
//!
//! # async fn run() -> Result<(), RacetrackError> {
//! let config = ServerConfig::from_env()?;
//! let server = RacetrackServer::builder()
//!     .bind(&config.bind_addr())
//!     .race_config(config.race)
//!     .keys(config.keys)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{ConfigError, DEFAULT_PORT, OBSERVER_KEY, RECEPTIONIST_KEY, SAFETY_KEY, ServerConfig};
pub use error::RacetrackError;
pub use server::{RacetrackServer, RacetrackServerBuilder};

/// Everything needed to configure and run a server.
pub mod prelude {
    pub use crate::{ConfigError, RacetrackError, RacetrackServer, RacetrackServerBuilder, ServerConfig};
    pub use racetrack_auth::{Authenticator, RoleKeys};
    pub use racetrack_protocol::{ClientEvent, Role, ServerEvent, StateSnapshot};
    pub use racetrack_race::{Clock, RaceConfig, RaceControlHandle, SystemClock};
}
