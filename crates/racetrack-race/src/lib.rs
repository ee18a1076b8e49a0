//! Race state and race control for the racetrack server.
//!
//! # Key types
//!
//! - [`RaceRegistry`]: the session queue, rosters, flags and lap records
//! - [`RaceControlHandle`]: talk to the running race control actor
//! - [`RaceConfig`]: race length and tick interval
//! - [`Clock`]: where lap and start timestamps come from
//!
//! State changes only happen inside the actor started by
//! [`spawn_race_control`]; the registry itself is plain data plus rules.

mod config;
mod engine;
mod error;
mod laps;
pub mod lifecycle;
mod registry;

pub use config::{Clock, RaceConfig, SystemClock};
pub use engine::{ClientSender, RaceControlHandle, spawn_race_control};
pub use error::RaceError;
pub use registry::{MAX_DRIVERS, RaceRegistry};
