//! Error types for the race layer.
//!
//! None of these reach a client. Race control logs them at `debug` and
//! drops the command.

use racetrack_protocol::{CarNumber, RaceMode, Role, SessionId};

/// Reasons a command is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RaceError {
    /// The connection does not hold the role the event requires.
    #[error("`{event}` requires the {required} role")]
    Forbidden { event: &'static str, required: Role },

    /// No live session has this id.
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// The session is already racing; its roster is frozen.
    #[error("session {0} is not upcoming")]
    NotUpcoming(SessionId),

    /// The roster already holds the maximum number of drivers.
    #[error("session {0} roster is full")]
    RosterFull(SessionId),

    /// The driver name is empty after trimming.
    #[error("driver name is empty")]
    EmptyName,

    /// Another driver in the session already uses this name.
    #[error("driver name `{0}` is already taken")]
    DuplicateName(String),

    /// Every car number is in use.
    #[error("no free car number in session {0}")]
    NoFreeCarNumber(SessionId),

    /// No driver sits in this car.
    #[error("no driver in car {car} of session {session}")]
    DriverNotFound { session: SessionId, car: CarNumber },

    /// Another session is already active.
    #[error("session {0} is already racing")]
    RaceInProgress(SessionId),

    /// There is no upcoming session to start.
    #[error("no upcoming session to start")]
    NoUpcomingSession,

    /// A race needs at least one driver.
    #[error("session {0} has no drivers")]
    NoDrivers(SessionId),

    /// The command needs an active session.
    #[error("no session is active")]
    NoActiveSession,

    /// The flag is already chequered and cannot change.
    #[error("race mode is locked at finish")]
    ModeLocked,

    /// The requested mode is not one of the four flags.
    #[error("unknown race mode `{0}`")]
    InvalidMode(String),

    /// A session can only be ended once it shows the chequered flag.
    #[error("session {0} is not finished")]
    NotFinished(SessionId),

    /// Crossings are ignored under the current flag.
    #[error("crossings are not counted under {0:?}")]
    CrossingsNotCounted(Option<RaceMode>),

    /// The car is not part of the active race.
    #[error("car {0} is not in the race")]
    UnknownCar(CarNumber),

    /// Race control has shut down.
    #[error("race control is unavailable")]
    Unavailable,
}
