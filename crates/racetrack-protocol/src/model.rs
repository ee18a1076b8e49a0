//! The race data model as every station sees it.
//!
//! These types are both the authoritative in-memory representation held by
//! race control and the exact shape pushed to clients in `state-update`, so
//! field names follow the JSON convention (`camelCase`) via serde attributes.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifier of a race session. Assigned monotonically, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// A kart's number within one session.
///
/// Serialized as a plain number, and as a string key inside the `laps` map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CarNumber(pub u8);

impl fmt::Display for CarNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// An operator station that can be granted write access.
///
/// The passive displays (leaderboard, next race, countdown, flags) are not
/// roles: they never authenticate and only receive broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Receptionist: manages the session queue and driver rosters.
    FrontDesk,
    /// Safety official: starts races, sets flags, ends sessions.
    RaceControl,
    /// Lap-line observer: records cars crossing the timing line.
    LapLineTracker,
}

impl Role {
    /// Every controllable role.
    pub const ALL: [Role; 3] = [Role::FrontDesk, Role::RaceControl, Role::LapLineTracker];

    /// The interface name clients use for this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::FrontDesk => "front-desk",
            Role::RaceControl => "race-control",
            Role::LapLineTracker => "lap-line-tracker",
        }
    }

    /// Resolves an interface name to a role, if it is a controllable one.
    pub fn from_interface(name: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|role| role.as_str() == name)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Session lifecycle and flags
// ---------------------------------------------------------------------------

/// Lifecycle of a race session.
///
/// ```text
/// Upcoming ──(start-race)──→ Active ──(end-session)──→ Ended
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Upcoming,
    Active,
    Ended,
}

/// Track flag of the active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RaceMode {
    /// Green flag.
    Safe,
    /// Yellow flag: drive slowly.
    Hazard,
    /// Red flag: stop. Crossings are not counted.
    Danger,
    /// Chequered flag: proceed to the pit lane. Terminal.
    Finish,
}

impl RaceMode {
    /// The mode name as it appears on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            RaceMode::Safe => "safe",
            RaceMode::Hazard => "hazard",
            RaceMode::Danger => "danger",
            RaceMode::Finish => "finish",
        }
    }
}

impl fmt::Display for RaceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RaceMode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "safe" => Ok(RaceMode::Safe),
            "hazard" => Ok(RaceMode::Hazard),
            "danger" => Ok(RaceMode::Danger),
            "finish" => Ok(RaceMode::Finish),
            other => Err(ProtocolError::InvalidValue(format!("unknown race mode `{other}`"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Session contents
// ---------------------------------------------------------------------------

/// A driver booked into a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub name: String,
    pub car_number: CarNumber,
}

/// Per-car lap data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LapRecord {
    /// Number of recorded line crossings.
    pub count: u32,
    /// Fastest lap in milliseconds; `None` until two crossings exist.
    pub fastest_lap: Option<u64>,
    /// Time of the most recent crossing.
    pub last_crossing: Option<Timestamp>,
}

/// One scheduled or running race.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceSession {
    pub id: SessionId,
    pub drivers: Vec<Driver>,
    pub status: SessionStatus,
    /// `None` only while the session is upcoming.
    pub race_mode: Option<RaceMode>,
    pub start_time: Option<Timestamp>,
    /// Keyed by car number; mirrors `drivers` while upcoming.
    pub laps: BTreeMap<CarNumber, LapRecord>,
}

impl RaceSession {
    /// A freshly created session with an empty roster.
    pub fn upcoming(id: SessionId) -> Self {
        Self {
            id,
            drivers: Vec::new(),
            status: SessionStatus::Upcoming,
            race_mode: None,
            start_time: None,
            laps: BTreeMap::new(),
        }
    }

    /// Looks up the driver in the given car.
    pub fn driver(&self, car_number: CarNumber) -> Option<&Driver> {
        self.drivers.iter().find(|d| d.car_number == car_number)
    }
}

/// Everything a station needs to render, captured at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    /// Live sessions in queue order.
    pub sessions: Vec<RaceSession>,
    /// The most recently ended session, if any.
    pub last_finished_session: Option<RaceSession>,
    /// Milliseconds left on the countdown; `None` when no session is active.
    pub race_time_remaining: Option<u64>,
}
