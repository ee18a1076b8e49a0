//! Race settings and the wall clock used for lap timing.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use racetrack_protocol::Timestamp;

// ---------------------------------------------------------------------------
// RaceConfig
// ---------------------------------------------------------------------------

/// Countdown settings, chosen once at process start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaceConfig {
    /// Length of a race from `start-race` to the automatic chequered flag.
    pub race_duration: Duration,

    /// How often the countdown ticks.
    pub tick_interval: Duration,
}

impl RaceConfig {
    /// Race length in development mode.
    pub const DEV_RACE_DURATION: Duration = Duration::from_secs(60);

    /// Race length in production.
    pub const RACE_DURATION: Duration = Duration::from_secs(600);

    /// One-minute races for trying things out.
    pub fn dev() -> Self {
        Self {
            race_duration: Self::DEV_RACE_DURATION,
            ..Self::default()
        }
    }

    /// Picks the race length for the given run mode.
    pub fn for_mode(dev_mode: bool) -> Self {
        if dev_mode { Self::dev() } else { Self::default() }
    }
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            race_duration: Self::RACE_DURATION,
            tick_interval: racetrack_tick::DEFAULT_TICK_INTERVAL,
        }
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of the timestamps stored in `startTime` and `lastCrossing`.
pub trait Clock: Send + 'static {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> Timestamp;
}

impl<C: Clock + ?Sized> Clock for Box<C> {
    fn now_ms(&self) -> Timestamp {
        (**self).now_ms()
    }
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or_default()
    }
}
