//! Race countdown for the racetrack server.
//!
//! A [`Countdown`] is armed with the race duration when a race starts and then
//! fires once per tick interval, each time subtracting exactly one interval
//! from the remaining time. The tick that brings the remaining time to zero
//! is reported as expired and disarms the countdown.
//!
//! # Idle mode
//!
//! While no countdown is armed, [`Countdown::wait_for_tick`] pends forever.
//! Race control can therefore keep it in its `tokio::select!` loop
//! unconditionally:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         tick = countdown.wait_for_tick() => {
//!             if tick.expired { /* force finish */ } else { /* timer-tick */ }
//!         }
//!     }
//! }
//! ```

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

/// Default tick interval.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Shortest interval accepted; anything below is raised to this.
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// One fired tick, returned by [`Countdown::wait_for_tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Tick number since the countdown was armed (starts at 1).
    pub seq: u64,
    /// Time left after this tick.
    pub remaining: Duration,
    /// `true` on the final tick; the countdown is disarmed afterwards.
    pub expired: bool,
}

impl Tick {
    /// Remaining time in whole milliseconds, as sent to clients.
    pub fn remaining_ms(&self) -> u64 {
        as_millis(self.remaining)
    }
}

/// A single re-armable countdown.
///
/// At most one countdown runs at a time: [`arm`](Self::arm) replaces whatever
/// was running. Ticks keep their original cadence (`armed_at + n * interval`)
/// even if the owner is slow to poll. When whole intervals are missed, the
/// next poll returns a single tick that subtracts all of them, so the race
/// length stays exact and no burst of ticks is delivered.
#[derive(Debug)]
pub struct Countdown {
    interval: Duration,
    remaining: Duration,
    next_tick: Option<Instant>,
    seq: u64,
}

impl Countdown {
    /// Creates an idle countdown that will tick every `interval` once armed.
    pub fn new(interval: Duration) -> Self {
        let interval = if interval < MIN_TICK_INTERVAL {
            warn!(?interval, min = ?MIN_TICK_INTERVAL, "tick interval too short, raising");
            MIN_TICK_INTERVAL
        } else {
            interval
        };

        Self {
            interval,
            remaining: Duration::ZERO,
            next_tick: None,
            seq: 0,
        }
    }

    /// Starts counting down from `duration`, cancelling any running countdown.
    pub fn arm(&mut self, duration: Duration) {
        if self.is_running() {
            debug!(remaining_ms = self.remaining_ms(), "replacing running countdown");
        }
        self.remaining = duration;
        self.seq = 0;
        self.next_tick = Some(Instant::now() + self.interval);
        debug!(duration_ms = as_millis(duration), "countdown armed");
    }

    /// Stops the countdown and zeroes the remaining time.
    ///
    /// Safe to call when nothing is running.
    pub fn cancel(&mut self) {
        if self.next_tick.take().is_some() {
            debug!(remaining_ms = self.remaining_ms(), "countdown cancelled");
        }
        self.remaining = Duration::ZERO;
    }

    /// Waits for the next tick and applies it.
    ///
    /// Pends forever while idle. Cancel-safe: if the future is dropped
    /// before the deadline, no state has changed.
    pub async fn wait_for_tick(&mut self) -> Tick {
        let Some(deadline) = self.next_tick else {
            return std::future::pending().await;
        };

        time::sleep_until(deadline).await;

        // Intervals that fully elapsed while the owner was not polling are
        // folded into this tick instead of firing back to back.
        let late_by = Instant::now().saturating_duration_since(deadline);
        let missed = u32::try_from(late_by.as_nanos() / self.interval.as_nanos()).unwrap_or(u32::MAX);
        if missed > 0 {
            warn!(
                missed,
                late_ms = as_millis(late_by),
                "countdown polled late, folding missed ticks"
            );
        }
        let steps = missed.saturating_add(1);
        let elapsed = self.interval.saturating_mul(steps);

        self.seq += u64::from(steps);
        self.remaining = self.remaining.saturating_sub(elapsed);
        let expired = self.remaining.is_zero();
        self.next_tick = if expired {
            None
        } else {
            Some(deadline + elapsed)
        };

        trace!(seq = self.seq, remaining_ms = self.remaining_ms(), expired, "countdown tick");

        Tick {
            seq: self.seq,
            remaining: self.remaining,
            expired,
        }
    }

    /// Whether a countdown is armed.
    pub fn is_running(&self) -> bool {
        self.next_tick.is_some()
    }

    /// Time left; zero when idle.
    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    /// Time left in whole milliseconds.
    pub fn remaining_ms(&self) -> u64 {
        as_millis(self.remaining)
    }

    /// The configured tick interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}

fn as_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
