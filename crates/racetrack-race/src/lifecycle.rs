//! Flag rules for the active session.
//!
//! ```text
//!   safe ⇄ hazard ⇄ danger
//!     └───────┼───────┘
//!             ↓
//!          finish   (terminal)
//! ```
//!
//! Any non-finish flag may move to any of the four, including itself.

use racetrack_protocol::RaceMode;

/// Returns `true` if the flag can no longer change away from `current`.
pub fn is_mode_locked(current: RaceMode) -> bool {
    current == RaceMode::Finish
}

/// Returns `true` if lap crossings are recorded under `mode`.
///
/// Under the red flag, and before a race has a flag at all, crossings are
/// ignored.
pub fn counts_crossings(mode: Option<RaceMode>) -> bool {
    matches!(
        mode,
        Some(RaceMode::Safe | RaceMode::Hazard | RaceMode::Finish)
    )
}
