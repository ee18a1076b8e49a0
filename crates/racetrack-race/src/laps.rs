//! Lap timing for one car.

use racetrack_protocol::{LapRecord, Timestamp};

/// Applies a line crossing at `now` to `record`.
///
/// Returns the lap time if there was an earlier crossing to measure from.
/// The first crossing only starts the clock for that car.
pub(crate) fn apply_crossing(record: &mut LapRecord, now: Timestamp) -> Option<u64> {
    let lap = record.last_crossing.map(|prev| now.saturating_sub(prev));

    if let Some(lap) = lap {
        if record.fastest_lap.is_none_or(|best| lap < best) {
            record.fastest_lap = Some(lap);
        }
    }
    record.count += 1;
    record.last_crossing = Some(now);

    lap
}
