//! The authoritative session registry.
//!
//! Holds the queue of sessions, applies every state change race control
//! accepts, and keeps the last ended session around for the displays.
//!
//! ```text
//! create ──→ Upcoming ──start_race──→ Active ──end_session──→ last_finished
//!               │                       │
//!         delete / roster edits    set_mode / crossings
//! ```

use racetrack_protocol::{
    CarNumber, Driver, LapRecord, RaceMode, RaceSession, SessionId, SessionStatus, Timestamp,
};

use crate::RaceError;
use crate::laps::apply_crossing;
use crate::lifecycle::{counts_crossings, is_mode_locked};

/// Most drivers a session can hold; cars are numbered `1..=MAX_DRIVERS`.
pub const MAX_DRIVERS: usize = 8;

/// Sessions in queue order plus the most recently ended one.
///
/// At most one session is ever [`SessionStatus::Active`]. Ended sessions are
/// removed from the queue and survive only as [`last_finished`](Self::last_finished).
#[derive(Debug)]
pub struct RaceRegistry {
    sessions: Vec<RaceSession>,
    last_finished: Option<RaceSession>,
    next_id: u64,
}

impl RaceRegistry {
    /// Creates an empty registry. The first session gets id 1.
    pub fn new() -> Self {
        Self {
            sessions: Vec::new(),
            last_finished: None,
            next_id: 1,
        }
    }

    // -----------------------------------------------------------------
    // Queue
    // -----------------------------------------------------------------

    /// Appends a new upcoming session to the queue.
    pub fn create_session(&mut self) -> SessionId {
        let id = SessionId(self.next_id);
        self.next_id += 1;
        self.sessions.push(RaceSession::upcoming(id));
        tracing::info!(session = %id, queued = self.sessions.len(), "session created");
        id
    }

    /// Removes an upcoming session.
    pub fn delete_session(&mut self, id: SessionId) -> Result<(), RaceError> {
        self.upcoming_mut(id)?;
        self.sessions.retain(|s| s.id != id);
        tracing::info!(session = %id, "session deleted");
        Ok(())
    }

    // -----------------------------------------------------------------
    // Roster
    // -----------------------------------------------------------------

    /// Books a driver into the lowest free car.
    ///
    /// The name is trimmed and must be unique in the session, ignoring case.
    pub fn add_driver(&mut self, id: SessionId, name: &str) -> Result<CarNumber, RaceError> {
        let session = self.upcoming_mut(id)?;
        if session.drivers.len() >= MAX_DRIVERS {
            return Err(RaceError::RosterFull(id));
        }
        let name = validate_name(session, name, None)?;
        let car_number = lowest_free_car(session).ok_or(RaceError::NoFreeCarNumber(id))?;

        session.drivers.push(Driver {
            name: name.to_owned(),
            car_number,
        });
        session.laps.insert(car_number, LapRecord::default());

        tracing::info!(session = %id, car = %car_number, driver = name, "driver added");
        Ok(car_number)
    }

    /// Removes the driver in `car_number` together with their lap record.
    pub fn remove_driver(&mut self, id: SessionId, car_number: CarNumber) -> Result<(), RaceError> {
        let session = self.upcoming_mut(id)?;
        let index = session
            .drivers
            .iter()
            .position(|d| d.car_number == car_number)
            .ok_or(RaceError::DriverNotFound {
                session: id,
                car: car_number,
            })?;

        session.drivers.remove(index);
        session.laps.remove(&car_number);

        tracing::info!(session = %id, car = %car_number, "driver removed");
        Ok(())
    }

    /// Renames the driver in `car_number`.
    pub fn edit_driver(
        &mut self,
        id: SessionId,
        car_number: CarNumber,
        name: &str,
    ) -> Result<(), RaceError> {
        let session = self.upcoming_mut(id)?;
        let name = validate_name(session, name, Some(car_number))?;
        let driver = session
            .drivers
            .iter_mut()
            .find(|d| d.car_number == car_number)
            .ok_or(RaceError::DriverNotFound {
                session: id,
                car: car_number,
            })?;

        driver.name = name.to_owned();

        tracing::info!(session = %id, car = %car_number, driver = name, "driver renamed");
        Ok(())
    }

    // -----------------------------------------------------------------
    // Race
    // -----------------------------------------------------------------

    /// Starts the next upcoming session under the green flag.
    pub fn start_race(&mut self, now: Timestamp) -> Result<SessionId, RaceError> {
        if let Some(active) = self.active() {
            return Err(RaceError::RaceInProgress(active.id));
        }
        let session = self
            .sessions
            .iter_mut()
            .find(|s| s.status == SessionStatus::Upcoming)
            .ok_or(RaceError::NoUpcomingSession)?;
        if session.drivers.is_empty() {
            return Err(RaceError::NoDrivers(session.id));
        }

        session.status = SessionStatus::Active;
        session.race_mode = Some(RaceMode::Safe);
        session.start_time = Some(now);

        tracing::info!(session = %session.id, drivers = session.drivers.len(), "race started");
        Ok(session.id)
    }

    /// Changes the flag of the active session.
    pub fn set_mode(&mut self, mode: RaceMode) -> Result<(), RaceError> {
        let session = self.active_mut()?;
        if session.race_mode.is_some_and(is_mode_locked) {
            return Err(RaceError::ModeLocked);
        }

        session.race_mode = Some(mode);

        tracing::info!(session = %session.id, %mode, "race mode changed");
        Ok(())
    }

    /// Closes the active session once it shows the chequered flag.
    ///
    /// The session leaves the queue under the red flag and becomes
    /// [`last_finished`](Self::last_finished).
    pub fn end_session(&mut self) -> Result<SessionId, RaceError> {
        let index = self
            .sessions
            .iter()
            .position(|s| s.status == SessionStatus::Active)
            .ok_or(RaceError::NoActiveSession)?;
        if self.sessions[index].race_mode != Some(RaceMode::Finish) {
            return Err(RaceError::NotFinished(self.sessions[index].id));
        }

        let mut session = self.sessions.remove(index);
        session.status = SessionStatus::Ended;
        session.race_mode = Some(RaceMode::Danger);
        let id = session.id;
        self.last_finished = Some(session);

        tracing::info!(session = %id, "session ended");
        Ok(id)
    }

    /// Records `car_number` crossing the timing line at `now`.
    ///
    /// Returns the updated lap record.
    pub fn record_crossing(
        &mut self,
        car_number: CarNumber,
        now: Timestamp,
    ) -> Result<&LapRecord, RaceError> {
        let session = self.active_mut()?;
        if !counts_crossings(session.race_mode) {
            return Err(RaceError::CrossingsNotCounted(session.race_mode));
        }
        let record = session
            .laps
            .get_mut(&car_number)
            .ok_or(RaceError::UnknownCar(car_number))?;

        let lap = apply_crossing(record, now);
        tracing::debug!(car = %car_number, lap_ms = ?lap, count = record.count, "crossing recorded");
        Ok(record)
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    /// Live sessions in queue order.
    pub fn sessions(&self) -> &[RaceSession] {
        &self.sessions
    }

    /// The session currently racing.
    pub fn active(&self) -> Option<&RaceSession> {
        self.sessions
            .iter()
            .find(|s| s.status == SessionStatus::Active)
    }

    /// The first upcoming session in the queue.
    pub fn next_upcoming(&self) -> Option<&RaceSession> {
        self.sessions
            .iter()
            .find(|s| s.status == SessionStatus::Upcoming)
    }

    /// The most recently ended session.
    pub fn last_finished(&self) -> Option<&RaceSession> {
        self.last_finished.as_ref()
    }

    /// Looks up a live session.
    pub fn session(&self, id: SessionId) -> Option<&RaceSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    fn upcoming_mut(&mut self, id: SessionId) -> Result<&mut RaceSession, RaceError> {
        let session = self
            .sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(RaceError::SessionNotFound(id))?;
        if session.status != SessionStatus::Upcoming {
            return Err(RaceError::NotUpcoming(id));
        }
        Ok(session)
    }

    fn active_mut(&mut self) -> Result<&mut RaceSession, RaceError> {
        self.sessions
            .iter_mut()
            .find(|s| s.status == SessionStatus::Active)
            .ok_or(RaceError::NoActiveSession)
    }
}

impl Default for RaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Trims `name` and checks it against the rest of the roster.
///
/// `editing` is the car being renamed; its current name does not count as a
/// clash.
fn validate_name<'a>(
    session: &RaceSession,
    name: &'a str,
    editing: Option<CarNumber>,
) -> Result<&'a str, RaceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RaceError::EmptyName);
    }
    let taken = session
        .drivers
        .iter()
        .filter(|d| Some(d.car_number) != editing)
        .any(|d| d.name.to_lowercase() == name.to_lowercase());
    if taken {
        return Err(RaceError::DuplicateName(name.to_owned()));
    }
    Ok(name)
}

fn lowest_free_car(session: &RaceSession) -> Option<CarNumber> {
    (1..=MAX_DRIVERS as u8)
        .map(CarNumber)
        .find(|car| session.driver(*car).is_none())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_drivers(names: &[&str]) -> (RaceRegistry, SessionId) {
        let mut registry = RaceRegistry::new();
        let id = registry.create_session();
        for name in names {
            registry.add_driver(id, name).unwrap();
        }
        (registry, id)
    }

    fn racing(names: &[&str]) -> RaceRegistry {
        let (mut registry, _) = with_drivers(names);
        registry.start_race(0).unwrap();
        registry
    }

    // =====================================================================
    // Queue
    // =====================================================================

    #[test]
    fn test_session_ids_are_monotonic_and_never_reused() {
        let mut registry = RaceRegistry::new();
        let a = registry.create_session();
        let b = registry.create_session();
        registry.delete_session(b).unwrap();
        let c = registry.create_session();

        assert_eq!((a, b, c), (SessionId(1), SessionId(2), SessionId(3)));
    }

    #[test]
    fn test_new_session_is_upcoming_and_empty() {
        let mut registry = RaceRegistry::new();
        let id = registry.create_session();
        let session = registry.session(id).unwrap();

        assert_eq!(session.status, SessionStatus::Upcoming);
        assert!(session.drivers.is_empty());
        assert!(session.laps.is_empty());
        assert_eq!(session.race_mode, None);
    }

    #[test]
    fn test_delete_unknown_session_fails() {
        let mut registry = RaceRegistry::new();
        assert_eq!(
            registry.delete_session(SessionId(9)),
            Err(RaceError::SessionNotFound(SessionId(9)))
        );
    }

    #[test]
    fn test_active_session_cannot_be_deleted() {
        let mut registry = racing(&["Ann"]);
        assert_eq!(
            registry.delete_session(SessionId(1)),
            Err(RaceError::NotUpcoming(SessionId(1)))
        );
        assert!(registry.active().is_some());
    }

    // =====================================================================
    // Roster
    // =====================================================================

    #[test]
    fn test_cars_assigned_lowest_first_up_to_eight() {
        let mut registry = RaceRegistry::new();
        let id = registry.create_session();

        let cars: Vec<u8> = (0..8)
            .map(|i| registry.add_driver(id, &format!("Driver {i}")).unwrap().0)
            .collect();

        assert_eq!(cars, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(registry.add_driver(id, "Ninth"), Err(RaceError::RosterFull(id)));
    }

    #[test]
    fn test_removed_car_number_is_reused() {
        let (mut registry, id) = with_drivers(&["A", "B", "C", "D"]);

        registry.remove_driver(id, CarNumber(3)).unwrap();
        let car = registry.add_driver(id, "E").unwrap();

        assert_eq!(car, CarNumber(3));
    }

    #[test]
    fn test_laps_follow_roster() {
        let (mut registry, id) = with_drivers(&["Ann", "Ben"]);
        let keys = |r: &RaceRegistry| r.session(id).unwrap().laps.keys().copied().collect::<Vec<_>>();
        assert_eq!(keys(&registry), vec![CarNumber(1), CarNumber(2)]);

        registry.remove_driver(id, CarNumber(1)).unwrap();
        assert_eq!(keys(&registry), vec![CarNumber(2)]);
    }

    #[test]
    fn test_names_are_trimmed_and_unique_ignoring_case() {
        let (mut registry, id) = with_drivers(&["  Ann  "]);

        assert_eq!(registry.session(id).unwrap().drivers[0].name, "Ann");
        assert_eq!(
            registry.add_driver(id, "ANN"),
            Err(RaceError::DuplicateName("ANN".into()))
        );
        assert_eq!(registry.add_driver(id, "   "), Err(RaceError::EmptyName));
    }

    #[test]
    fn test_same_name_allowed_in_different_sessions() {
        let (mut registry, _) = with_drivers(&["Ann"]);
        let other = registry.create_session();
        assert!(registry.add_driver(other, "ann").is_ok());
    }

    #[test]
    fn test_edit_driver_may_keep_own_name_with_new_case() {
        let (mut registry, id) = with_drivers(&["Ann", "Ben"]);

        registry.edit_driver(id, CarNumber(1), "ANN").unwrap();
        assert_eq!(registry.session(id).unwrap().drivers[0].name, "ANN");

        assert_eq!(
            registry.edit_driver(id, CarNumber(1), "ben"),
            Err(RaceError::DuplicateName("ben".into()))
        );
        assert_eq!(registry.edit_driver(id, CarNumber(1), ""), Err(RaceError::EmptyName));
        assert_eq!(
            registry.edit_driver(id, CarNumber(5), "Cat"),
            Err(RaceError::DriverNotFound {
                session: id,
                car: CarNumber(5),
            })
        );
    }

    #[test]
    fn test_roster_frozen_once_racing() {
        let mut registry = racing(&["Ann"]);
        let id = SessionId(1);

        assert_eq!(registry.add_driver(id, "Ben"), Err(RaceError::NotUpcoming(id)));
        assert_eq!(registry.remove_driver(id, CarNumber(1)), Err(RaceError::NotUpcoming(id)));
        assert_eq!(
            registry.edit_driver(id, CarNumber(1), "Bea"),
            Err(RaceError::NotUpcoming(id))
        );
    }

    // =====================================================================
    // Race lifecycle
    // =====================================================================

    #[test]
    fn test_start_race_picks_first_upcoming() {
        let (mut registry, first) = with_drivers(&["Ann"]);
        let second = registry.create_session();
        registry.add_driver(second, "Ben").unwrap();

        assert_eq!(registry.start_race(1_234), Ok(first));

        let active = registry.active().unwrap();
        assert_eq!(active.race_mode, Some(RaceMode::Safe));
        assert_eq!(active.start_time, Some(1_234));
        assert_eq!(registry.next_upcoming().map(|s| s.id), Some(second));
    }

    #[test]
    fn test_only_one_race_at_a_time() {
        let mut registry = racing(&["Ann"]);
        let next = registry.create_session();
        registry.add_driver(next, "Ben").unwrap();

        assert_eq!(registry.start_race(5), Err(RaceError::RaceInProgress(SessionId(1))));
        let active = registry
            .sessions()
            .iter()
            .filter(|s| s.status == SessionStatus::Active)
            .count();
        assert_eq!(active, 1);
    }

    #[test]
    fn test_start_race_needs_drivers_and_a_session() {
        let mut registry = RaceRegistry::new();
        assert_eq!(registry.start_race(0), Err(RaceError::NoUpcomingSession));

        let id = registry.create_session();
        assert_eq!(registry.start_race(0), Err(RaceError::NoDrivers(id)));
    }

    #[test]
    fn test_any_flag_may_follow_any_non_finish_flag() {
        let mut registry = racing(&["Ann"]);

        for mode in [RaceMode::Danger, RaceMode::Safe, RaceMode::Safe, RaceMode::Hazard] {
            registry.set_mode(mode).unwrap();
            assert_eq!(registry.active().unwrap().race_mode, Some(mode));
        }
    }

    #[test]
    fn test_finish_is_terminal() {
        let mut registry = racing(&["Ann"]);
        registry.set_mode(RaceMode::Finish).unwrap();

        assert_eq!(registry.set_mode(RaceMode::Safe), Err(RaceError::ModeLocked));
        assert_eq!(registry.set_mode(RaceMode::Finish), Err(RaceError::ModeLocked));
    }

    #[test]
    fn test_set_mode_without_race_fails() {
        let mut registry = RaceRegistry::new();
        assert_eq!(registry.set_mode(RaceMode::Hazard), Err(RaceError::NoActiveSession));
    }

    #[test]
    fn test_end_session_requires_finish() {
        let mut registry = racing(&["Ann"]);
        assert_eq!(registry.end_session(), Err(RaceError::NotFinished(SessionId(1))));
    }

    #[test]
    fn test_end_session_moves_session_to_last_finished() {
        let mut registry = racing(&["Ann", "Ben"]);
        registry.set_mode(RaceMode::Finish).unwrap();

        assert_eq!(registry.end_session(), Ok(SessionId(1)));

        assert!(registry.sessions().is_empty());
        let finished = registry.last_finished().unwrap();
        assert_eq!(finished.id, SessionId(1));
        assert_eq!(finished.status, SessionStatus::Ended);
        assert_eq!(finished.race_mode, Some(RaceMode::Danger));
        assert_eq!(finished.drivers.len(), 2);

        registry.create_session();
        assert_eq!(registry.last_finished().unwrap().id, SessionId(1));
    }

    #[test]
    fn test_each_end_replaces_last_finished_with_exact_contents() {
        let mut registry = RaceRegistry::new();
        let first = registry.create_session();
        registry.add_driver(first, "Ann").unwrap();
        let second = registry.create_session();
        registry.add_driver(second, "Ben").unwrap();

        registry.start_race(0).unwrap();
        registry.record_crossing(CarNumber(1), 100).unwrap();
        registry.record_crossing(CarNumber(1), 1_300).unwrap();
        registry.set_mode(RaceMode::Finish).unwrap();
        let mut expected_first = registry.active().unwrap().clone();
        registry.end_session().unwrap();

        expected_first.status = SessionStatus::Ended;
        expected_first.race_mode = Some(RaceMode::Danger);
        assert_eq!(registry.last_finished(), Some(&expected_first));
        assert_eq!(
            expected_first.laps[&CarNumber(1)],
            LapRecord {
                count: 2,
                fastest_lap: Some(1_200),
                last_crossing: Some(1_300),
            }
        );

        registry.start_race(5_000).unwrap();
        registry.set_mode(RaceMode::Finish).unwrap();
        let mut expected_second = registry.active().unwrap().clone();
        registry.end_session().unwrap();

        expected_second.status = SessionStatus::Ended;
        expected_second.race_mode = Some(RaceMode::Danger);
        let finished = registry.last_finished().unwrap();
        assert_eq!(finished, &expected_second);
        assert_eq!(finished.id, second);
        assert_eq!(finished.drivers[0].name, "Ben");
        assert_eq!(finished.laps[&CarNumber(1)], LapRecord::default());
    }

    // =====================================================================
    // Crossings
    // =====================================================================

    #[test]
    fn test_crossings_need_an_active_race() {
        let (mut registry, _) = with_drivers(&["Ann"]);
        assert_eq!(
            registry.record_crossing(CarNumber(1), 0),
            Err(RaceError::NoActiveSession)
        );
    }

    #[test]
    fn test_crossings_ignored_under_danger() {
        let mut registry = racing(&["Ann"]);
        registry.set_mode(RaceMode::Danger).unwrap();

        assert_eq!(
            registry.record_crossing(CarNumber(1), 10),
            Err(RaceError::CrossingsNotCounted(Some(RaceMode::Danger)))
        );
        assert_eq!(registry.active().unwrap().laps[&CarNumber(1)].count, 0);
    }

    #[test]
    fn test_crossings_counted_under_hazard_and_finish() {
        let mut registry = racing(&["Ann"]);

        registry.set_mode(RaceMode::Hazard).unwrap();
        registry.record_crossing(CarNumber(1), 1_000).unwrap();
        registry.set_mode(RaceMode::Finish).unwrap();
        let record = registry.record_crossing(CarNumber(1), 2_500).unwrap();

        assert_eq!(record.count, 2);
        assert_eq!(record.fastest_lap, Some(1_500));
    }

    #[test]
    fn test_unknown_car_is_rejected() {
        let mut registry = racing(&["Ann"]);
        assert_eq!(
            registry.record_crossing(CarNumber(7), 0),
            Err(RaceError::UnknownCar(CarNumber(7)))
        );
    }
}
