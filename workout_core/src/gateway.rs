//! Set mutation gateway: the persistence boundary of the session engine.
//!
//! Every authoritative change to a session goes through this trait. The engine
//! never assumes a call succeeded until it returns `Ok`, and it updates its
//! snapshot only from the returned records.

use crate::{AddSetResponse, ExerciseProgress, LoggedSet, NewSet, Result, Session, SetUpdate};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Persistence operations consumed by the session engine
pub trait SessionGateway {
    /// Fetch the active session with exercises and sets embedded
    fn fetch_active_session(&mut self) -> Result<Option<Session>>;

    fn start_exercise(
        &mut self,
        exercise_id: &str,
        started_at: DateTime<Utc>,
    ) -> Result<ExerciseProgress>;

    fn complete_exercise(
        &mut self,
        exercise_id: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<ExerciseProgress>;

    fn add_set(&mut self, set: &NewSet) -> Result<AddSetResponse>;

    fn update_set(&mut self, set_id: Uuid, update: &SetUpdate) -> Result<LoggedSet>;

    fn delete_set(&mut self, set_id: Uuid) -> Result<()>;

    /// Finalize the active session and return it
    fn end_session(&mut self, ended_at: DateTime<Utc>, notes: Option<&str>) -> Result<Session>;

    /// Discard the active session
    fn cancel_session(&mut self) -> Result<()>;
}

impl<G: SessionGateway + ?Sized> SessionGateway for &mut G {
    fn fetch_active_session(&mut self) -> Result<Option<Session>> {
        (**self).fetch_active_session()
    }

    fn start_exercise(
        &mut self,
        exercise_id: &str,
        started_at: DateTime<Utc>,
    ) -> Result<ExerciseProgress> {
        (**self).start_exercise(exercise_id, started_at)
    }

    fn complete_exercise(
        &mut self,
        exercise_id: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<ExerciseProgress> {
        (**self).complete_exercise(exercise_id, completed_at)
    }

    fn add_set(&mut self, set: &NewSet) -> Result<AddSetResponse> {
        (**self).add_set(set)
    }

    fn update_set(&mut self, set_id: Uuid, update: &SetUpdate) -> Result<LoggedSet> {
        (**self).update_set(set_id, update)
    }

    fn delete_set(&mut self, set_id: Uuid) -> Result<()> {
        (**self).delete_set(set_id)
    }

    fn end_session(&mut self, ended_at: DateTime<Utc>, notes: Option<&str>) -> Result<Session> {
        (**self).end_session(ended_at, notes)
    }

    fn cancel_session(&mut self) -> Result<()> {
        (**self).cancel_session()
    }
}
