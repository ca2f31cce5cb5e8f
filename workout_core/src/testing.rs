//! Test fixtures and an in-memory recording gateway.

use crate::gateway::SessionGateway;
use crate::{
    AddSetResponse, Error, ExerciseProgress, ExerciseStatus, LoggedSet, NewSet, Prescription,
    RepTarget, Result, Session, SessionExercise, SetUpdate,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use uuid::Uuid;

/// Fixed instant plus `secs` seconds
pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap() + Duration::seconds(secs)
}

/// A barbell exercise at 60kg x 8 with `sets` target sets
pub fn exercise(id: &str, position: u32, sets: u32) -> SessionExercise {
    SessionExercise {
        exercise_id: id.into(),
        name: id.into(),
        equipment: Some("barbell".into()),
        target: Prescription {
            sets: Some(sets),
            reps: Some(RepTarget::Count(8)),
            rest_seconds: Some(90),
            weight: Some(60.0),
            band_label: None,
        },
        superset_group: None,
        position,
        status: ExerciseStatus::Pending,
        started_at: None,
        completed_at: None,
        sets: Vec::new(),
    }
}

/// A persisted set at 60kg
pub fn logged(set_index: u32, reps: u32) -> LoggedSet {
    let at = ts(i64::from(set_index) * 60);
    LoggedSet {
        id: Some(Uuid::new_v4()),
        set_index,
        reps,
        weight: Some(60.0),
        band_label: None,
        started_at: Some(at),
        completed_at: Some(at + Duration::seconds(30)),
        created_at: Some(at + Duration::seconds(30)),
    }
}

pub fn session(exercises: Vec<SessionExercise>) -> Session {
    Session {
        id: Uuid::new_v4(),
        routine_id: Some("routine-1".into()),
        routine_name: Some("Test Routine".into()),
        started_at: ts(0),
        ended_at: None,
        notes: None,
        exercises,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Fetch,
    Start,
    Complete,
    AddSet,
    UpdateSet,
    DeleteSet,
    End,
    Cancel,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Fetch,
    Start(String),
    Complete(String),
    AddSet(NewSet),
    UpdateSet(Uuid),
    DeleteSet(Uuid),
    End(Option<String>),
    Cancel,
}

impl Call {
    pub fn op(&self) -> Op {
        match self {
            Call::Fetch => Op::Fetch,
            Call::Start(_) => Op::Start,
            Call::Complete(_) => Op::Complete,
            Call::AddSet(_) => Op::AddSet,
            Call::UpdateSet(_) => Op::UpdateSet,
            Call::DeleteSet(_) => Op::DeleteSet,
            Call::End(_) => Op::End,
            Call::Cancel => Op::Cancel,
        }
    }
}

/// In-memory server that records every call and can fail on demand
pub struct RecordingGateway {
    pub active: Option<Session>,
    pub calls: Vec<Call>,
    failures: Vec<(Op, usize)>,
    counts: HashMap<Op, usize>,
}

impl RecordingGateway {
    pub fn new(session: Session) -> Self {
        Self {
            active: Some(session),
            calls: Vec::new(),
            failures: Vec::new(),
            counts: HashMap::new(),
        }
    }

    /// Fail the `nth` (1-based) call of `op`
    pub fn fail_on(&mut self, op: Op, nth: usize) {
        self.failures.push((op, nth));
    }

    pub fn count(&self, op: Op) -> usize {
        self.calls.iter().filter(|c| c.op() == op).count()
    }

    /// Operations in call order, fetches excluded
    pub fn ops(&self) -> Vec<Op> {
        self.calls
            .iter()
            .map(Call::op)
            .filter(|op| *op != Op::Fetch)
            .collect()
    }

    fn record(&mut self, call: Call) -> Result<()> {
        let op = call.op();
        self.calls.push(call);
        let n = self.counts.entry(op).or_insert(0);
        *n += 1;
        if self.failures.contains(&(op, *n)) {
            return Err(Error::Other("network unreachable".into()));
        }
        Ok(())
    }

    fn active_mut(&mut self) -> Result<&mut Session> {
        self.active
            .as_mut()
            .ok_or_else(|| Error::Other("no active session".into()))
    }

    fn exercise_mut(&mut self, exercise_id: &str) -> Result<&mut SessionExercise> {
        self.active_mut()?
            .exercise_mut(exercise_id)
            .ok_or_else(|| Error::Other(format!("unknown exercise {}", exercise_id)))
    }
}

fn progress_of(exercise: &SessionExercise) -> ExerciseProgress {
    ExerciseProgress {
        exercise_id: exercise.exercise_id.clone(),
        status: exercise.status,
        started_at: exercise.started_at,
        completed_at: exercise.completed_at,
        duration_seconds: None,
    }
}

impl SessionGateway for RecordingGateway {
    fn fetch_active_session(&mut self) -> Result<Option<Session>> {
        self.record(Call::Fetch)?;
        Ok(self.active.clone())
    }

    fn start_exercise(
        &mut self,
        exercise_id: &str,
        started_at: DateTime<Utc>,
    ) -> Result<ExerciseProgress> {
        self.record(Call::Start(exercise_id.into()))?;
        let exercise = self.exercise_mut(exercise_id)?;
        exercise.status = ExerciseStatus::InProgress;
        exercise.started_at = Some(started_at);
        Ok(progress_of(exercise))
    }

    fn complete_exercise(
        &mut self,
        exercise_id: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<ExerciseProgress> {
        self.record(Call::Complete(exercise_id.into()))?;
        let exercise = self.exercise_mut(exercise_id)?;
        exercise.status = ExerciseStatus::Completed;
        exercise.completed_at = Some(completed_at);
        Ok(progress_of(exercise))
    }

    fn add_set(&mut self, set: &NewSet) -> Result<AddSetResponse> {
        self.record(Call::AddSet(set.clone()))?;
        let exercise = self.exercise_mut(&set.exercise_id)?;
        let set_index = exercise.free_set_index(set.set_index);
        let logged = LoggedSet {
            id: Some(Uuid::new_v4()),
            set_index,
            reps: set.reps,
            weight: set.weight,
            band_label: set.band_label.clone(),
            started_at: set.started_at,
            completed_at: set.completed_at,
            created_at: set.completed_at,
        };
        exercise.sets.push(logged.clone());
        if exercise.status == ExerciseStatus::Pending {
            exercise.status = ExerciseStatus::InProgress;
        }
        Ok(AddSetResponse {
            set: logged,
            exercise_progress: progress_of(exercise),
        })
    }

    fn update_set(&mut self, set_id: Uuid, update: &SetUpdate) -> Result<LoggedSet> {
        self.record(Call::UpdateSet(set_id))?;
        let session = self.active_mut()?;
        let set = session
            .exercises
            .iter_mut()
            .flat_map(|e| e.sets.iter_mut())
            .find(|s| s.id == Some(set_id))
            .ok_or_else(|| Error::Other(format!("unknown set {}", set_id)))?;
        set.reps = update.reps;
        set.weight = update.weight;
        set.band_label = update.band_label.clone();
        Ok(set.clone())
    }

    fn delete_set(&mut self, set_id: Uuid) -> Result<()> {
        self.record(Call::DeleteSet(set_id))?;
        self.active_mut()?
            .remove_set(set_id)
            .map(|_| ())
            .ok_or_else(|| Error::Other(format!("unknown set {}", set_id)))
    }

    fn end_session(&mut self, ended_at: DateTime<Utc>, notes: Option<&str>) -> Result<Session> {
        self.record(Call::End(notes.map(str::to_string)))?;
        let mut session = self
            .active
            .take()
            .ok_or_else(|| Error::Other("no active session".into()))?;
        session.ended_at = Some(ended_at);
        session.notes = notes.map(str::to_string).or(session.notes);
        Ok(session)
    }

    fn cancel_session(&mut self) -> Result<()> {
        self.record(Call::Cancel)?;
        self.active = None;
        Ok(())
    }
}
