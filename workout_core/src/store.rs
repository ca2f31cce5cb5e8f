//! File-backed session gateway.
//!
//! The active session lives in one JSON document that is rewritten
//! atomically on every mutation. Ending a session appends the finalized
//! session as one line to a JSONL log (with file locking) and removes the
//! active document; cancelling just removes it.

use crate::gateway::SessionGateway;
use crate::{
    AddSetResponse, Error, ExerciseProgress, ExerciseStatus, LoggedSet, NewSet, Result, Routine,
    Session, SessionExercise, SetUpdate,
};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

pub const ACTIVE_SESSION_FILE: &str = "active_session.json";
pub const FINISHED_LOG_FILE: &str = "finished_sessions.wal";

/// Gateway that persists to a data directory
pub struct FileGateway {
    data_dir: PathBuf,
}

impl FileGateway {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn active_path(&self) -> PathBuf {
        self.data_dir.join(ACTIVE_SESSION_FILE)
    }

    pub fn finished_log_path(&self) -> PathBuf {
        self.data_dir.join(FINISHED_LOG_FILE)
    }

    /// Create the active session from a routine snapshot
    pub fn start_session(&mut self, routine: &Routine, now: DateTime<Utc>) -> Result<Session> {
        if self.active_path().exists() {
            return Err(Error::State(
                "A session is already active; end or cancel it first".into(),
            ));
        }
        let errors = routine.validate();
        if !errors.is_empty() {
            return Err(Error::Other(format!(
                "Invalid routine: {}",
                errors.join("; ")
            )));
        }

        let session = routine.to_session(now);
        self.save(&session)?;
        tracing::info!(
            "Started session {} from routine {:?}",
            session.id,
            routine.name
        );
        Ok(session)
    }

    fn load(&self) -> Result<Option<Session>> {
        let path = self.active_path();
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(&path)?;
        file.lock_shared()?;
        let mut contents = String::new();
        let read = BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        let session = serde_json::from_str(&contents)?;
        tracing::debug!("Loaded active session from {:?}", path);
        Ok(Some(session))
    }

    fn load_required(&self) -> Result<Session> {
        self.load()?
            .ok_or_else(|| Error::State("No active session".into()))
    }

    /// Atomically replace the active session document
    fn save(&self, session: &Session) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;

        let temp = NamedTempFile::new_in(&self.data_dir)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(session)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;
        temp.persist(self.active_path())
            .map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved active session {}", session.id);
        Ok(())
    }

    /// Load, modify and save the active session
    fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Session) -> Result<T>,
    {
        let mut session = self.load_required()?;
        let out = f(&mut session)?;
        self.save(&session)?;
        Ok(out)
    }

    fn append_finished(&self, session: &Session) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.finished_log_path())?;
        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(session)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;
        tracing::debug!("Appended session {} to finished log", session.id);
        Ok(())
    }
}

fn exercise_mut<'a>(session: &'a mut Session, exercise_id: &str) -> Result<&'a mut SessionExercise> {
    session
        .exercise_mut(exercise_id)
        .ok_or_else(|| Error::Other(format!("Unknown exercise {}", exercise_id)))
}

fn progress_of(exercise: &SessionExercise) -> ExerciseProgress {
    let duration_seconds = match (exercise.started_at, exercise.completed_at) {
        (Some(start), Some(end)) => u32::try_from((end - start).num_seconds()).ok(),
        _ => None,
    };
    ExerciseProgress {
        exercise_id: exercise.exercise_id.clone(),
        status: exercise.status,
        started_at: exercise.started_at,
        completed_at: exercise.completed_at,
        duration_seconds,
    }
}

impl SessionGateway for FileGateway {
    fn fetch_active_session(&mut self) -> Result<Option<Session>> {
        self.load()
    }

    fn start_exercise(
        &mut self,
        exercise_id: &str,
        started_at: DateTime<Utc>,
    ) -> Result<ExerciseProgress> {
        self.update(|session| {
            let exercise = exercise_mut(session, exercise_id)?;
            if exercise.status == ExerciseStatus::Pending {
                exercise.status = ExerciseStatus::InProgress;
            }
            if exercise.started_at.is_none() {
                exercise.started_at = Some(started_at);
            }
            Ok(progress_of(exercise))
        })
    }

    fn complete_exercise(
        &mut self,
        exercise_id: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<ExerciseProgress> {
        self.update(|session| {
            let exercise = exercise_mut(session, exercise_id)?;
            exercise.status = ExerciseStatus::Completed;
            exercise.completed_at = Some(completed_at);
            Ok(progress_of(exercise))
        })
    }

    fn add_set(&mut self, set: &NewSet) -> Result<AddSetResponse> {
        self.update(|session| {
            let exercise = exercise_mut(session, &set.exercise_id)?;
            let set_index = exercise.free_set_index(set.set_index);
            let logged = LoggedSet {
                id: Some(Uuid::new_v4()),
                set_index,
                reps: set.reps,
                weight: set.weight,
                band_label: set.band_label.clone(),
                started_at: set.started_at,
                completed_at: set.completed_at,
                created_at: Some(Utc::now()),
            };
            exercise.sets.push(logged.clone());
            if exercise.status == ExerciseStatus::Pending {
                exercise.status = ExerciseStatus::InProgress;
                exercise.started_at = exercise.started_at.or(set.started_at);
            }
            Ok(AddSetResponse {
                set: logged,
                exercise_progress: progress_of(exercise),
            })
        })
    }

    fn update_set(&mut self, set_id: Uuid, update: &SetUpdate) -> Result<LoggedSet> {
        self.update(|session| {
            let set = session
                .exercises
                .iter_mut()
                .flat_map(|e| e.sets.iter_mut())
                .find(|s| s.id == Some(set_id))
                .ok_or_else(|| Error::Other(format!("Unknown set {}", set_id)))?;
            set.reps = update.reps;
            set.weight = update.weight;
            set.band_label = update.band_label.clone();
            Ok(set.clone())
        })
    }

    fn delete_set(&mut self, set_id: Uuid) -> Result<()> {
        self.update(|session| {
            session
                .remove_set(set_id)
                .map(|_| ())
                .ok_or_else(|| Error::Other(format!("Unknown set {}", set_id)))
        })
    }

    fn end_session(&mut self, ended_at: DateTime<Utc>, notes: Option<&str>) -> Result<Session> {
        let mut session = self.load_required()?;
        session.ended_at = Some(ended_at);
        if let Some(notes) = notes {
            session.notes = Some(notes.to_string());
        }

        self.append_finished(&session)?;
        std::fs::remove_file(self.active_path())?;
        tracing::info!("Finalized session {}", session.id);
        Ok(session)
    }

    fn cancel_session(&mut self) -> Result<()> {
        let path = self.active_path();
        if !path.exists() {
            return Err(Error::State("No active session".into()));
        }
        std::fs::remove_file(&path)?;
        tracing::info!("Discarded active session at {:?}", path);
        Ok(())
    }
}

/// Read all finalized sessions from a finished-session log
pub fn read_finished(path: &Path) -> Result<Vec<Session>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut sessions = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<Session>(&line) {
            Ok(session) => sessions.push(session),
            Err(e) => {
                tracing::warn!("Failed to parse session at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} finished sessions", sessions.len());
    Ok(sessions)
}
