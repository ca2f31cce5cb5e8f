//! Session lifecycle controller.
//!
//! Drives a session through `preview -> workout -> ended | cancelled`. Every
//! action either fully succeeds (the snapshot is replaced and navigation
//! proceeds) or fails with the phase and current exercise left where they
//! were. The controller never retries on its own.
//!
//! Sets the gateway has already acknowledged are facts even when a later
//! write in the same action fails: they are kept in the snapshot so that a
//! retry only writes what is still missing.

use crate::checklist::{build_rows, ChecklistRow, ChecklistTaps, RowState};
use crate::completion::{incomplete_exercises, is_completed, session_progress, SessionProgress};
use crate::config::EngineConfig;
use crate::error::{MissingTarget, MissingTargets};
use crate::gateway::SessionGateway;
use crate::summary::{summarize, SessionSummary};
use crate::undo::{PendingDeletedSet, UndoBuffer};
use crate::{
    loader, navigator, superset, Error, ExerciseStatus, NewSet, Result, Session, SessionExercise,
    SetUpdate,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Where the session is in its lifecycle
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    /// Session exists, no exercise has been started
    Preview,
    /// Actively progressing; `None` once every exercise is done
    Workout { current: Option<String> },
    Ended,
    Cancelled,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Ended | SessionPhase::Cancelled)
    }
}

/// Actions the presentation layer can request
#[derive(Clone, Debug, PartialEq)]
pub enum SessionAction {
    Begin,
    TapSet { exercise_id: String, set_index: u32 },
    UntapSet { exercise_id: String, set_index: u32 },
    FinishExercise,
    SkipExercise,
    UpdateSet { set_id: Uuid, update: SetUpdate },
    DeleteSet { set_id: Uuid },
    UndoDeleteSet,
    EndSession { forced: bool, notes: Option<String> },
    CancelSession,
}

/// Result of a successful action
#[derive(Clone, Debug, PartialEq)]
pub enum ActionOutcome {
    /// The first exercise was started
    Started { exercise_id: String },
    /// Navigation moved on to another exercise
    Advanced { exercise_id: String },
    /// Nothing is left to work on; the session can be ended
    ReadyToEnd,
    /// Ending now would leave these exercises incomplete
    ConfirmationRequired { incomplete: Vec<String> },
    Ended(SessionSummary),
    Cancelled,
    /// Local or set-level change with no navigation
    Applied,
}

/// Check every exercise has the targets a guided session needs
pub fn check_readiness(session: &Session, config: &EngineConfig) -> Result<()> {
    let mut missing = Vec::new();
    for exercise in &session.exercises {
        if exercise.target.weight.is_none() && !config.is_weightless(exercise.equipment.as_deref()) {
            missing.push(MissingTarget {
                exercise: exercise.name.clone(),
                field: "weight",
            });
        }
        if exercise.target.reps.is_none() {
            missing.push(MissingTarget {
                exercise: exercise.name.clone(),
                field: "reps",
            });
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(MissingTargets(missing)))
    }
}

/// Wrap any gateway failure as a mutation failure, keeping its message
fn mutation<T>(operation: &'static str, result: Result<T>) -> Result<T> {
    result.map_err(|e| {
        tracing::warn!("{} failed: {}", operation, e);
        match e {
            Error::Mutation { .. } => e,
            other => Error::Mutation {
                operation,
                message: other.to_string(),
            },
        }
    })
}

/// Set request built from an exercise's prescription for a local tap
fn set_from_tap(exercise: &SessionExercise, set_index: u32, tapped_at: DateTime<Utc>) -> NewSet {
    NewSet {
        exercise_id: exercise.exercise_id.clone(),
        set_index: Some(set_index),
        reps: exercise
            .target
            .reps
            .as_ref()
            .map(|r| r.default_reps())
            .unwrap_or(0),
        weight: exercise.target.weight,
        band_label: exercise.target.band_label.clone(),
        started_at: None,
        completed_at: Some(tapped_at),
    }
}

/// Phase to resume in for an existing session
fn initial_phase(session: &Session) -> SessionPhase {
    if session.ended_at.is_some() {
        return SessionPhase::Ended;
    }
    let started = session
        .exercises
        .iter()
        .any(|e| e.status != ExerciseStatus::Pending || !e.sets.is_empty());
    if started {
        SessionPhase::Workout {
            current: navigator::resume_point(&session.exercises).map(|e| e.exercise_id.clone()),
        }
    } else {
        SessionPhase::Preview
    }
}

/// Guided session state machine over one owned session snapshot
pub struct SessionController<G: SessionGateway> {
    gateway: G,
    config: EngineConfig,
    session: Session,
    phase: SessionPhase,
    taps: ChecklistTaps,
    undo: UndoBuffer,
    summary: Option<SessionSummary>,
}

impl<G: SessionGateway> SessionController<G> {
    /// Build a controller around a session snapshot, resuming where it left off
    pub fn new(gateway: G, session: Session, config: EngineConfig) -> Self {
        let session = loader::normalize(session);
        let phase = initial_phase(&session);
        tracing::info!("Session {} opened in {:?}", session.id, phase);
        Self {
            gateway,
            undo: UndoBuffer::new(config.undo_window),
            config,
            session,
            phase,
            taps: ChecklistTaps::default(),
            summary: None,
        }
    }

    /// Load the active session through the gateway
    pub fn open(mut gateway: G, config: EngineConfig) -> Result<Option<Self>> {
        match loader::load_active(&mut gateway)? {
            Some(session) => Ok(Some(Self::new(gateway, session, config))),
            None => Ok(None),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn into_gateway(self) -> G {
        self.gateway
    }

    /// Summary of the finalized session, once ended
    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    pub fn current_exercise(&self) -> Option<&SessionExercise> {
        match &self.phase {
            SessionPhase::Workout {
                current: Some(id),
            } => self.session.exercise(id),
            _ => None,
        }
    }

    /// Superset partner of the current exercise
    pub fn partner_exercise(&self) -> Option<&SessionExercise> {
        let current = self.current_exercise()?;
        superset::partner(&current.exercise_id, &self.session.exercises)
    }

    pub fn checklist(&self, exercise_id: &str) -> Vec<ChecklistRow> {
        match self.session.exercise(exercise_id) {
            Some(exercise) => build_rows(exercise, self.taps.for_exercise(exercise_id)),
            None => Vec::new(),
        }
    }

    pub fn progress(&self) -> SessionProgress {
        session_progress(&self.session)
    }

    pub fn pending_undo(&self, now: DateTime<Utc>) -> Option<&PendingDeletedSet> {
        self.undo.peek(now)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one action
    pub fn dispatch(&mut self, action: SessionAction, now: DateTime<Utc>) -> Result<ActionOutcome> {
        match action {
            SessionAction::Begin => self.begin(now),
            SessionAction::TapSet {
                exercise_id,
                set_index,
            } => self.tap_set(&exercise_id, set_index, now),
            SessionAction::UntapSet {
                exercise_id,
                set_index,
            } => self.untap_set(&exercise_id, set_index),
            SessionAction::FinishExercise => self.finish_exercise(now),
            SessionAction::SkipExercise => self.skip_exercise(now),
            SessionAction::UpdateSet { set_id, update } => self.update_set(set_id, &update),
            SessionAction::DeleteSet { set_id } => self.delete_set(set_id, now),
            SessionAction::UndoDeleteSet => self.undo_delete_set(now),
            SessionAction::EndSession { forced, notes } => {
                self.end_session(forced, notes.as_deref(), now)
            }
            SessionAction::CancelSession => self.cancel_session(),
        }
    }

    /// Validate readiness and start the first pending exercise
    pub fn begin(&mut self, now: DateTime<Utc>) -> Result<ActionOutcome> {
        self.ensure_open()?;
        if self.phase != SessionPhase::Preview {
            return Err(Error::State("Session has already begun".into()));
        }
        check_readiness(&self.session, &self.config)?;

        let pairs = superset::resolve_partners(&self.session.exercises);
        for group in pairs.malformed_groups() {
            tracing::warn!(
                "Superset group {:?} has {} members; treating them as unpaired",
                group.group,
                group.members.len()
            );
        }

        let Some(first) =
            navigator::first_pending(&self.session.exercises).map(|e| e.exercise_id.clone())
        else {
            self.phase = SessionPhase::Workout { current: None };
            return Ok(ActionOutcome::ReadyToEnd);
        };

        let mut next = self.session.clone();
        self.start_if_pending(&mut next, &first, now)?;
        self.commit(next);
        self.phase = SessionPhase::Workout {
            current: Some(first.clone()),
        };
        tracing::info!("Began session {} with {}", self.session.id, first);
        Ok(ActionOutcome::Started { exercise_id: first })
    }

    /// Mark a set slot as done locally
    pub fn tap_set(
        &mut self,
        exercise_id: &str,
        set_index: u32,
        now: DateTime<Utc>,
    ) -> Result<ActionOutcome> {
        self.ensure_open()?;
        let exercise = self
            .session
            .exercise(exercise_id)
            .ok_or_else(|| Error::Other(format!("Unknown exercise {}", exercise_id)))?;

        let slot = build_rows(exercise, None)
            .into_iter()
            .find(|row| row.set_index == set_index);
        match slot {
            Some(row) if row.is_logged() => {
                tracing::debug!("Set {} of {} already logged", set_index, exercise_id);
            }
            Some(_) => {
                self.taps.tap(exercise_id, set_index, now);
            }
            None => {
                return Err(Error::Other(format!(
                    "{} has no set slot {}",
                    exercise.name, set_index
                )));
            }
        }
        Ok(ActionOutcome::Applied)
    }

    pub fn untap_set(&mut self, exercise_id: &str, set_index: u32) -> Result<ActionOutcome> {
        self.ensure_open()?;
        self.taps.untap(exercise_id, set_index);
        Ok(ActionOutcome::Applied)
    }

    /// Persist tapped sets, complete the current exercise, and move on
    pub fn finish_exercise(&mut self, now: DateTime<Utc>) -> Result<ActionOutcome> {
        self.ensure_open()?;
        let current_id = self.current_id()?;
        let mut next = self.session.clone();
        let exercise = next
            .exercise(&current_id)
            .cloned()
            .ok_or_else(|| Error::State(format!("Current exercise {} not found", current_id)))?;

        if exercise.status != ExerciseStatus::Completed {
            let unsaved: Vec<_> = build_rows(&exercise, self.taps.for_exercise(&current_id))
                .into_iter()
                .filter_map(|row| match row.state {
                    RowState::CheckedUnsaved { tapped_at } => Some((row.set_index, tapped_at)),
                    _ => None,
                })
                .collect();

            // One write at a time; a failure stops before completion.
            for (set_index, tapped_at) in unsaved {
                let request = set_from_tap(&exercise, set_index, tapped_at);
                match mutation("add set", self.gateway.add_set(&request)) {
                    Ok(response) => {
                        next.upsert_set(&current_id, response.set);
                        next.apply_progress(&response.exercise_progress);
                        self.taps.untap(&current_id, set_index);
                    }
                    Err(e) => {
                        self.commit(next);
                        return Err(e);
                    }
                }
            }

            let progress = match mutation(
                "complete exercise",
                self.gateway.complete_exercise(&current_id, now),
            ) {
                Ok(progress) => progress,
                Err(e) => {
                    self.commit(next);
                    return Err(e);
                }
            };
            next.apply_progress(&progress);
        }

        self.taps.clear_exercise(&current_id);
        tracing::info!("Finished {}", current_id);
        self.advance(next, &current_id, now)
    }

    /// Complete the current exercise (and its superset partner) without
    /// writing sets, then move on
    pub fn skip_exercise(&mut self, now: DateTime<Utc>) -> Result<ActionOutcome> {
        self.ensure_open()?;
        let current_id = self.current_id()?;
        let mut next = self.session.clone();

        let mut to_complete = vec![current_id.clone()];
        let pairs = superset::resolve_partners(&next.exercises);
        if let Some(partner_id) = pairs.partner_of(&current_id) {
            if next.exercise(partner_id).is_some_and(|p| !is_completed(p)) {
                to_complete.push(partner_id.to_string());
            }
        }

        for exercise_id in to_complete {
            let done = next
                .exercise(&exercise_id)
                .is_some_and(|e| e.status == ExerciseStatus::Completed);
            if !done {
                match mutation(
                    "complete exercise",
                    self.gateway.complete_exercise(&exercise_id, now),
                ) {
                    Ok(progress) => {
                        next.apply_progress(&progress);
                    }
                    Err(e) => {
                        self.commit(next);
                        return Err(e);
                    }
                }
            }
            self.taps.clear_exercise(&exercise_id);
            tracing::info!("Skipped {}", exercise_id);
        }

        self.advance(next, &current_id, now)
    }

    /// End the session, asking for confirmation first unless forced
    pub fn end_session(
        &mut self,
        forced: bool,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ActionOutcome> {
        self.ensure_open()?;
        if !forced {
            let incomplete: Vec<String> = incomplete_exercises(&self.session)
                .into_iter()
                .map(|e| e.name.clone())
                .collect();
            if !incomplete.is_empty() {
                tracing::debug!(
                    "End requested with {} incomplete exercises",
                    incomplete.len()
                );
                return Ok(ActionOutcome::ConfirmationRequired { incomplete });
            }
        }
        self.finalize(notes, now)
    }

    /// Discard the session
    pub fn cancel_session(&mut self) -> Result<ActionOutcome> {
        self.ensure_open()?;
        mutation("cancel session", self.gateway.cancel_session())?;
        self.phase = SessionPhase::Cancelled;
        self.taps.clear();
        self.undo.clear();
        tracing::info!("Cancelled session {}", self.session.id);
        Ok(ActionOutcome::Cancelled)
    }

    /// Delete a persisted set and hold it for undo
    pub fn delete_set(&mut self, set_id: Uuid, now: DateTime<Utc>) -> Result<ActionOutcome> {
        self.ensure_open()?;
        if self.session.find_set(set_id).is_none() {
            return Err(Error::Other(format!("Unknown set {}", set_id)));
        }

        mutation("delete set", self.gateway.delete_set(set_id))?;

        let mut next = self.session.clone();
        if let Some((exercise_id, set)) = next.remove_set(set_id) {
            self.undo.push(exercise_id, set, now);
        }
        self.commit(next);
        Ok(ActionOutcome::Applied)
    }

    /// Re-create the most recently deleted set while its window is open
    pub fn undo_delete_set(&mut self, now: DateTime<Utc>) -> Result<ActionOutcome> {
        self.ensure_open()?;
        self.undo.expire(now);
        let pending = self
            .undo
            .peek(now)
            .cloned()
            .ok_or_else(|| Error::State("Nothing to undo".into()))?;

        let request = NewSet {
            exercise_id: pending.exercise_id.clone(),
            set_index: Some(pending.set.set_index),
            reps: pending.set.reps,
            weight: pending.set.weight,
            band_label: pending.set.band_label.clone(),
            started_at: pending.set.started_at,
            completed_at: pending.set.completed_at,
        };
        let response = mutation("add set", self.gateway.add_set(&request))?;

        let mut next = self.session.clone();
        next.upsert_set(&pending.exercise_id, response.set);
        next.apply_progress(&response.exercise_progress);
        self.commit(next);
        self.undo.clear();
        tracing::debug!("Restored deleted set for {}", pending.exercise_id);
        Ok(ActionOutcome::Applied)
    }

    /// Edit reps/weight/band of a persisted set
    pub fn update_set(&mut self, set_id: Uuid, update: &SetUpdate) -> Result<ActionOutcome> {
        self.ensure_open()?;
        if self.session.find_set(set_id).is_none() {
            return Err(Error::Other(format!("Unknown set {}", set_id)));
        }

        let set = mutation("update set", self.gateway.update_set(set_id, update))?;

        let mut next = self.session.clone();
        next.replace_set(set);
        self.commit(next);
        Ok(ActionOutcome::Applied)
    }

    fn ensure_open(&self) -> Result<()> {
        match self.phase {
            SessionPhase::Ended => Err(Error::State("Session has ended".into())),
            SessionPhase::Cancelled => Err(Error::State("Session was cancelled".into())),
            _ => Ok(()),
        }
    }

    fn current_id(&self) -> Result<String> {
        match &self.phase {
            SessionPhase::Workout {
                current: Some(id),
            } => Ok(id.clone()),
            SessionPhase::Workout { current: None } => {
                Err(Error::State("No exercise is in progress".into()))
            }
            _ => Err(Error::State("Session has not begun".into())),
        }
    }

    /// Replace the snapshot wholesale
    fn commit(&mut self, next: Session) {
        for exercise in &next.exercises {
            self.taps.prune_logged(exercise);
        }
        self.session = next;
    }

    fn start_if_pending(
        &mut self,
        session: &mut Session,
        exercise_id: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let pending = session
            .exercise(exercise_id)
            .is_some_and(|e| e.status == ExerciseStatus::Pending);
        if pending {
            let progress = mutation(
                "start exercise",
                self.gateway.start_exercise(exercise_id, now),
            )?;
            session.apply_progress(&progress);
        }
        Ok(())
    }

    /// Navigate from `from` within `next`, starting the chosen exercise or
    /// ending the session when nothing is left
    fn advance(&mut self, mut next: Session, from: &str, now: DateTime<Utc>) -> Result<ActionOutcome> {
        let target = next
            .exercise(from)
            .and_then(|current| navigator::next_pending(current, &next.exercises))
            .map(|e| e.exercise_id.clone());

        match target {
            Some(exercise_id) => {
                if let Err(e) = self.start_if_pending(&mut next, &exercise_id, now) {
                    self.commit(next);
                    return Err(e);
                }
                self.commit(next);
                self.phase = SessionPhase::Workout {
                    current: Some(exercise_id.clone()),
                };
                tracing::info!("Advanced from {} to {}", from, exercise_id);
                Ok(ActionOutcome::Advanced { exercise_id })
            }
            None => {
                self.commit(next);
                tracing::info!("No exercises left after {}, ending session", from);
                self.finalize(None, now)
            }
        }
    }

    fn finalize(&mut self, notes: Option<&str>, now: DateTime<Utc>) -> Result<ActionOutcome> {
        let finalized = mutation("end session", self.gateway.end_session(now, notes))?;
        let finalized = loader::normalize(finalized);
        let summary = summarize(&finalized);

        self.session = finalized;
        self.phase = SessionPhase::Ended;
        self.taps.clear();
        self.undo.clear();
        self.summary = Some(summary.clone());
        tracing::info!(
            "Ended session {}: {} sets, {} reps, volume {}",
            self.session.id,
            summary.total_sets,
            summary.total_reps,
            summary.total_volume
        );
        Ok(ActionOutcome::Ended(summary))
    }
}
