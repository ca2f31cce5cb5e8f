//! Session data loading and snapshot maintenance.
//!
//! The loader fetches the canonical session from the gateway and normalizes
//! it: exercises ordered by `position`, sets ordered by `set_index`, and
//! exercise identities made unique. The snapshot update helpers below are the
//! only way mutation responses are folded back into a session.

use crate::gateway::SessionGateway;
use crate::{ExerciseProgress, LoggedSet, Result, Session};
use std::collections::HashSet;
use uuid::Uuid;

/// Fetch and normalize the active session
pub fn load_active<G: SessionGateway>(gateway: &mut G) -> Result<Option<Session>> {
    let session = gateway.fetch_active_session()?;
    match session {
        Some(session) => {
            tracing::debug!(
                "Loaded active session {} with {} exercises",
                session.id,
                session.exercises.len()
            );
            Ok(Some(normalize(session)))
        }
        None => {
            tracing::debug!("No active session");
            Ok(None)
        }
    }
}

/// Order exercises and sets, and keep the first exercise for each identity
pub fn normalize(mut session: Session) -> Session {
    let session_id = session.id;
    let mut seen = HashSet::new();
    session.exercises.retain(|e| {
        let fresh = seen.insert(e.exercise_id.clone());
        if !fresh {
            tracing::warn!(
                "Dropping duplicate exercise {} from session {}",
                e.exercise_id,
                session_id
            );
        }
        fresh
    });
    session.exercises.sort_by_key(|e| e.position);
    for exercise in &mut session.exercises {
        exercise.sets.sort_by_key(|s| s.set_index);
    }
    session
}

impl Session {
    /// Fold a partial progress record into the snapshot
    pub fn apply_progress(&mut self, progress: &ExerciseProgress) -> bool {
        let Some(exercise) = self.exercise_mut(&progress.exercise_id) else {
            tracing::warn!(
                "Progress for unknown exercise {} ignored",
                progress.exercise_id
            );
            return false;
        };
        exercise.status = progress.status;
        if progress.started_at.is_some() {
            exercise.started_at = progress.started_at;
        }
        if progress.completed_at.is_some() {
            exercise.completed_at = progress.completed_at;
        }
        true
    }

    /// Insert a persisted set, replacing any set with the same identity
    pub fn upsert_set(&mut self, exercise_id: &str, set: LoggedSet) -> bool {
        let Some(exercise) = self.exercise_mut(exercise_id) else {
            tracing::warn!("Set for unknown exercise {} ignored", exercise_id);
            return false;
        };
        let existing = match set.id {
            Some(id) => exercise.sets.iter().position(|s| s.id == Some(id)),
            None => None,
        };
        match existing {
            Some(idx) => exercise.sets[idx] = set,
            None => exercise.sets.push(set),
        }
        exercise.sets.sort_by_key(|s| s.set_index);
        true
    }

    /// Replace a persisted set wherever it lives
    pub fn replace_set(&mut self, set: LoggedSet) -> bool {
        let Some(id) = set.id else {
            return false;
        };
        for exercise in &mut self.exercises {
            if let Some(slot) = exercise.sets.iter_mut().find(|s| s.id == Some(id)) {
                *slot = set;
                return true;
            }
        }
        false
    }

    /// Remove a persisted set, returning its owning exercise and the set
    pub fn remove_set(&mut self, set_id: Uuid) -> Option<(String, LoggedSet)> {
        for exercise in &mut self.exercises {
            if let Some(idx) = exercise.sets.iter().position(|s| s.id == Some(set_id)) {
                let set = exercise.sets.remove(idx);
                return Some((exercise.exercise_id.clone(), set));
            }
        }
        None
    }

    /// Find a persisted set by identity
    pub fn find_set(&self, set_id: Uuid) -> Option<(&str, &LoggedSet)> {
        self.exercises.iter().find_map(|e| {
            e.sets
                .iter()
                .find(|s| s.id == Some(set_id))
                .map(|s| (e.exercise_id.as_str(), s))
        })
    }
}
