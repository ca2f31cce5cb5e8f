//! Progression navigation for guided sessions.
//!
//! Selection rules for the next exercise after `current`:
//!
//! 1. **Candidates**: every exercise that is neither `current` nor completed,
//!    ordered by `position`.
//! 2. **Superset partner**: if `current` has a valid partner that is still a
//!    candidate, it wins regardless of position.
//! 3. **Positional order**: the first candidate positioned after `current`,
//!    wrapping around to the first candidate overall.

use crate::completion::is_completed;
use crate::superset::resolve_partners;
use crate::{ExerciseStatus, SessionExercise};

/// Candidates for the next unit of work, ordered by position
fn pending_excluding<'a>(
    current: Option<&str>,
    all: &'a [SessionExercise],
) -> Vec<&'a SessionExercise> {
    let mut pending: Vec<_> = all
        .iter()
        .filter(|e| Some(e.exercise_id.as_str()) != current && !is_completed(e))
        .collect();
    pending.sort_by_key(|e| e.position);
    pending
}

/// Pick the next exercise to work on after `current`
///
/// Returns `None` when nothing is left and the session is ready to end.
pub fn next_pending<'a>(
    current: &SessionExercise,
    all: &'a [SessionExercise],
) -> Option<&'a SessionExercise> {
    let pending = pending_excluding(Some(&current.exercise_id), all);
    if pending.is_empty() {
        tracing::debug!("No pending exercises after {}", current.exercise_id);
        return None;
    }

    let pairs = resolve_partners(all);
    if let Some(partner_id) = pairs.partner_of(&current.exercise_id) {
        if let Some(partner) = pending.iter().find(|e| e.exercise_id == partner_id) {
            tracing::debug!(
                "Superset partner {} follows {}",
                partner.exercise_id,
                current.exercise_id
            );
            return Some(*partner);
        }
    }

    pending
        .iter()
        .find(|e| e.position > current.position)
        .or_else(|| pending.first())
        .copied()
}

/// First exercise to start when a session begins
pub fn first_pending(all: &[SessionExercise]) -> Option<&SessionExercise> {
    pending_excluding(None, all).into_iter().next()
}

/// Exercise to resume on when an already-started session is reopened
///
/// Prefers the earliest started-but-unfinished exercise, then the first
/// pending one.
pub fn resume_point(all: &[SessionExercise]) -> Option<&SessionExercise> {
    let pending = pending_excluding(None, all);
    pending
        .iter()
        .find(|e| e.status == ExerciseStatus::InProgress || !e.sets.is_empty())
        .or_else(|| pending.first())
        .copied()
}
