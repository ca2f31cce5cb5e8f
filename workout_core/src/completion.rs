//! Exercise completion evaluation.
//!
//! An exercise counts as completed either when the server says so or when
//! enough sets have been persisted to meet its target. Both signals are
//! treated as equally authoritative, since the set count usually lands
//! before the completed status round-trips back.

use crate::checklist::dedup_sets;
use crate::{ExerciseStatus, Session, SessionExercise};

/// Number of distinct persisted sets of an exercise
pub fn logged_set_count(exercise: &SessionExercise) -> usize {
    dedup_sets(&exercise.exercise_id, &exercise.sets).len()
}

/// Whether the exercise is done
pub fn is_completed(exercise: &SessionExercise) -> bool {
    if exercise.status == ExerciseStatus::Completed {
        return true;
    }
    match exercise.target.target_sets() {
        Some(target) => logged_set_count(exercise) >= target as usize,
        None => false,
    }
}

/// Derived status, folding the set-count signal into the stored one
pub fn derived_status(exercise: &SessionExercise) -> ExerciseStatus {
    if is_completed(exercise) {
        ExerciseStatus::Completed
    } else if exercise.status == ExerciseStatus::InProgress || !exercise.sets.is_empty() {
        ExerciseStatus::InProgress
    } else {
        ExerciseStatus::Pending
    }
}

/// Completed/total pair for a whole session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionProgress {
    pub completed: usize,
    pub total: usize,
}

impl SessionProgress {
    pub fn remaining(&self) -> usize {
        self.total - self.completed
    }

    pub fn is_complete(&self) -> bool {
        self.completed == self.total
    }
}

pub fn session_progress(session: &Session) -> SessionProgress {
    SessionProgress {
        completed: session.exercises.iter().filter(|e| is_completed(e)).count(),
        total: session.exercises.len(),
    }
}

/// Exercises that are not yet completed, in list order
pub fn incomplete_exercises(session: &Session) -> Vec<&SessionExercise> {
    session
        .exercises
        .iter()
        .filter(|e| !is_completed(e))
        .collect()
}
