//! Session summary aggregation.
//!
//! Totals are computed over the finalized exercise/set data returned when a
//! session ends. Trend analytics live elsewhere.

use crate::checklist::dedup_sets;
use crate::completion::is_completed;
use crate::Session;
use serde::Serialize;

/// Totals for one exercise
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ExerciseSummary {
    pub exercise_id: String,
    pub name: String,
    pub completed: bool,
    pub sets: usize,
    pub reps: u32,
    pub volume: f64,
    pub top_weight: Option<f64>,
}

/// Totals for a whole session
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct SessionSummary {
    pub session_id: uuid::Uuid,
    pub routine_name: Option<String>,
    pub duration_seconds: Option<i64>,
    pub exercises_completed: usize,
    pub exercises_total: usize,
    pub total_sets: usize,
    pub total_reps: u32,
    pub total_volume: f64,
    pub exercises: Vec<ExerciseSummary>,
}

pub fn summarize(session: &Session) -> SessionSummary {
    let exercises: Vec<ExerciseSummary> = session
        .exercises
        .iter()
        .map(|exercise| {
            let sets = dedup_sets(&exercise.exercise_id, &exercise.sets);
            ExerciseSummary {
                exercise_id: exercise.exercise_id.clone(),
                name: exercise.name.clone(),
                completed: is_completed(exercise),
                sets: sets.len(),
                reps: sets.iter().map(|s| s.reps).sum(),
                volume: sets.iter().map(|s| s.volume()).sum(),
                top_weight: sets.iter().filter_map(|s| s.weight).reduce(f64::max),
            }
        })
        .collect();

    SessionSummary {
        session_id: session.id,
        routine_name: session.routine_name.clone(),
        duration_seconds: session
            .ended_at
            .map(|end| (end - session.started_at).num_seconds()),
        exercises_completed: exercises.iter().filter(|e| e.completed).count(),
        exercises_total: exercises.len(),
        total_sets: exercises.iter().map(|e| e.sets).sum(),
        total_reps: exercises.iter().map(|e| e.reps).sum(),
        total_volume: exercises.iter().map(|e| e.volume).sum(),
        exercises,
    }
}
