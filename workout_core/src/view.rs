//! Read-only projection of a controller for presentation layers.

use crate::checklist::ChecklistRow;
use crate::completion::{derived_status, logged_set_count, SessionProgress};
use crate::gateway::SessionGateway;
use crate::lifecycle::{SessionController, SessionPhase};
use crate::{ExerciseStatus, Prescription, SessionExercise};
use chrono::{DateTime, Duration, Utc};

/// One exercise as the workout screen shows it
#[derive(Clone, Debug, PartialEq)]
pub struct ExerciseView {
    pub exercise_id: String,
    pub name: String,
    pub equipment: Option<String>,
    pub target: Prescription,
    pub status: ExerciseStatus,
    pub logged_sets: usize,
    pub checklist: Vec<ChecklistRow>,
}

/// Everything needed to render the current state of a session
#[derive(Clone, Debug, PartialEq)]
pub struct WorkoutView {
    pub phase: SessionPhase,
    pub routine_name: Option<String>,
    pub current: Option<ExerciseView>,
    pub partner: Option<ExerciseView>,
    pub progress: SessionProgress,
    /// Time left to undo the last deletion
    pub undo_remaining: Option<Duration>,
}

impl<G: SessionGateway> SessionController<G> {
    fn exercise_view(&self, exercise: &SessionExercise) -> ExerciseView {
        ExerciseView {
            exercise_id: exercise.exercise_id.clone(),
            name: exercise.name.clone(),
            equipment: exercise.equipment.clone(),
            target: exercise.target.clone(),
            status: derived_status(exercise),
            logged_sets: logged_set_count(exercise),
            checklist: self.checklist(&exercise.exercise_id),
        }
    }

    pub fn view(&self, now: DateTime<Utc>) -> WorkoutView {
        WorkoutView {
            phase: self.phase().clone(),
            routine_name: self.session().routine_name.clone(),
            current: self.current_exercise().map(|e| self.exercise_view(e)),
            partner: self.partner_exercise().map(|e| self.exercise_view(e)),
            progress: self.progress(),
            undo_remaining: self.pending_undo(now).map(|p| p.expires_at - now),
        }
    }
}
