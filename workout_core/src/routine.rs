//! Routine snapshots that sessions are started from.
//!
//! A routine file lists exercises in the order they should be worked, each
//! with its prescription and an optional superset tag:
//!
//! ```toml
//! id = "push-a"
//! name = "Push A"
//!
//! [[exercises]]
//! id = "bench"
//! name = "Bench Press"
//! equipment = "barbell"
//! sets = 3
//! reps = 8
//! weight = 60.0
//! superset = "a"
//! ```

use crate::{
    ExerciseStatus, Prescription, RepTarget, Result, Session, SessionExercise,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

/// One exercise entry of a routine
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoutineExercise {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub equipment: Option<String>,
    #[serde(default)]
    pub sets: Option<u32>,
    #[serde(default)]
    pub reps: Option<RepTarget>,
    #[serde(default)]
    pub rest_seconds: Option<u32>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default, alias = "band")]
    pub band_label: Option<String>,
    #[serde(default)]
    pub superset: Option<String>,
}

/// A routine definition
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Routine {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub exercises: Vec<RoutineExercise>,
}

impl Routine {
    /// Load a routine from a TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let routine: Routine = toml::from_str(&contents)?;
        tracing::info!(
            "Loaded routine {:?} with {} exercises from {:?}",
            routine.name,
            routine.exercises.len(),
            path
        );
        Ok(routine)
    }

    /// Structural problems that would make a session from this routine unusable
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.exercises.is_empty() {
            errors.push(format!("Routine {:?} has no exercises", self.name));
        }

        let mut seen = HashSet::new();
        for exercise in &self.exercises {
            if !seen.insert(exercise.id.as_str()) {
                errors.push(format!("Exercise {} appears more than once", exercise.id));
            }
            if let Some(RepTarget::Range { min, max }) = exercise.reps {
                if min > max {
                    errors.push(format!(
                        "Exercise {} has rep range {}-{} with min above max",
                        exercise.id, min, max
                    ));
                }
            }
        }

        errors
    }

    /// Snapshot this routine into a fresh session
    pub fn to_session(&self, now: DateTime<Utc>) -> Session {
        let exercises = self
            .exercises
            .iter()
            .zip(1u32..)
            .map(|(exercise, position)| SessionExercise {
                exercise_id: exercise.id.clone(),
                name: exercise.name.clone(),
                equipment: exercise.equipment.clone(),
                target: Prescription {
                    sets: exercise.sets,
                    reps: exercise.reps.clone(),
                    rest_seconds: exercise.rest_seconds,
                    weight: exercise.weight,
                    band_label: exercise.band_label.clone(),
                },
                superset_group: exercise.superset.clone(),
                position,
                status: ExerciseStatus::Pending,
                started_at: None,
                completed_at: None,
                sets: Vec::new(),
            })
            .collect();

        Session {
            id: Uuid::new_v4(),
            routine_id: self.id.clone(),
            routine_name: Some(self.name.clone()),
            started_at: now,
            ended_at: None,
            notes: None,
            exercises,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ts;

    const ROUTINE: &str = r#"
id = "push-a"
name = "Push A"

[[exercises]]
id = "bench"
name = "Bench Press"
equipment = "barbell"
sets = 3
reps = 8
weight = 60.0
superset = "a"

[[exercises]]
id = "row"
name = "Cable Row"
sets = 3
reps = { min = 8, max = 12 }
weight = 40.0
superset = "a"

[[exercises]]
id = "pullup"
name = "Pull-up"
equipment = "band"
band = "green"
sets = 2
"#;

    #[test]
    fn test_parse_routine() {
        let routine: Routine = toml::from_str(ROUTINE).unwrap();
        assert_eq!(routine.exercises.len(), 3);
        assert_eq!(routine.exercises[0].reps, Some(RepTarget::Count(8)));
        assert_eq!(
            routine.exercises[1].reps,
            Some(RepTarget::Range { min: 8, max: 12 })
        );
        assert_eq!(routine.exercises[2].band_label.as_deref(), Some("green"));
        assert!(routine.validate().is_empty());
    }

    #[test]
    fn test_session_snapshot_positions() {
        let routine: Routine = toml::from_str(ROUTINE).unwrap();
        let session = routine.to_session(ts(0));

        assert_eq!(session.routine_id.as_deref(), Some("push-a"));
        assert_eq!(session.started_at, ts(0));
        let positions: Vec<_> = session.exercises.iter().map(|e| e.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
        assert!(session
            .exercises
            .iter()
            .all(|e| e.status == ExerciseStatus::Pending && e.sets.is_empty()));
        assert_eq!(session.exercises[1].superset_group.as_deref(), Some("a"));
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let routine = Routine {
            id: None,
            name: "Broken".into(),
            exercises: vec![
                RoutineExercise {
                    id: "a".into(),
                    name: "A".into(),
                    equipment: None,
                    sets: Some(3),
                    reps: Some(RepTarget::Range { min: 12, max: 8 }),
                    rest_seconds: None,
                    weight: Some(10.0),
                    band_label: None,
                    superset: None,
                },
                RoutineExercise {
                    id: "a".into(),
                    name: "A again".into(),
                    equipment: None,
                    sets: Some(3),
                    reps: None,
                    rest_seconds: None,
                    weight: Some(10.0),
                    band_label: None,
                    superset: None,
                },
            ],
        };

        let errors = routine.validate();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("push.toml");
        std::fs::write(&path, ROUTINE).unwrap();

        let routine = Routine::load_from(&path).unwrap();
        assert_eq!(routine.name, "Push A");
    }
}
