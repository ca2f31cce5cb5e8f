//! Core domain types for guided workout sessions.
//!
//! This module defines the fundamental types used throughout the engine:
//! - Sessions and the exercises they own
//! - Target prescriptions (sets, reps, rest, load)
//! - Persisted sets and the partial progress records the gateway returns

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Prescription Types
// ============================================================================

/// Target repetitions for one set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RepTarget {
    /// Fixed rep count (e.g. 8)
    Count(u32),
    /// Rep range (e.g. 8-12)
    Range { min: u32, max: u32 },
}

impl RepTarget {
    /// Rep count used when a set is logged without an explicit value
    pub fn default_reps(&self) -> u32 {
        match self {
            RepTarget::Count(n) => *n,
            RepTarget::Range { min, .. } => *min,
        }
    }
}

impl std::fmt::Display for RepTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepTarget::Count(n) => write!(f, "{}", n),
            RepTarget::Range { min, max } => write!(f, "{}-{}", min, max),
        }
    }
}

/// Target prescription for an exercise within a session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct Prescription {
    #[serde(default)]
    pub sets: Option<u32>,
    #[serde(default)]
    pub reps: Option<RepTarget>,
    #[serde(default)]
    pub rest_seconds: Option<u32>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub band_label: Option<String>,
}

impl Prescription {
    /// Target set count, only when it is a positive integer
    pub fn target_sets(&self) -> Option<u32> {
        self.sets.filter(|n| *n > 0)
    }
}

// ============================================================================
// Session Types
// ============================================================================

/// Lifecycle status of one exercise within a session
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

/// A persisted set
///
/// `id` stays `None` until the gateway acknowledges creation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LoggedSet {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub set_index: u32,
    pub reps: u32,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub band_label: Option<String>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl LoggedSet {
    /// Training volume of this set (reps x weight), zero when unweighted
    pub fn volume(&self) -> f64 {
        self.weight.map(|w| w * f64::from(self.reps)).unwrap_or(0.0)
    }
}

/// One exercise's occurrence and progress within a session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionExercise {
    pub exercise_id: String,
    pub name: String,
    #[serde(default)]
    pub equipment: Option<String>,
    #[serde(default)]
    pub target: Prescription,
    #[serde(default)]
    pub superset_group: Option<String>,
    pub position: u32,
    #[serde(default)]
    pub status: ExerciseStatus,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sets: Vec<LoggedSet>,
}

/// One guided workout instance tied to a routine
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: Uuid,
    #[serde(default)]
    pub routine_id: Option<String>,
    #[serde(default)]
    pub routine_name: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
    pub exercises: Vec<SessionExercise>,
}

impl Session {
    /// Look up an exercise by identity
    pub fn exercise(&self, exercise_id: &str) -> Option<&SessionExercise> {
        self.exercises.iter().find(|e| e.exercise_id == exercise_id)
    }

    /// Mutable lookup of an exercise by identity
    pub fn exercise_mut(&mut self, exercise_id: &str) -> Option<&mut SessionExercise> {
        self.exercises
            .iter_mut()
            .find(|e| e.exercise_id == exercise_id)
    }
}

impl SessionExercise {
    /// Slot a new set lands in: `requested` if no persisted set holds it,
    /// otherwise the lowest unused index
    pub fn free_set_index(&self, requested: Option<u32>) -> u32 {
        let taken = |index: u32| self.sets.iter().any(|s| s.set_index == index);
        match requested {
            Some(index) if index > 0 && !taken(index) => index,
            _ => (1..).find(|&index| !taken(index)).unwrap_or(1),
        }
    }
}

// ============================================================================
// Gateway Request/Response Types
// ============================================================================

/// Partial exercise progress record returned by start/complete/add-set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseProgress {
    pub exercise_id: String,
    pub status: ExerciseStatus,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
}

/// Request body for creating a set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NewSet {
    pub exercise_id: String,
    /// Requested slot; the gateway falls back to the lowest free index
    #[serde(default)]
    pub set_index: Option<u32>,
    pub reps: u32,
    pub weight: Option<f64>,
    pub band_label: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Response to a set creation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AddSetResponse {
    pub set: LoggedSet,
    pub exercise_progress: ExerciseProgress,
}

/// Request body for editing a persisted set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SetUpdate {
    pub reps: u32,
    pub weight: Option<f64>,
    pub band_label: Option<String>,
}
