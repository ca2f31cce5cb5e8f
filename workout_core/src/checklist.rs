//! Set checklist reconciliation.
//!
//! Merges the local, never-persisted set taps with the persisted sets of an
//! exercise into display-ready rows. Persisted sets that repeat an identity
//! (a retried write landing twice) are dropped, keeping the first occurrence.

use crate::{LoggedSet, SessionExercise};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

/// Local tap timestamps of one exercise, keyed by set index
pub type ExerciseTaps = BTreeMap<u32, DateTime<Utc>>;

/// Display state of a checklist row
#[derive(Clone, Debug, PartialEq)]
pub enum RowState {
    /// Backed by a persisted set
    Logged(LoggedSet),
    /// Tapped locally, not yet confirmed by the gateway
    CheckedUnsaved { tapped_at: DateTime<Utc> },
    Unchecked,
}

impl RowState {
    fn rank(&self) -> u8 {
        match self {
            RowState::Logged(_) => 0,
            RowState::CheckedUnsaved { .. } => 1,
            RowState::Unchecked => 2,
        }
    }
}

/// One set slot of an exercise
#[derive(Clone, Debug, PartialEq)]
pub struct ChecklistRow {
    pub set_index: u32,
    pub state: RowState,
}

impl ChecklistRow {
    pub fn is_logged(&self) -> bool {
        matches!(self.state, RowState::Logged(_))
    }

    pub fn is_checked_unsaved(&self) -> bool {
        matches!(self.state, RowState::CheckedUnsaved { .. })
    }
}

/// Process-local tap state for every exercise of the active session
#[derive(Clone, Debug, Default)]
pub struct ChecklistTaps {
    taps: HashMap<String, ExerciseTaps>,
}

impl ChecklistTaps {
    /// Record a tap; returns false when the slot was already tapped
    pub fn tap(&mut self, exercise_id: &str, set_index: u32, now: DateTime<Utc>) -> bool {
        let entries = self.taps.entry(exercise_id.to_string()).or_default();
        if entries.contains_key(&set_index) {
            return false;
        }
        entries.insert(set_index, now);
        true
    }

    /// Remove a tap; returns false when nothing was tapped there
    pub fn untap(&mut self, exercise_id: &str, set_index: u32) -> bool {
        let Some(entries) = self.taps.get_mut(exercise_id) else {
            return false;
        };
        let removed = entries.remove(&set_index).is_some();
        if entries.is_empty() {
            self.taps.remove(exercise_id);
        }
        removed
    }

    pub fn for_exercise(&self, exercise_id: &str) -> Option<&ExerciseTaps> {
        self.taps.get(exercise_id)
    }

    pub fn clear_exercise(&mut self, exercise_id: &str) {
        self.taps.remove(exercise_id);
    }

    pub fn clear(&mut self) {
        self.taps.clear();
    }

    /// Drop taps superseded by a persisted set at the same index
    pub fn prune_logged(&mut self, exercise: &SessionExercise) {
        let Some(entries) = self.taps.get_mut(&exercise.exercise_id) else {
            return;
        };
        entries.retain(|index, _| !exercise.sets.iter().any(|s| s.set_index == *index));
        if entries.is_empty() {
            self.taps.remove(&exercise.exercise_id);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
enum SetKey<'a> {
    Id(Uuid),
    Composite {
        exercise_id: &'a str,
        set_index: u32,
        stamp: Option<DateTime<Utc>>,
    },
}

fn set_key<'a>(exercise_id: &'a str, set: &LoggedSet) -> SetKey<'a> {
    match set.id {
        Some(id) => SetKey::Id(id),
        None => SetKey::Composite {
            exercise_id,
            set_index: set.set_index,
            stamp: set.created_at.or(set.completed_at),
        },
    }
}

/// Persisted sets with repeated identities removed, first occurrence kept
pub fn dedup_sets<'a>(exercise_id: &str, sets: &'a [LoggedSet]) -> Vec<&'a LoggedSet> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(sets.len());
    for set in sets {
        if seen.insert(set_key(exercise_id, set)) {
            unique.push(set);
        } else {
            tracing::debug!(
                "Dropping duplicate persisted set {} for {}",
                set.set_index,
                exercise_id
            );
        }
    }
    unique
}

/// Build the ordered checklist rows for an exercise
///
/// With an integer target set count the rows are exactly `1..=target`;
/// otherwise there is one row per persisted set.
pub fn build_rows(exercise: &SessionExercise, taps: Option<&ExerciseTaps>) -> Vec<ChecklistRow> {
    let persisted = dedup_sets(&exercise.exercise_id, &exercise.sets);
    let mut rows: Vec<ChecklistRow> = persisted
        .into_iter()
        .map(|set| ChecklistRow {
            set_index: set.set_index,
            state: RowState::Logged(set.clone()),
        })
        .collect();

    match exercise.target.target_sets() {
        Some(target) => {
            rows.retain(|row| (1..=target).contains(&row.set_index));
            for set_index in 1..=target {
                let state = match taps.and_then(|t| t.get(&set_index)) {
                    Some(tapped_at) => RowState::CheckedUnsaved {
                        tapped_at: *tapped_at,
                    },
                    None => RowState::Unchecked,
                };
                rows.push(ChecklistRow { set_index, state });
            }
            rows.sort_by_key(|row| (row.set_index, row.state.rank()));
            rows.dedup_by_key(|row| row.set_index);
        }
        None => {
            rows.sort_by_key(|row| row.set_index);
        }
    }

    rows
}
