//! Superset pairing derived from session exercise tags.
//!
//! Two exercises sharing a `superset_group` tag form a partnership, but only
//! when exactly two exercises carry that tag. Any other group size is treated
//! as no pairing for all of its members.

use crate::SessionExercise;
use std::collections::{BTreeMap, HashMap};

/// Partner lookup keyed by exercise identity
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SupersetPairs {
    partners: HashMap<String, String>,
    malformed: Vec<MalformedGroup>,
}

/// A superset tag carried by a number of exercises other than two
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MalformedGroup {
    pub group: String,
    pub members: Vec<String>,
}

impl SupersetPairs {
    /// Partner identity of the given exercise, if it is validly paired
    pub fn partner_of(&self, exercise_id: &str) -> Option<&str> {
        self.partners.get(exercise_id).map(String::as_str)
    }

    /// Number of valid partnerships
    pub fn pair_count(&self) -> usize {
        self.partners.len() / 2
    }

    /// Groups that were ignored because they did not have exactly two members
    pub fn malformed_groups(&self) -> &[MalformedGroup] {
        &self.malformed
    }
}

/// Build the partner lookup for an exercise list
pub fn resolve_partners(exercises: &[SessionExercise]) -> SupersetPairs {
    let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for exercise in exercises {
        if let Some(group) = exercise.superset_group.as_deref() {
            groups
                .entry(group)
                .or_default()
                .push(exercise.exercise_id.as_str());
        }
    }

    let mut pairs = SupersetPairs::default();
    for (group, members) in groups {
        if let [a, b] = members.as_slice() {
            pairs.partners.insert((*a).to_string(), (*b).to_string());
            pairs.partners.insert((*b).to_string(), (*a).to_string());
        } else {
            tracing::debug!(
                "Ignoring superset group {:?} with {} members",
                group,
                members.len()
            );
            pairs.malformed.push(MalformedGroup {
                group: group.to_string(),
                members: members.iter().map(|m| m.to_string()).collect(),
            });
        }
    }

    pairs
}

/// Convenience lookup of a partner exercise within the same list
pub fn partner<'a>(
    exercise_id: &str,
    exercises: &'a [SessionExercise],
) -> Option<&'a SessionExercise> {
    let pairs = resolve_partners(exercises);
    let partner_id = pairs.partner_of(exercise_id)?;
    exercises.iter().find(|e| e.exercise_id == partner_id)
}
