//! Single-slot undo buffer for deleted sets.
//!
//! Holds the most recently deleted set for a fixed window. A new delete
//! replaces the held set and restarts the window; expiry is checked against
//! the caller's clock rather than a background timer.

use crate::LoggedSet;
use chrono::{DateTime, Duration, Utc};

/// The most recently deleted set and its owning exercise
#[derive(Clone, Debug, PartialEq)]
pub struct PendingDeletedSet {
    pub exercise_id: String,
    pub set: LoggedSet,
    pub deleted_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct UndoBuffer {
    window: Duration,
    pending: Option<PendingDeletedSet>,
}

impl UndoBuffer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Hold a deleted set, replacing whatever was held before
    pub fn push(&mut self, exercise_id: String, set: LoggedSet, now: DateTime<Utc>) {
        if let Some(previous) = &self.pending {
            tracing::debug!(
                "Undo buffer replaced set {} of {}",
                previous.set.set_index,
                previous.exercise_id
            );
        }
        self.pending = Some(PendingDeletedSet {
            exercise_id,
            set,
            deleted_at: now,
            expires_at: now + self.window,
        });
    }

    /// The held set, if its window has not elapsed
    pub fn peek(&self, now: DateTime<Utc>) -> Option<&PendingDeletedSet> {
        self.pending.as_ref().filter(|p| now < p.expires_at)
    }

    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.peek(now).is_some()
    }

    /// Time left before the held set is discarded
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.peek(now).map(|p| p.expires_at - now)
    }

    /// Discard the held set once its window has elapsed
    pub fn expire(&mut self, now: DateTime<Utc>) -> bool {
        let expired = matches!(&self.pending, Some(p) if now >= p.expires_at);
        if expired {
            self.pending = None;
        }
        expired
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }
}
