#![forbid(unsafe_code)]

//! Core session engine for guided strength workouts.
//!
//! This crate provides:
//! - Domain types (sessions, exercises, prescriptions, sets)
//! - Derived state (superset pairing, checklist, completion, navigation)
//! - The session lifecycle controller
//! - Persistence (active session file, finished log, CSV rollup)

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod routine;
pub mod superset;
pub mod checklist;
pub mod completion;
pub mod navigator;
pub mod gateway;
pub mod loader;
pub mod undo;
pub mod summary;
pub mod lifecycle;
pub mod view;
pub mod store;
pub mod rollup;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use error::{Error, MissingTarget, MissingTargets, Result};
pub use types::*;
pub use config::{Config, EngineConfig};
pub use gateway::SessionGateway;
pub use routine::Routine;
pub use lifecycle::{ActionOutcome, SessionAction, SessionController, SessionPhase};
pub use view::{ExerciseView, WorkoutView};
pub use summary::SessionSummary;
pub use store::FileGateway;
