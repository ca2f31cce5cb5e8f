//! Error types for the workout_core library.

use std::fmt;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for workout_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Readiness check failed for one or more exercises
    #[error("Session is not ready: missing {0}")]
    Validation(MissingTargets),

    /// A persistence call failed; the message is the gateway's, verbatim
    #[error("{operation} failed: {message}")]
    Mutation {
        operation: &'static str,
        message: String,
    },

    /// Action not allowed in the current session phase
    #[error("State error: {0}")]
    State(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// A required prescription field an exercise lacks
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MissingTarget {
    pub exercise: String,
    pub field: &'static str,
}

impl fmt::Display for MissingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.exercise, self.field)
    }
}

/// Every missing target found by one readiness pass
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct MissingTargets(pub Vec<MissingTarget>);

impl MissingTargets {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for MissingTargets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, missing) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", missing)?;
        }
        Ok(())
    }
}
