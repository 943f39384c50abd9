//! Sequencer error types.
//!
//! Recoverable conditions are returned as [`SequencerError`]. Broken
//! single-flight invariants are [`SequencerFault`]s and abort the thread
//! that detects them.

use thiserror::Error;

/// Recoverable sequencer errors.
#[derive(Debug, Error)]
pub enum SequencerError {
    #[error("Step '{name}' not found")]
    StepNotFound { name: String },

    #[error("Failed to spawn sequencer worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}

/// Invariant violations. These indicate a logic error in the controlling
/// code and are raised as panics, never returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SequencerFault {
    #[error("Conflicting jump request: cannot queue jump to '{requested}' while {pending:?} is pending")]
    ConflictingJumpRequest {
        requested: String,
        pending: Vec<String>,
    },

    #[error("Reentrant dispatch: a step was dispatched while another was still in flight")]
    ReentrantDispatch,
}

impl SequencerFault {
    /// Abort the current thread with this fault.
    pub(crate) fn raise(self) -> ! {
        tracing::error!(fault = %self, "sequencer invariant violated");
        panic!("{self}")
    }
}

/// Errors that can occur when building a sequencer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("No steps defined. Add at least one step")]
    NoSteps,

    #[error("Step name '{0}' is used more than once")]
    DuplicateStep(String),

    #[error("Poll interval must be greater than zero")]
    ZeroPollInterval,

    #[error("Invalid sequencer: {}", format_all(.0))]
    Invalid(Vec<BuildError>),
}

fn format_all(errors: &[BuildError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
