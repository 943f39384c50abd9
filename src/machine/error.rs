//! State machine error types.

use crate::core::CallbackError;
use thiserror::Error;

/// Errors returned by [`StateMachine`](super::StateMachine) operations.
///
/// Every error leaves the machine on a fully entered state (or not started
/// at all), never between two states.
#[derive(Debug, Error)]
pub enum MachineError {
    #[error("State machine already started")]
    AlreadyStarted,

    #[error("State machine not running")]
    NotRunning,

    #[error("State machine is faulted on state '{state}' and accepts no transitions")]
    Faulted { state: String },

    #[error("State '{name}' not found")]
    StateNotFound { name: String },

    #[error("Guard initialization failed: {source}")]
    InitFailed {
        #[source]
        source: CallbackError,
    },

    #[error("Entering state '{state}' failed: {source}")]
    EnterFailed {
        state: String,
        #[source]
        source: CallbackError,
    },

    #[error("Exiting state '{state}' failed: {source}")]
    ExitFailed {
        state: String,
        #[source]
        source: CallbackError,
    },

    #[error("Guard failed checking transition from '{from}' to '{to}': {source}")]
    GuardError {
        from: String,
        to: String,
        #[source]
        source: CallbackError,
    },

    #[error("Transition from '{from}' to '{to}' rejected by guard")]
    TransitionRejected { from: String, to: String },

    #[error("Entering '{to}' failed ({enter}) and re-entering '{from}' also failed: {source}")]
    RollbackFailed {
        from: String,
        to: String,
        enter: CallbackError,
        #[source]
        source: CallbackError,
    },
}

impl MachineError {
    /// Whether the error left the machine unable to accept transitions.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::RollbackFailed { .. } | Self::Faulted { .. })
    }
}
