//! Capabilities supplied by callers.
//!
//! This module holds the traits the sequencer and the state machine drive:
//! - `Step` units of work, ordered by a sequencer
//! - `State` hooks entered and exited by a machine
//! - `TransitionGuard` predicates consulted before each transition
//! - Immutable history of committed transitions
//!
//! Closure-backed implementations (`FnStep`, `FnState`, `FnGuard`) cover
//! the common cases without a dedicated type.

mod guard;
mod history;
mod state;
mod step;

pub use guard::{FnGuard, PermitAll, TransitionGuard};
pub use history::{TransitionHistory, TransitionRecord};
pub use state::{CallbackError, FnState, State, StateMap};
pub use step::{FnStep, Step, StepError, Tag};
