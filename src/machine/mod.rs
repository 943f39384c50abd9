//! Guarded finite state machine.
//!
//! A [`StateMachine`] moves between named states only with the approval of
//! a [`TransitionGuard`](crate::core::TransitionGuard). Each transition
//! exits the current state and enters the target; if either half fails the
//! machine stays on a fully entered state.

#[allow(clippy::module_inception)]
mod machine;
mod error;

pub use error::MachineError;
pub use machine::{MachineStatus, StateMachine};
