//! Transition guards.
//!
//! A guard is the external authority a state machine consults before every
//! transition. It also owns the one-time initialization that runs before
//! the first state is entered.

use super::state::{CallbackError, State};

/// Decides whether a state machine may move between two states.
///
/// # Example
///
/// ```rust
/// use stepwise::core::{CallbackError, State, TransitionGuard};
///
/// /// Never allows leaving a state named "locked".
/// struct Lockout;
///
/// impl TransitionGuard for Lockout {
///     fn init(&self) -> Result<(), CallbackError> {
///         Ok(())
///     }
///
///     fn may_transition(
///         &self,
///         current: &dyn State,
///         _candidate: &dyn State,
///     ) -> Result<bool, CallbackError> {
///         Ok(current.name() != "locked")
///     }
/// }
/// ```
pub trait TransitionGuard: Send + Sync {
    /// One-time setup, run by `start` before the first state is entered.
    fn init(&self) -> Result<(), CallbackError>;

    /// Whether the machine may leave `current` for `candidate`.
    ///
    /// `Ok(false)` rejects the transition; `Err` reports that the decision
    /// itself could not be made.
    fn may_transition(
        &self,
        current: &dyn State,
        candidate: &dyn State,
    ) -> Result<bool, CallbackError>;
}

/// Guard that permits every transition and has nothing to initialize.
#[derive(Clone, Copy, Debug, Default)]
pub struct PermitAll;

impl TransitionGuard for PermitAll {
    fn init(&self) -> Result<(), CallbackError> {
        Ok(())
    }

    fn may_transition(&self, _: &dyn State, _: &dyn State) -> Result<bool, CallbackError> {
        Ok(true)
    }
}

type Predicate = Box<dyn Fn(&dyn State, &dyn State) -> Result<bool, CallbackError> + Send + Sync>;
type Init = Box<dyn Fn() -> Result<(), CallbackError> + Send + Sync>;

/// Guard built from a predicate closure.
///
/// ```rust
/// use stepwise::core::{FnGuard, FnState, TransitionGuard};
///
/// let guard = FnGuard::new(|from, to| Ok(from.name() != to.name()));
///
/// let menu = FnState::new("menu");
/// let play = FnState::new("play");
/// assert!(guard.may_transition(&menu, &play).unwrap());
/// assert!(!guard.may_transition(&menu, &menu).unwrap());
/// ```
pub struct FnGuard {
    predicate: Predicate,
    init: Option<Init>,
}

impl FnGuard {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&dyn State, &dyn State) -> Result<bool, CallbackError> + Send + Sync + 'static,
    {
        Self {
            predicate: Box::new(predicate),
            init: None,
        }
    }

    /// Set the one-time initialization hook.
    pub fn on_init<F>(mut self, init: F) -> Self
    where
        F: Fn() -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        self.init = Some(Box::new(init));
        self
    }
}

impl TransitionGuard for FnGuard {
    fn init(&self) -> Result<(), CallbackError> {
        self.init.as_ref().map_or(Ok(()), |init| init())
    }

    fn may_transition(
        &self,
        current: &dyn State,
        candidate: &dyn State,
    ) -> Result<bool, CallbackError> {
        (self.predicate)(current, candidate)
    }
}
