//! Guarded state machine.

use crate::core::{
    CallbackError, State, StateMap, TransitionGuard, TransitionHistory, TransitionRecord,
};
use crate::machine::error::MachineError;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, error, info, warn};

/// Lifecycle of a state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum MachineStatus {
    /// Not started, or a start attempt failed.
    Idle,
    /// `start` is running the guard's initialization or the first entry.
    Initializing,
    /// A state is current and transitions are accepted.
    Running,
    /// A failed entry could not be rolled back. No further transitions.
    Faulted,
}

struct Committed {
    status: MachineStatus,
    current: Option<Arc<dyn State>>,
    history: TransitionHistory,
}

/// State machine whose transitions are approved by a [`TransitionGuard`].
///
/// `start` and `change_state` are serialized by one exclusive region that
/// also covers the guard and the state hooks. Readers share a second lock,
/// which a transition holds exclusively from the exit hook until the commit
/// or rollback, so a reader never sees a state that was exited without its
/// replacement being entered. State hooks must therefore not call the
/// machine's accessors.
///
/// # Example
///
/// ```rust
/// use stepwise::core::{FnState, PermitAll, StateMap};
/// use stepwise::machine::StateMachine;
///
/// let states = StateMap::new()
///     .with(FnState::new("menu"))
///     .with(FnState::new("play"));
/// let machine = StateMachine::new(PermitAll, states);
///
/// machine.start("menu").unwrap();
/// machine.change_state("play").unwrap();
/// assert_eq!(machine.current_state_name().as_deref(), Some("play"));
/// ```
pub struct StateMachine<G: TransitionGuard> {
    guard: G,
    states: StateMap,
    region: Mutex<()>,
    committed: RwLock<Committed>,
    history_limit: Option<usize>,
}

impl<G: TransitionGuard> StateMachine<G> {
    pub fn new(guard: G, states: StateMap) -> Self {
        Self {
            guard,
            states,
            region: Mutex::new(()),
            committed: RwLock::new(Committed {
                status: MachineStatus::Idle,
                current: None,
                history: TransitionHistory::new(),
            }),
            history_limit: None,
        }
    }

    /// Keep only the most recent `limit` transitions in the history.
    ///
    /// By default every committed transition is kept.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    /// Initialize the guard and enter `first`.
    ///
    /// On failure the machine stays idle and `start` may be retried.
    pub fn start(&self, first: &str) -> Result<(), MachineError> {
        let _region = self.exclusive();

        if self.read().status != MachineStatus::Idle {
            return Err(MachineError::AlreadyStarted);
        }
        let state = self.lookup(first)?;

        self.write().status = MachineStatus::Initializing;

        if let Err(source) = self.guard.init() {
            self.write().status = MachineStatus::Idle;
            warn!(error = %source, "guard initialization failed");
            return Err(MachineError::InitFailed { source });
        }

        if let Err(source) = state.enter() {
            self.write().status = MachineStatus::Idle;
            warn!(state = first, error = %source, "entering first state failed");
            return Err(MachineError::EnterFailed {
                state: first.to_string(),
                source,
            });
        }

        {
            let mut committed = self.write();
            committed.current = Some(state);
            committed.status = MachineStatus::Running;
        }
        info!(state = first, "state machine started");
        Ok(())
    }

    /// Move to `target` if the guard permits it.
    ///
    /// The current state is exited, then `target` is entered. If the exit
    /// fails nothing changes. If the entry fails the old state is entered
    /// again and stays current; if that also fails the machine is
    /// [`MachineStatus::Faulted`].
    pub fn change_state(&self, target: &str) -> Result<(), MachineError> {
        let _region = self.exclusive();

        let current = {
            let committed = self.read();
            match (committed.status, &committed.current) {
                (MachineStatus::Running, Some(current)) => Arc::clone(current),
                (MachineStatus::Faulted, Some(current)) => {
                    return Err(MachineError::Faulted {
                        state: current.name().to_string(),
                    })
                }
                _ => return Err(MachineError::NotRunning),
            }
        };
        let next = self.lookup(target)?;
        let from = current.name();

        match self.guard.may_transition(current.as_ref(), next.as_ref()) {
            Ok(true) => {}
            Ok(false) => {
                debug!(from, to = target, "transition rejected");
                return Err(MachineError::TransitionRejected {
                    from: from.to_string(),
                    to: target.to_string(),
                });
            }
            Err(source) => {
                return Err(MachineError::GuardError {
                    from: from.to_string(),
                    to: target.to_string(),
                    source,
                })
            }
        }

        let mut committed = self.write();
        current.exit().map_err(|source| MachineError::ExitFailed {
            state: from.to_string(),
            source,
        })?;

        let previous = current;
        if let Err(enter) = next.enter() {
            return Err(Self::roll_back(&mut committed, &previous, target, enter));
        }

        committed.history.push(
            TransitionRecord::now(previous.name(), target),
            self.history_limit,
        );
        committed.current = Some(next);
        debug!(from = previous.name(), to = target, "transition committed");
        Ok(())
    }

    /// Re-enter `previous` after entering `target` failed.
    fn roll_back(
        committed: &mut Committed,
        previous: &Arc<dyn State>,
        target: &str,
        enter: CallbackError,
    ) -> MachineError {
        let from = previous.name();
        warn!(from, to = target, error = %enter, "entry failed, re-entering previous state");

        match previous.enter() {
            Ok(()) => MachineError::EnterFailed {
                state: target.to_string(),
                source: enter,
            },
            Err(source) => {
                committed.status = MachineStatus::Faulted;
                error!(from, to = target, error = %source, "rollback failed, machine faulted");
                MachineError::RollbackFailed {
                    from: from.to_string(),
                    to: target.to_string(),
                    enter,
                    source,
                }
            }
        }
    }

    /// The fully entered current state.
    pub fn current_state(&self) -> Option<Arc<dyn State>> {
        self.read().current.clone()
    }

    pub fn current_state_name(&self) -> Option<String> {
        self.read()
            .current
            .as_ref()
            .map(|state| state.name().to_string())
    }

    pub fn is_running(&self) -> bool {
        self.status() == MachineStatus::Running
    }

    pub fn status(&self) -> MachineStatus {
        self.read().status
    }

    /// Snapshot of every committed transition.
    pub fn history(&self) -> TransitionHistory {
        self.read().history.clone()
    }

    pub fn states(&self) -> &StateMap {
        &self.states
    }

    pub fn guard(&self) -> &G {
        &self.guard
    }

    fn lookup(&self, name: &str) -> Result<Arc<dyn State>, MachineError> {
        self.states
            .get(name)
            .cloned()
            .ok_or_else(|| MachineError::StateNotFound {
                name: name.to_string(),
            })
    }

    fn exclusive(&self) -> MutexGuard<'_, ()> {
        self.region.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> RwLockReadGuard<'_, Committed> {
        self.committed.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Committed> {
        self.committed
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<G: TransitionGuard> fmt::Debug for StateMachine<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let committed = self.read();
        f.debug_struct("StateMachine")
            .field("states", &self.states)
            .field("status", &committed.status)
            .field("current", &committed.current.as_ref().map(|s| s.name()))
            .field("transitions", &committed.history.len())
            .finish()
    }
}
