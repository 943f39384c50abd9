//! State capability and the name-keyed state map.
//!
//! A state is a named capability with fallible `enter` and `exit` hooks.
//! States carry no machine bookkeeping of their own; the machine decides
//! when each hook runs.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Error returned by user-supplied callbacks (state hooks, guards, steps).
pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Trait for state machine states.
///
/// # Example
///
/// ```rust
/// use stepwise::core::{CallbackError, State};
///
/// struct Menu;
///
/// impl State for Menu {
///     fn name(&self) -> &str {
///         "menu"
///     }
///
///     fn enter(&self) -> Result<(), CallbackError> {
///         Ok(())
///     }
///
///     fn exit(&self) -> Result<(), CallbackError> {
///         Ok(())
///     }
/// }
///
/// assert_eq!(Menu.name(), "menu");
/// ```
pub trait State: Send + Sync {
    /// Unique name of the state within its map.
    fn name(&self) -> &str;

    /// Called when the machine adopts this state.
    fn enter(&self) -> Result<(), CallbackError>;

    /// Called when the machine leaves this state.
    fn exit(&self) -> Result<(), CallbackError>;
}

impl fmt::Debug for dyn State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("State").field(&self.name()).finish()
    }
}

type Hook = Box<dyn Fn() -> Result<(), CallbackError> + Send + Sync>;

/// State built from closures.
///
/// Hooks that are not set succeed without doing anything.
///
/// ```rust
/// use stepwise::core::{FnState, State};
///
/// let paused = FnState::new("pause").on_enter(|| Ok(()));
/// assert_eq!(paused.name(), "pause");
/// assert!(paused.exit().is_ok());
/// ```
pub struct FnState {
    name: String,
    on_enter: Option<Hook>,
    on_exit: Option<Hook>,
}

impl FnState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            on_enter: None,
            on_exit: None,
        }
    }

    /// Set the entry hook.
    pub fn on_enter<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        self.on_enter = Some(Box::new(hook));
        self
    }

    /// Set the exit hook.
    pub fn on_exit<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        self.on_exit = Some(Box::new(hook));
        self
    }
}

impl State for FnState {
    fn name(&self) -> &str {
        &self.name
    }

    fn enter(&self) -> Result<(), CallbackError> {
        self.on_enter.as_ref().map_or(Ok(()), |hook| hook())
    }

    fn exit(&self) -> Result<(), CallbackError> {
        self.on_exit.as_ref().map_or(Ok(()), |hook| hook())
    }
}

/// All states a machine may occupy, keyed by name.
///
/// Inserting a state whose name is already present replaces the earlier one.
#[derive(Clone, Default)]
pub struct StateMap {
    states: HashMap<String, Arc<dyn State>>,
}

impl StateMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a state, keyed by its own name.
    pub fn insert<S: State + 'static>(&mut self, state: S) -> Option<Arc<dyn State>> {
        self.insert_shared(Arc::new(state))
    }

    /// Add a state that is also held elsewhere.
    pub fn insert_shared(&mut self, state: Arc<dyn State>) -> Option<Arc<dyn State>> {
        self.states.insert(state.name().to_string(), state)
    }

    /// Builder-style variant of [`StateMap::insert`].
    pub fn with<S: State + 'static>(mut self, state: S) -> Self {
        self.insert(state);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn State>> {
        self.states.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// State names in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }
}

impl FromIterator<Arc<dyn State>> for StateMap {
    fn from_iter<I: IntoIterator<Item = Arc<dyn State>>>(iter: I) -> Self {
        let mut map = Self::new();
        for state in iter {
            map.insert_shared(state);
        }
        map
    }
}

impl fmt::Debug for StateMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("StateMap").field("states", &names).finish()
    }
}
