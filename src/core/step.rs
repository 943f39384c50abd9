//! Step capability driven by a [`Sequencer`].

use super::state::CallbackError;
use crate::sequencer::Sequencer;
use std::fmt;

/// Opaque auxiliary value handed to every step.
pub type Tag = serde_json::Value;

/// Error returned from [`Step::perform`].
pub type StepError = CallbackError;

/// A named unit of work in an ordered sequence.
///
/// `perform` receives a handle to the sequencer running it, so a step can
/// request its own successor with [`Sequencer::advance`] or redirect the
/// sequence with [`Sequencer::jump`]. Both calls only enqueue and return.
///
/// # Example
///
/// ```rust
/// use stepwise::core::{Step, StepError, Tag};
/// use stepwise::sequencer::Sequencer;
///
/// struct Greet;
///
/// impl Step for Greet {
///     fn name(&self) -> &str {
///         "greet"
///     }
///
///     fn perform(&self, sequencer: &Sequencer, _tags: &[Tag]) -> Result<(), StepError> {
///         sequencer.advance();
///         Ok(())
///     }
/// }
/// ```
pub trait Step: Send + Sync {
    /// Unique name of the step within its sequencer.
    fn name(&self) -> &str;

    /// Do the step's work.
    fn perform(&self, sequencer: &Sequencer, tags: &[Tag]) -> Result<(), StepError>;
}

impl fmt::Debug for dyn Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Step").field(&self.name()).finish()
    }
}

type Perform = Box<dyn Fn(&Sequencer, &[Tag]) -> Result<(), StepError> + Send + Sync>;

/// Step built from a closure.
///
/// ```rust
/// use stepwise::core::{FnStep, Step};
///
/// let step = FnStep::new("load", |_sequencer, _tags| Ok(()));
/// assert_eq!(step.name(), "load");
/// ```
pub struct FnStep {
    name: String,
    perform: Perform,
}

impl FnStep {
    pub fn new<F>(name: impl Into<String>, perform: F) -> Self
    where
        F: Fn(&Sequencer, &[Tag]) -> Result<(), StepError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            perform: Box::new(perform),
        }
    }

    /// Step that does nothing.
    pub fn noop(name: impl Into<String>) -> Self {
        Self::new(name, |_, _| Ok(()))
    }
}

impl Step for FnStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn perform(&self, sequencer: &Sequencer, tags: &[Tag]) -> Result<(), StepError> {
        (self.perform)(sequencer, tags)
    }
}
