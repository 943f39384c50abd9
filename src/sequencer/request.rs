//! Requests queued against a sequencer.

use std::fmt;

/// A pending instruction for the sequencer worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    /// Move to the step after the current one, or finish on the last step.
    Advance,
    /// Make the named step current.
    JumpTo(String),
}

impl Request {
    pub fn is_jump(&self) -> bool {
        matches!(self, Self::JumpTo(_))
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Advance => f.write_str("advance"),
            Self::JumpTo(name) => write!(f, "jump:{name}"),
        }
    }
}
