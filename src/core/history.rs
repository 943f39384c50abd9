//! State transition history tracking.
//!
//! Every transition a machine commits is recorded by state name, so the
//! history can be inspected or serialized without holding the states.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Record of a single committed transition.
///
/// ```rust
/// use stepwise::core::TransitionRecord;
///
/// let record = TransitionRecord::now("menu", "play");
/// assert_eq!(record.from, "menu");
/// assert_eq!(record.to, "play");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Name of the state that was left
    pub from: String,
    /// Name of the state that was entered
    pub to: String,
    /// When the transition was committed
    pub timestamp: DateTime<Utc>,
}

impl TransitionRecord {
    /// Record stamped with the current time.
    pub fn now(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Ordered history of committed transitions.
///
/// `record` returns a new history with the transition appended and leaves
/// the original untouched. `push` appends in place, optionally keeping only
/// the most recent entries.
///
/// ```rust
/// use stepwise::core::{TransitionHistory, TransitionRecord};
///
/// let history = TransitionHistory::new()
///     .record(TransitionRecord::now("menu", "play"))
///     .record(TransitionRecord::now("play", "pause"));
///
/// assert_eq!(history.get_path(), vec!["menu", "play", "pause"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionHistory {
    transitions: VecDeque<TransitionRecord>,
}

impl TransitionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a transition, returning a new history.
    pub fn record(&self, transition: TransitionRecord) -> Self {
        let mut transitions = self.transitions.clone();
        transitions.push_back(transition);
        Self { transitions }
    }

    /// Append a transition in place, then drop the oldest records beyond
    /// `limit`, if one is given.
    pub fn push(&mut self, transition: TransitionRecord, limit: Option<usize>) {
        self.transitions.push_back(transition);
        if let Some(limit) = limit {
            while self.transitions.len() > limit {
                self.transitions.pop_front();
            }
        }
    }

    /// Names of the states traversed: the first `from`, then every `to`.
    pub fn get_path(&self) -> Vec<&str> {
        let mut path = Vec::with_capacity(self.transitions.len() + 1);
        if let Some(first) = self.transitions.front() {
            path.push(first.from.as_str());
        }
        path.extend(self.transitions.iter().map(|t| t.to.as_str()));
        path
    }

    /// Time between the first and the last recorded transition.
    ///
    /// `None` when nothing has been recorded.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.transitions.front()?, self.transitions.back()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    pub fn last(&self) -> Option<&TransitionRecord> {
        self.transitions.back()
    }

    /// Records from oldest to newest.
    pub fn transitions(&self) -> impl Iterator<Item = &TransitionRecord> {
        self.transitions.iter()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}
