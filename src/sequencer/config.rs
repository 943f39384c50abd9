//! Sequencer runtime configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound on how long the worker sleeps between queue checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Thread name given to the worker.
pub const DEFAULT_WORKER_NAME: &str = "stepwise-sequencer";

/// Tunables for a sequencer's background worker.
///
/// Deserializes from JSON with every field optional:
///
/// ```rust
/// use stepwise::sequencer::SequencerConfig;
/// use std::time::Duration;
///
/// let config: SequencerConfig = serde_json::from_str(r#"{"poll_interval_ms": 5}"#).unwrap();
/// assert_eq!(config.poll_interval(), Duration::from_millis(5));
/// assert_eq!(config.worker_name, "stepwise-sequencer");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Maximum wait between two worker passes, in milliseconds.
    pub poll_interval_ms: u64,
    /// Name of the worker thread.
    pub worker_name: String,
}

impl SequencerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Set the poll interval, rounded up to whole milliseconds so a
    /// non-zero interval never becomes zero.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        let millis = interval.as_micros().div_ceil(1_000);
        self.poll_interval_ms = u64::try_from(millis).unwrap_or(u64::MAX);
        self
    }

    pub fn with_worker_name(mut self, name: impl Into<String>) -> Self {
        self.worker_name = name.into();
        self
    }

    /// Parse a JSON document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            worker_name: DEFAULT_WORKER_NAME.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_polls_every_millisecond() {
        let config = SequencerConfig::default();

        assert_eq!(config.poll_interval(), Duration::from_millis(1));
        assert_eq!(config.worker_name, DEFAULT_WORKER_NAME);
    }

    #[test]
    fn empty_json_yields_defaults() {
        let config = SequencerConfig::from_json("{}").unwrap();
        assert_eq!(config, SequencerConfig::default());
    }

    #[test]
    fn builder_methods_override_fields() {
        let config = SequencerConfig::default()
            .with_poll_interval(Duration::from_millis(20))
            .with_worker_name("mission");

        assert_eq!(config.poll_interval_ms, 20);
        assert_eq!(config.worker_name, "mission");
    }

    #[test]
    fn sub_millisecond_interval_rounds_up() {
        let config = SequencerConfig::default().with_poll_interval(Duration::from_micros(200));
        assert_eq!(config.poll_interval(), Duration::from_millis(1));

        let config = SequencerConfig::default().with_poll_interval(Duration::from_micros(2_500));
        assert_eq!(config.poll_interval_ms, 3);

        let config = SequencerConfig::default().with_poll_interval(Duration::ZERO);
        assert_eq!(config.poll_interval_ms, 0);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let config =
            SequencerConfig::from_json(r#"{"worker_name": "w", "verbose": true}"#).unwrap();
        assert_eq!(config.worker_name, "w");
    }
}
