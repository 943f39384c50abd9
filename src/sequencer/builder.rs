//! Builder for constructing sequencers.

use crate::core::{Step, Tag};
use crate::sequencer::config::SequencerConfig;
use crate::sequencer::error::BuildError;
use crate::sequencer::sequencer::Sequencer;
use std::collections::HashSet;
use std::time::Duration;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Builder for constructing sequencers with a fluent API.
///
/// `build` validates the whole configuration and reports every problem it
/// finds, not just the first.
pub struct SequencerBuilder {
    steps: Vec<Box<dyn Step>>,
    tags: Vec<Tag>,
    config: SequencerConfig,
}

impl SequencerBuilder {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            tags: Vec::new(),
            config: SequencerConfig::default(),
        }
    }

    /// Append a step. Steps run in the order they are added.
    pub fn step<S: Step + 'static>(mut self, step: S) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Append several boxed steps.
    pub fn steps(mut self, steps: impl IntoIterator<Item = Box<dyn Step>>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Add a tag passed to every step.
    pub fn tag(mut self, tag: impl Into<Tag>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags.extend(tags);
        self
    }

    pub fn config(mut self, config: SequencerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config = self.config.with_poll_interval(interval);
        self
    }

    /// Check the step list and configuration, accumulating ALL problems.
    pub fn validate(&self) -> Validation<(), NonEmptyVec<BuildError>> {
        let mut checks: Vec<Validation<(), NonEmptyVec<BuildError>>> = Vec::new();

        if self.steps.is_empty() {
            checks.push(Validation::fail(BuildError::NoSteps));
        }

        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        for step in &self.steps {
            let name = step.name();
            if !seen.insert(name) && reported.insert(name) {
                checks.push(Validation::fail(BuildError::DuplicateStep(name.to_string())));
            }
        }

        checks.push(if self.config.poll_interval_ms == 0 {
            Validation::fail(BuildError::ZeroPollInterval)
        } else {
            Validation::success(())
        });

        Validation::all_vec(checks).map(|_| ())
    }

    /// Build the sequencer.
    ///
    /// A single problem is returned as-is; several are wrapped in
    /// [`BuildError::Invalid`].
    pub fn build(self) -> Result<Sequencer, BuildError> {
        if let Validation::Failure(errors) = self.validate() {
            let mut errors: Vec<BuildError> = errors.iter().cloned().collect();
            return Err(if errors.len() == 1 {
                errors.remove(0)
            } else {
                BuildError::Invalid(errors)
            });
        }

        Ok(Sequencer::from_parts(self.steps, self.tags, self.config))
    }
}

impl Default for SequencerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequencer {
    /// Build a sequencer over `steps` with the default configuration.
    pub fn new(steps: Vec<Box<dyn Step>>) -> Result<Self, BuildError> {
        SequencerBuilder::new().steps(steps).build()
    }
}
