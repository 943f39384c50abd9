//! Cooperative step sequencing.
//!
//! A [`Sequencer`] owns an ordered list of steps and guarantees that at
//! most one of them runs at any time. Requests to move on are queued:
//!
//! - `advance()` moves to the next step, finishing the sequence after the last
//! - `jump(name)` moves to a named step; only one jump may be queued at a time
//!
//! A background worker drains the queue in FIFO order. The internal lock is
//! never held while a step runs, so steps can drive their own sequencer.
//!
//! # Faults
//!
//! Queuing a second jump before the first is processed, or finding a step
//! already in flight when the worker is about to dispatch, breaks the
//! single-flight contract. Both panic with a [`SequencerFault`] message
//! instead of returning an error.

mod builder;
mod config;
mod error;
mod request;
#[allow(clippy::module_inception)]
mod sequencer;

pub use builder::SequencerBuilder;
pub use config::{SequencerConfig, DEFAULT_POLL_INTERVAL, DEFAULT_WORKER_NAME};
pub use error::{BuildError, SequencerError, SequencerFault};
pub use request::Request;
pub use sequencer::{Phase, Sequencer};
