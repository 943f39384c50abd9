//! Stepwise: single-flight step sequencing and guarded state machines
//!
//! Two small control-flow primitives for driving a process forward:
//!
//! - **Sequencer**: runs an ordered list of named steps one at a time,
//!   driven by queued "advance" and "jump" requests
//! - **State machine**: moves between named states only when an external
//!   guard approves, exiting the old state and entering the new one
//!
//! Both are thread-safe and self-contained; construct one per process that
//! needs it and share it by handle or reference.
//!
//! # Example
//!
//! ```rust
//! use stepwise::core::{FnState, FnStep, PermitAll, StateMap};
//! use stepwise::machine::StateMachine;
//! use stepwise::sequencer::SequencerBuilder;
//!
//! let sequencer = SequencerBuilder::new()
//!     .step(FnStep::new("boot", |seq, _| {
//!         seq.advance();
//!         Ok(())
//!     }))
//!     .step(FnStep::noop("serve"))
//!     .build()
//!     .unwrap();
//! sequencer.start().unwrap();
//!
//! let machine = StateMachine::new(
//!     PermitAll,
//!     StateMap::new().with(FnState::new("menu")).with(FnState::new("play")),
//! );
//! machine.start("menu").unwrap();
//! machine.change_state("play").unwrap();
//! assert!(machine.is_running());
//! ```

pub mod core;
pub mod machine;
pub mod sequencer;

// Re-export commonly used types
pub use crate::core::{FnGuard, FnState, FnStep, PermitAll, State, StateMap, Step, TransitionGuard};
pub use machine::{MachineError, StateMachine};
pub use sequencer::{Sequencer, SequencerBuilder};
