//! Single-flight step sequencer.

use crate::core::{Step, Tag};
use crate::sequencer::config::SequencerConfig;
use crate::sequencer::error::{SequencerError, SequencerFault};
use crate::sequencer::request::Request;
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

/// Lifecycle of a sequencer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Built, `start` not called yet.
    Idle,
    /// Step 0 dispatched; the worker is draining requests.
    Running,
    /// An advance past the last step was processed. Terminal.
    Finished,
    /// A step panicked. Terminal; queued requests were discarded.
    Aborted,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Finished | Phase::Aborted)
    }
}

struct Inner {
    phase: Phase,
    current: Option<usize>,
    busy: bool,
    pending: VecDeque<Request>,
}

struct Shared {
    id: Uuid,
    steps: Vec<Box<dyn Step>>,
    tags: Vec<Tag>,
    config: SequencerConfig,
    inner: Mutex<Inner>,
    /// Signalled when a request is queued.
    wakeup: Condvar,
    /// Signalled after every dispatch and when the sequence finishes.
    progress: Condvar,
}

/// Runs an ordered list of steps strictly one at a time.
///
/// `start` dispatches the first step on the caller's thread and then hands
/// control to a background worker. `advance` and `jump` only queue a
/// request; the worker dequeues them in FIFO order and dispatches the
/// resulting step with the internal lock released, so a step may queue
/// further requests on its own sequencer.
///
/// `Sequencer` is a cheap handle; clones share one sequencer. The worker
/// exits when the sequence finishes or when every handle has been dropped.
///
/// # Example
///
/// ```rust
/// use stepwise::core::FnStep;
/// use stepwise::sequencer::SequencerBuilder;
/// use std::time::Duration;
///
/// let sequencer = SequencerBuilder::new()
///     .step(FnStep::new("fetch", |seq, _| {
///         seq.advance();
///         Ok(())
///     }))
///     .step(FnStep::new("store", |seq, _| {
///         seq.advance();
///         Ok(())
///     }))
///     .build()
///     .unwrap();
///
/// sequencer.start().unwrap();
/// assert!(sequencer.wait_until_finished(Duration::from_secs(5)));
/// assert!(!sequencer.is_running());
/// ```
#[derive(Clone)]
pub struct Sequencer {
    shared: Arc<Shared>,
}

impl Sequencer {
    pub(crate) fn from_parts(
        steps: Vec<Box<dyn Step>>,
        tags: Vec<Tag>,
        config: SequencerConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                id: Uuid::new_v4(),
                steps,
                tags,
                config,
                inner: Mutex::new(Inner {
                    phase: Phase::Idle,
                    current: None,
                    busy: false,
                    pending: VecDeque::new(),
                }),
                wakeup: Condvar::new(),
                progress: Condvar::new(),
            }),
        }
    }

    /// Start the sequence.
    ///
    /// Blocks for the duration of the first step only. Calling `start` on a
    /// sequencer that is running or finished logs a warning and does
    /// nothing.
    pub fn start(&self) -> Result<(), SequencerError> {
        {
            let mut inner = self.lock();
            if inner.phase != Phase::Idle {
                warn!(sequencer = %self.shared.id, phase = ?inner.phase, "sequencer already started");
                return Ok(());
            }
            inner.phase = Phase::Running;
            inner.current = Some(0);
            inner.busy = true;
        }

        info!(sequencer = %self.shared.id, steps = self.shared.steps.len(), "sequencer started");
        self.dispatch(0);

        self.spawn_worker()
    }

    /// Queue a move to the next step. Never blocks.
    ///
    /// Dropped once the sequence has finished.
    pub fn advance(&self) {
        {
            let mut inner = self.lock();
            if inner.phase.is_terminal() {
                trace!(sequencer = %self.shared.id, phase = ?inner.phase, "advance after finish dropped");
                return;
            }
            inner.pending.push_back(Request::Advance);
        }
        self.shared.wakeup.notify_one();
    }

    /// Queue a jump to the named step. Never blocks.
    ///
    /// An unknown step name is logged and ignored.
    ///
    /// # Panics
    ///
    /// Panics if another jump is already queued. Two overlapping jumps mean
    /// the controlling code has lost track of the sequence.
    pub fn jump(&self, step_name: &str) {
        if let Err(err) = self.try_jump(step_name) {
            warn!(sequencer = %self.shared.id, step = step_name, error = %err, "jump ignored");
        }
    }

    /// Like [`Sequencer::jump`], but returns the unknown-step condition.
    ///
    /// # Panics
    ///
    /// Panics if another jump is already queued.
    pub fn try_jump(&self, step_name: &str) -> Result<(), SequencerError> {
        {
            let mut inner = self.lock();
            if inner.pending.iter().any(Request::is_jump) {
                let fault = SequencerFault::ConflictingJumpRequest {
                    requested: step_name.to_string(),
                    pending: inner.pending.iter().map(ToString::to_string).collect(),
                };
                drop(inner);
                fault.raise();
            }

            if self.position(step_name).is_none() {
                return Err(SequencerError::StepNotFound {
                    name: step_name.to_string(),
                });
            }

            if inner.phase.is_terminal() {
                trace!(sequencer = %self.shared.id, step = step_name, phase = ?inner.phase, "jump after finish dropped");
                return Ok(());
            }
            inner.pending.push_back(Request::JumpTo(step_name.to_string()));
        }
        debug!(sequencer = %self.shared.id, step = step_name, "jump queued");
        self.shared.wakeup.notify_one();
        Ok(())
    }

    /// Identifier used in this sequencer's log records.
    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    pub fn is_running(&self) -> bool {
        self.phase() == Phase::Running
    }

    pub fn is_finished(&self) -> bool {
        self.phase() == Phase::Finished
    }

    /// Whether a step panicked and took the sequence down with it.
    pub fn is_aborted(&self) -> bool {
        self.phase() == Phase::Aborted
    }

    /// Index of the current step, once started.
    pub fn current_index(&self) -> Option<usize> {
        self.lock().current
    }

    /// Name of the current step, once started.
    pub fn current_step(&self) -> Option<String> {
        self.current_index()
            .map(|index| self.shared.steps[index].name().to_string())
    }

    /// Number of requests not yet picked up by the worker.
    pub fn pending_requests(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.shared.steps.iter().map(|step| step.name()).collect()
    }

    pub fn tags(&self) -> &[Tag] {
        &self.shared.tags
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.shared.config
    }

    /// Block until the sequence ends or `timeout` elapses.
    ///
    /// Returns whether the sequence finished normally. An aborted sequence
    /// returns `false` without waiting out the timeout. A timeout too large
    /// to represent as a deadline waits without one.
    pub fn wait_until_finished(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut inner = self.lock();
        while !inner.phase.is_terminal() {
            inner = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    self.shared
                        .progress
                        .wait_timeout(inner, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self
                    .shared
                    .progress
                    .wait(inner)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }
        inner.phase == Phase::Finished
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn position(&self, step_name: &str) -> Option<usize> {
        self.shared
            .steps
            .iter()
            .position(|step| step.name() == step_name)
    }

    /// Run one step's `perform` and clear `busy` afterwards, even if the
    /// step panics. Must be called with the lock released and `busy` set.
    fn dispatch(&self, index: usize) {
        let step = &self.shared.steps[index];
        let _in_flight = InFlight {
            sequencer: self,
            step: step.name(),
        };
        debug!(sequencer = %self.shared.id, step = step.name(), index, "dispatching step");
        if let Err(err) = step.perform(self, &self.shared.tags) {
            warn!(sequencer = %self.shared.id, step = step.name(), error = %err, "step failed");
        }
    }

    fn spawn_worker(&self) -> Result<(), SequencerError> {
        let shared = Arc::downgrade(&self.shared);
        let spawned = thread::Builder::new()
            .name(self.shared.config.worker_name.clone())
            .spawn(move || run_worker(shared));

        match spawned {
            Ok(_) => Ok(()),
            Err(err) => {
                error!(sequencer = %self.shared.id, error = %err, "failed to spawn sequencer worker");
                {
                    let mut inner = self.lock();
                    inner.phase = Phase::Finished;
                    inner.pending.clear();
                }
                self.shared.progress.notify_all();
                Err(SequencerError::WorkerSpawn(err))
            }
        }
    }

    /// One worker pass. Returns `false` once the worker should exit.
    fn pass(&self) -> bool {
        let mut inner = self.lock();

        if inner.phase != Phase::Running {
            return false;
        }
        if inner.busy {
            drop(inner);
            SequencerFault::ReentrantDispatch.raise();
        }

        let Some(request) = inner.pending.pop_front() else {
            let interval = self.shared.config.poll_interval();
            let _ = self
                .shared
                .wakeup
                .wait_timeout(inner, interval)
                .unwrap_or_else(PoisonError::into_inner);
            return true;
        };

        let next = match &request {
            Request::Advance => {
                let next = inner.current.map_or(0, |index| index + 1);
                if next >= self.shared.steps.len() {
                    inner.phase = Phase::Finished;
                    let dropped = inner.pending.len();
                    inner.pending.clear();
                    drop(inner);
                    info!(sequencer = %self.shared.id, dropped, "sequence finished");
                    self.shared.progress.notify_all();
                    return false;
                }
                next
            }
            Request::JumpTo(name) => match self.position(name) {
                Some(index) => index,
                None => {
                    warn!(sequencer = %self.shared.id, step = %name, "jump target vanished");
                    return true;
                }
            },
        };

        inner.current = Some(next);
        inner.busy = true;
        drop(inner);

        trace!(sequencer = %self.shared.id, %request, "request dequeued");
        self.dispatch(next);
        true
    }
}

/// Marks a dispatch in flight. Dropping it clears `busy`; dropping it
/// during an unwind aborts the sequence so nothing waits on a dead worker.
struct InFlight<'a> {
    sequencer: &'a Sequencer,
    step: &'a str,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let shared = &self.sequencer.shared;
        if thread::panicking() {
            let dropped = {
                let mut inner = self.sequencer.lock();
                inner.busy = false;
                inner.phase = Phase::Aborted;
                let dropped = inner.pending.len();
                inner.pending.clear();
                dropped
            };
            error!(sequencer = %shared.id, step = self.step, dropped, "step panicked, sequence aborted");
        } else {
            self.sequencer.lock().busy = false;
        }
        shared.progress.notify_all();
    }
}

impl std::fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Sequencer")
            .field("id", &self.shared.id)
            .field("steps", &self.step_names())
            .field("phase", &inner.phase)
            .field("current", &inner.current)
            .field("busy", &inner.busy)
            .field("pending", &inner.pending)
            .finish()
    }
}

/// Worker body. Holds a strong reference only for the length of a pass.
fn run_worker(shared: Weak<Shared>) {
    loop {
        let Some(shared) = shared.upgrade() else {
            debug!("sequencer dropped, worker exiting");
            return;
        };
        let sequencer = Sequencer { shared };
        if !sequencer.pass() {
            debug!(sequencer = %sequencer.shared.id, "worker exiting");
            return;
        }
    }
}
