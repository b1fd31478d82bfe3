use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::{debug, error};

use crate::error::HookError;

/// Re-attempts granted to a failing action before its error stands.
pub const DEFAULT_RETRY_BUDGET: u32 = 3;

/// A deferred, re-runnable unit of work.
pub type Action = Box<dyn FnMut() -> Result<(), HookError>>;

type FrameTask = Box<dyn FnOnce(&mut FrameOutcome)>;

/// Document load progress, captured from the embedder when the runtime is
/// constructed. Everything past `Loading` means the element tree is
/// traversable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Interactive,
    Complete,
}

impl LoadState {
    fn tree_available(self) -> bool {
        !matches!(self, LoadState::Loading)
    }
}

/// What one frame pump did.
#[derive(Debug, Default)]
pub struct FrameOutcome {
    pub frame: u64,
    pub tasks_run: usize,
    /// Errors surfaced by retry attempts that ran inside this frame's
    /// callbacks, final and intermediate alike.
    pub errors: Vec<HookError>,
}

/// Deterministic stand-in for animation-frame scheduling. Tasks requested
/// during frame N run in frame N + 1: the queue is swapped out before the
/// batch runs, so a task can never run in the frame that requested it.
pub struct FrameClock {
    queue: RefCell<Vec<FrameTask>>,
    frame: Cell<u64>,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            queue: RefCell::new(Vec::new()),
            frame: Cell::new(0),
        }
    }

    pub fn request(&self, task: impl FnOnce(&mut FrameOutcome) + 'static) {
        self.queue.borrow_mut().push(Box::new(task));
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Frames pumped so far.
    pub fn frame(&self) -> u64 {
        self.frame.get()
    }

    pub fn run_frame(&self) -> FrameOutcome {
        let frame = self.frame.get() + 1;
        self.frame.set(frame);
        let tasks = std::mem::take(&mut *self.queue.borrow_mut());
        let mut outcome = FrameOutcome {
            frame,
            tasks_run: 0,
            errors: Vec::new(),
        };
        for task in tasks {
            task(&mut outcome);
            outcome.tasks_run += 1;
        }
        outcome
    }
}

/// Readiness gate plus frame-paced bounded retry, one per document.
///
/// Actions submitted before the structural parse completes are parked and
/// drained in submission order on `mark_ready`, each independently entering
/// the retry path. The flag is captured synchronously at construction, so
/// there is no window between "already loaded" and "gate not yet attached".
pub struct Scheduler {
    clock: Rc<FrameClock>,
    ready: Cell<bool>,
    parked: RefCell<Vec<Action>>,
}

impl Scheduler {
    pub fn new(clock: Rc<FrameClock>, load_state: LoadState) -> Self {
        Self {
            clock,
            ready: Cell::new(load_state.tree_available()),
            parked: RefCell::new(Vec::new()),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.get()
    }

    pub fn parked_actions(&self) -> usize {
        self.parked.borrow().len()
    }

    /// Hand the action to the retry path now, or park it until the document
    /// structure is available. Never fails: an error from the immediate
    /// attempt is logged and left to the already-scheduled retries.
    pub fn run_when_ready(&self, action: impl FnMut() -> Result<(), HookError> + 'static) {
        if self.ready.get() {
            if let Err(err) = self.retry(action, DEFAULT_RETRY_BUDGET) {
                debug!(target: "scheduler", error = %err, "deferred action failed; retry scheduled");
            }
        } else {
            self.parked.borrow_mut().push(Box::new(action));
        }
    }

    /// Flip the readiness flag and drain the parked queue in order; later
    /// calls are no-ops. A failing action does not stop the drain.
    pub fn mark_ready(&self) {
        if self.ready.replace(true) {
            return;
        }
        let parked = std::mem::take(&mut *self.parked.borrow_mut());
        for action in parked {
            if let Err(err) = retry_on(&self.clock, action, DEFAULT_RETRY_BUDGET) {
                debug!(target: "scheduler", error = %err, "queued action failed; retry scheduled");
            }
        }
    }

    /// Run the action now. On failure with budget left, schedule the next
    /// attempt for the coming frame and still return this attempt's error:
    /// the caller observes every failure even when a retry is pending.
    pub fn retry(
        &self,
        action: impl FnMut() -> Result<(), HookError> + 'static,
        retries: u32,
    ) -> Result<(), HookError> {
        retry_on(&self.clock, Box::new(action), retries)
    }
}

fn retry_on(clock: &Rc<FrameClock>, mut action: Action, retries: u32) -> Result<(), HookError> {
    match action() {
        Ok(()) => Ok(()),
        Err(err) => {
            if retries > 0 {
                let clock_for_task = Rc::clone(clock);
                clock.request(move |outcome| {
                    let remaining = retries - 1;
                    if let Err(err) = retry_on(&clock_for_task, action, remaining) {
                        if remaining == 0 {
                            error!(target: "scheduler", error = %err, "action failed with retries exhausted");
                        } else {
                            debug!(target: "scheduler", error = %err, remaining, "retried action failed; another attempt scheduled");
                        }
                        outcome.errors.push(err);
                    }
                });
            }
            Err(err)
        }
    }
}
