#![forbid(unsafe_code)]

//! Schedulers for tests that need to control or observe dispatch.

use std::cell::{Cell, RefCell};

use bindery_core::Scheduler;
use bindery_core::scheduler::Action;

/// Holds every action until the test runs them, in either order.
///
/// Actions scheduled while running are run by the same call.
#[derive(Default)]
pub struct ManualScheduler {
    queue: RefCell<Vec<Action>>,
}

impl ManualScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Run actions oldest first. Returns how many ran.
    pub fn run_fifo(&self) -> usize {
        self.run_with(|queue| (!queue.is_empty()).then(|| queue.remove(0)))
    }

    /// Run actions newest first. Returns how many ran.
    pub fn run_lifo(&self) -> usize {
        self.run_with(Vec::pop)
    }

    fn run_with(&self, mut next: impl FnMut(&mut Vec<Action>) -> Option<Action>) -> usize {
        let mut ran = 0;
        loop {
            let action = next(&mut self.queue.borrow_mut());
            let Some(action) = action else { break };
            action();
            ran += 1;
        }
        ran
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, action: Action) {
        self.queue.borrow_mut().push(action);
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Runs actions inline and counts how many it was handed.
#[derive(Debug, Default)]
pub struct CountingScheduler {
    scheduled: Cell<usize>,
}

impl CountingScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn scheduled(&self) -> usize {
        self.scheduled.get()
    }
}

impl Scheduler for CountingScheduler {
    fn schedule(&self, action: Action) {
        self.scheduled.set(self.scheduled.get() + 1);
        action();
    }
}
