#![forbid(unsafe_code)]

//! Pluggable callback dispatch.
//!
//! A [`SubscriptionOptions`](crate::SubscriptionOptions) may name a
//! scheduler; deliveries for that subscriber are then handed to
//! [`Scheduler::schedule`] instead of being called inline. The subscription
//! core does not assume the action runs synchronously, in order, or at all:
//! it keeps its own per-subscriber queue and re-checks disposal when the
//! action eventually runs.

use std::cell::RefCell;
use std::collections::VecDeque;

/// A unit of deferred work.
pub type Action = Box<dyn FnOnce()>;

/// Decides where and when a delivery runs.
pub trait Scheduler {
    /// Arrange for `action` to run.
    fn schedule(&self, action: Action);
}

/// Runs every action inline, on the caller's stack.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
    fn schedule(&self, action: Action) {
        action();
    }
}

/// FIFO queue of actions drained by the owner, one "tick" at a time.
///
/// Models a deferred main-loop hop: nothing runs until [`run_pending`]
/// is called. Actions scheduled while draining run in the same call.
///
/// [`run_pending`]: DeferredScheduler::run_pending
#[derive(Default)]
pub struct DeferredScheduler {
    queue: RefCell<VecDeque<Action>>,
}

impl DeferredScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued actions.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Run queued actions until the queue is empty. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            // Pop under a short borrow; the action may schedule more work.
            let next = self.queue.borrow_mut().pop_front();
            let Some(action) = next else { break };
            action();
            ran += 1;
        }
        if ran > 0 {
            tracing::trace!(ran, "deferred scheduler drained");
        }
        ran
    }
}

impl Scheduler for DeferredScheduler {
    fn schedule(&self, action: Action) {
        self.queue.borrow_mut().push_back(action);
    }
}

impl std::fmt::Debug for DeferredScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}
