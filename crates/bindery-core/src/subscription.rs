#![forbid(unsafe_code)]

//! Subscriber lists and delivery rules shared by every subscribable.
//!
//! # Design
//!
//! [`SubscriptionCollection<T>`] keeps subscribers in registration order.
//! A notification snapshots the list, then walks it; each subscriber's
//! [`DisposeToken`] is checked right before its callback, so a callback that
//! disposes itself or a sibling stops further deliveries immediately, even
//! within the same notification pass.
//!
//! Delivery is shaped by [`SubscriptionOptions`]:
//!
//! | Option                | Effect                                                  |
//! |-----------------------|---------------------------------------------------------|
//! | no scheduler          | callback runs inline with borrowed `(old, new)`          |
//! | `receive_on(s)`       | `(old, new)` is cloned into a per-subscriber FIFO and a drain is handed to `s` |
//! | `AfterChange`         | held until the enclosing [`BatchScope`] ends, coalesced |
//! | `notify_on_subscribe` | current value delivered at subscribe time with `old = None` |
//!
//! # Invariants
//!
//! 1. Subscribers are notified in registration order for a given change.
//! 2. No callback runs after its subscription is disposed, including
//!    deliveries already queued on a scheduler.
//! 3. A subscriber receives its notifications in the order they were
//!    produced and never re-entrantly. A notification raised from inside a
//!    callback is queued on the collection and delivered to everyone once
//!    the current pass has finished, so no subscriber hears an older value
//!    after a newer one. A scheduled subscriber keeps its order whatever
//!    order the scheduler runs actions in.
//! 4. `AfterChange` subscribers of a collection built with
//!    [`SubscriptionCollection::skipping_round_trips`] hear nothing from a
//!    batch that ends on the value it started from.
//!
//! [`BatchScope`]: crate::BatchScope

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug_span;
use web_time::Instant;

use crate::batch;
use crate::disposable::{Disposable, DisposeToken};
use crate::scheduler::Scheduler;

/// Source of subscriber ids; also used as batch coalescing keys.
static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

/// When a subscriber hears about a write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DispatchTiming {
    /// Synchronously, at the write.
    #[default]
    Immediate,
    /// Once, after the enclosing mutation batch completes.
    AfterChange,
}

/// Immutable description of how a subscription is delivered.
#[derive(Clone)]
pub struct SubscriptionOptions {
    scheduler: Option<Rc<dyn Scheduler>>,
    timing: DispatchTiming,
    notify_on_subscribe: bool,
}

impl Default for SubscriptionOptions {
    fn default() -> Self {
        Self {
            scheduler: None,
            timing: DispatchTiming::Immediate,
            notify_on_subscribe: true,
        }
    }
}

impl SubscriptionOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver through `scheduler` instead of calling inline.
    #[must_use]
    pub fn receive_on(mut self, scheduler: Rc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    #[must_use]
    pub fn timing(mut self, timing: DispatchTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Whether to deliver the current value when subscribing.
    #[must_use]
    pub fn notify_on_subscribe(mut self, notify: bool) -> Self {
        self.notify_on_subscribe = notify;
        self
    }

    #[must_use]
    pub fn scheduler(&self) -> Option<&Rc<dyn Scheduler>> {
        self.scheduler.as_ref()
    }

    #[must_use]
    pub fn dispatch_timing(&self) -> DispatchTiming {
        self.timing
    }

    #[must_use]
    pub fn notifies_on_subscribe(&self) -> bool {
        self.notify_on_subscribe
    }
}

impl std::fmt::Debug for SubscriptionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionOptions")
            .field("scheduled", &self.scheduler.is_some())
            .field("timing", &self.timing)
            .field("notify_on_subscribe", &self.notify_on_subscribe)
            .finish()
    }
}

type Callback<T> = dyn Fn(Option<&T>, &T);
type SameValue<T> = fn(&T, &T) -> bool;

struct Subscriber<T> {
    id: u64,
    token: DisposeToken,
    options: SubscriptionOptions,
    callback: Box<Callback<T>>,
    /// Pending `(old, new)` pairs awaiting a scheduled drain.
    queue: RefCell<VecDeque<(Option<T>, T)>>,
    draining: Cell<bool>,
    /// `Some(old)` once an `AfterChange` delivery is deferred in a batch.
    batch_origin: RefCell<Option<Option<T>>>,
    same_value: Option<SameValue<T>>,
}

impl<T: Clone + 'static> Subscriber<T> {
    fn is_live(&self) -> bool {
        !self.token.is_disposed()
    }

    fn dispatch(this: &Rc<Self>, old: Option<&T>, new: &T) {
        match this.options.timing {
            DispatchTiming::Immediate => Self::deliver(this, old, new),
            DispatchTiming::AfterChange => Self::defer_until_batch_end(this, old, new),
        }
    }

    fn defer_until_batch_end(this: &Rc<Self>, old: Option<&T>, new: &T) {
        this.batch_origin
            .borrow_mut()
            .get_or_insert_with(|| old.cloned());
        let weak = Rc::downgrade(this);
        let latest = new.clone();
        batch::defer_or_run_keyed(this.id, move || {
            let Some(this) = weak.upgrade() else { return };
            let origin = this.batch_origin.borrow_mut().take().flatten();
            if let (Some(same), Some(origin)) = (this.same_value, origin.as_ref())
                && same(origin, &latest)
            {
                // Changed and changed back within the batch.
                return;
            }
            Self::deliver(&this, origin.as_ref(), &latest);
        });
    }

    fn deliver(this: &Rc<Self>, old: Option<&T>, new: &T) {
        match this.options.scheduler.clone() {
            Some(scheduler) => {
                this.enqueue(old, new);
                let weak = Rc::downgrade(this);
                scheduler.schedule(Box::new(move || {
                    if let Some(this) = weak.upgrade() {
                        Self::drain(&this);
                    }
                }));
            }
            // Written from inside this subscriber's own callback: delivered
            // once that callback returns, if still live.
            None if this.draining.get() => this.enqueue(old, new),
            None => {
                let Some(_guard) = DrainGuard::acquire(&this.draining) else {
                    return;
                };
                if this.is_live() {
                    (this.callback)(old, new);
                }
                Self::drain_queue(this);
            }
        }
    }

    fn enqueue(&self, old: Option<&T>, new: &T) {
        self.queue
            .borrow_mut()
            .push_back((old.cloned(), new.clone()));
    }

    /// Deliver queued pairs oldest first. Re-entrant drains return early;
    /// the outer drain picks up whatever they would have delivered.
    fn drain(this: &Rc<Self>) {
        if let Some(_guard) = DrainGuard::acquire(&this.draining) {
            Self::drain_queue(this);
        }
    }

    fn drain_queue(this: &Rc<Self>) {
        loop {
            if !this.is_live() {
                this.queue.borrow_mut().clear();
                break;
            }
            let next = this.queue.borrow_mut().pop_front();
            let Some((old, new)) = next else { break };
            (this.callback)(old.as_ref(), &new);
        }
    }
}

/// Marks a subscriber as mid-delivery until dropped.
struct DrainGuard<'a>(&'a Cell<bool>);

impl<'a> DrainGuard<'a> {
    fn acquire(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Clears the in-pass flag on exit. Leftover queued notifications only
/// remain after a panic and are dropped with it.
struct PassGuard<'a, T> {
    notifying: &'a Cell<bool>,
    pending: &'a RefCell<VecDeque<(Option<T>, T)>>,
}

impl<'a, T> PassGuard<'a, T> {
    fn enter(
        notifying: &'a Cell<bool>,
        pending: &'a RefCell<VecDeque<(Option<T>, T)>>,
    ) -> Option<Self> {
        if notifying.replace(true) {
            None
        } else {
            Some(Self { notifying, pending })
        }
    }
}

impl<T> Drop for PassGuard<'_, T> {
    fn drop(&mut self) {
        self.pending.borrow_mut().clear();
        self.notifying.set(false);
    }
}

/// Ordered list of subscribers for one source of values.
pub struct SubscriptionCollection<T> {
    subscribers: Rc<RefCell<Vec<Rc<Subscriber<T>>>>>,
    notifying: Cell<bool>,
    /// Notifications raised while a pass was running, oldest first.
    pending: RefCell<VecDeque<(Option<T>, T)>>,
    same_value: Option<SameValue<T>>,
}

impl<T> Default for SubscriptionCollection<T> {
    fn default() -> Self {
        Self {
            subscribers: Rc::new(RefCell::new(Vec::new())),
            notifying: Cell::new(false),
            pending: RefCell::new(VecDeque::new()),
            same_value: None,
        }
    }
}

impl<T: Clone + PartialEq + 'static> SubscriptionCollection<T> {
    /// A collection whose `AfterChange` subscribers skip a batch that ends
    /// on the value it started from.
    #[must_use]
    pub fn skipping_round_trips() -> Self {
        Self {
            same_value: Some(<T as PartialEq>::eq),
            ..Self::default()
        }
    }
}

impl<T: Clone + 'static> SubscriptionCollection<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback`.
    ///
    /// If `current` is given and the options ask for it, the callback is
    /// delivered `(None, current)` before this returns (or, with a
    /// scheduler, handed to the scheduler before this returns).
    pub fn add(
        &self,
        options: SubscriptionOptions,
        current: Option<&T>,
        callback: impl Fn(Option<&T>, &T) + 'static,
    ) -> Disposable {
        let id = NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed);
        let token = DisposeToken::new();
        let subscriber = Rc::new(Subscriber {
            id,
            token: token.clone(),
            options,
            callback: Box::new(callback),
            queue: RefCell::new(VecDeque::new()),
            draining: Cell::new(false),
            batch_origin: RefCell::new(None),
            same_value: self.same_value,
        });
        self.subscribers.borrow_mut().push(Rc::clone(&subscriber));
        tracing::trace!(subscriber = id, "subscription added");

        let list: Weak<RefCell<Vec<Rc<Subscriber<T>>>>> = Rc::downgrade(&self.subscribers);
        let disposable = Disposable::with_token(token, move || {
            if let Some(list) = list.upgrade() {
                // Take the removed entry out so its callback drops after the
                // borrow ends; dropping captures may touch this collection.
                let removed = {
                    let mut list = list.borrow_mut();
                    let pos = list.iter().position(|s| s.id == id);
                    pos.map(|pos| list.remove(pos))
                };
                if let Some(removed) = removed {
                    removed.queue.borrow_mut().clear();
                }
                tracing::trace!(subscriber = id, "subscription disposed");
            }
        });

        if let Some(current) = current
            && subscriber.options.notify_on_subscribe
        {
            Subscriber::deliver(&subscriber, None, current);
        }
        disposable
    }

    /// Deliver `(old, new)` to every live subscriber in registration order.
    ///
    /// Called from inside a callback, the notification is queued and
    /// delivered once the running pass completes.
    pub fn notify(&self, old: Option<&T>, new: &T) {
        let Some(_pass) = PassGuard::enter(&self.notifying, &self.pending) else {
            self.pending
                .borrow_mut()
                .push_back((old.cloned(), new.clone()));
            return;
        };

        self.notify_pass(old, new);
        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some((old, new)) = next else { break };
            self.notify_pass(old.as_ref(), &new);
        }
    }

    fn notify_pass(&self, old: Option<&T>, new: &T) {
        let snapshot: Vec<Rc<Subscriber<T>>> = self.subscribers.borrow().clone();
        if snapshot.is_empty() {
            return;
        }

        let start = Instant::now();
        let span = debug_span!(
            "subscription.notify",
            subscribers = snapshot.len() as u64,
            duration_us = tracing::field::Empty
        );
        let _enter = span.enter();

        for subscriber in &snapshot {
            if subscriber.is_live() {
                Subscriber::dispatch(subscriber, old, new);
            }
        }

        span.record("duration_us", start.elapsed().as_micros() as u64);
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> std::fmt::Debug for SubscriptionCollection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionCollection")
            .field("subscribers", &self.subscribers.borrow().len())
            .finish()
    }
}
