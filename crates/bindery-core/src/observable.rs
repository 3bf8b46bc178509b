#![forbid(unsafe_code)]

//! Observable value cell with diff notification and version tracking.
//!
//! # Design
//!
//! [`Observable<T>`] wraps a value of type `T` in shared, reference-counted
//! storage. When a write changes the value (by `PartialEq`), every live
//! subscriber receives `(Some(old), new)` in registration order.
//!
//! # Performance
//!
//! | Operation     | Complexity                                  |
//! |---------------|---------------------------------------------|
//! | `get()`       | O(1) + clone                                |
//! | `set()`       | O(S) where S = subscribers                  |
//! | `modify()`    | O(S) + one snapshot clone for the equality check |
//! | `subscribe*`  | O(1) amortized                              |
//!
//! # Failure Modes
//!
//! - **Read inside `modify`**: calling `get()`/`with()` on the same
//!   observable from inside the `modify` closure panics (RefCell rules).
//! - **Writes from callbacks** are allowed: the value borrow is released
//!   before subscribers run, so a callback may `set()` again. The nested
//!   write is delivered to every subscriber after the current pass has
//!   finished, so each subscriber's last `(old, new)` ends on `get()`.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::disposable::Disposable;
use crate::subscribable::Subscribable;
use crate::subscription::{SubscriptionCollection, SubscriptionOptions};

struct ObservableInner<T> {
    value: RefCell<T>,
    version: Cell<u64>,
    subscribers: SubscriptionCollection<T>,
}

/// A shared, version-tracked value with change notification.
///
/// Cloning an `Observable` creates a new handle to the **same** state.
///
/// # Invariants
///
/// 1. `version` increments by exactly 1 on each value-changing write.
/// 2. `set(v)` where `v == current` is a no-op.
/// 3. Each logical write notifies exactly once (`modify` included).
/// 4. Subscribers are notified in registration order.
pub struct Observable<T> {
    inner: Rc<ObservableInner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("value", &*self.inner.value.borrow())
            .field("version", &self.inner.version.get())
            .field("subscribers", &self.inner.subscribers)
            .finish()
    }
}

impl<T: Default + Clone + PartialEq + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create a new observable. The initial version is 0.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(ObservableInner {
                value: RefCell::new(value),
                version: Cell::new(0),
                subscribers: SubscriptionCollection::skipping_round_trips(),
            }),
        }
    }

    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Access the current value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.inner.value.borrow())
    }

    /// Replace the value, notifying subscribers if it changed.
    pub fn set(&self, value: T) {
        let old = {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return;
            }
            std::mem::replace(&mut *current, value)
        };
        self.changed(old);
    }

    /// Mutate the value in place with a single notification at the end.
    ///
    /// Nothing is delivered if the value compares equal to its state before
    /// `f` ran.
    pub fn modify<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let (old, result) = {
            let mut current = self.inner.value.borrow_mut();
            let snapshot = current.clone();
            let result = f(&mut *current);
            if *current == snapshot {
                return result;
            }
            (snapshot, result)
        };
        self.changed(old);
        result
    }

    /// Current version number.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// A non-owning handle to this observable.
    #[must_use]
    pub fn downgrade(&self) -> WeakObservable<T> {
        WeakObservable {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Whether `self` and `other` are handles to the same state.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn changed(&self, old: T) {
        let version = self.inner.version.get() + 1;
        self.inner.version.set(version);
        tracing::trace!(version, "observable changed");
        // Deliver from a clone so callbacks may write again.
        let new = self.get();
        self.inner.subscribers.notify(Some(&old), &new);
    }
}

impl<T: Clone + PartialEq + 'static> Subscribable for Observable<T> {
    type Value = T;

    fn subscribe_diff(
        &self,
        options: SubscriptionOptions,
        callback: impl Fn(Option<&T>, &T) + 'static,
    ) -> Disposable {
        let current = self.get();
        self.inner.subscribers.add(options, Some(&current), callback)
    }
}

/// Non-owning handle to an [`Observable`].
pub struct WeakObservable<T> {
    inner: Weak<ObservableInner<T>>,
}

impl<T> Clone for WeakObservable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> WeakObservable<T> {
    /// Upgrade to a strong handle if any owner is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Observable<T>> {
        self.inner.upgrade().map(|inner| Observable { inner })
    }
}

impl<T> std::fmt::Debug for WeakObservable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakObservable")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}
