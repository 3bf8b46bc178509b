#![forbid(unsafe_code)]

//! Scoped subscription lifetimes.
//!
//! A [`Disposable`] is returned by every `subscribe*` call. Disposing it (or
//! dropping it) makes the registration inert: the subscription core checks
//! the shared [`DisposeToken`] right before each callback, so a notification
//! that is already in flight or queued on a scheduler never reaches a
//! disposed subscriber.
//!
//! [`DisposableBag`] collects disposables whose lifetime is tied to some
//! owner (a data source, a view controller) and tears them all down at once.
//!
//! # Invariants
//!
//! 1. `dispose()` runs the cleanup at most once; later calls are no-ops.
//! 2. A bag disposes every member exactly once, even when disposed twice.
//! 3. Adding to a disposed bag disposes the new member immediately.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

type Cleanup = Box<dyn FnOnce()>;

/// Shared, read-only view of a disposable's state.
///
/// Cloning a token does not extend the registration; it only lets the
/// delivery path ask "is this subscriber still live?".
#[derive(Clone, Default)]
pub struct DisposeToken {
    disposed: Rc<Cell<bool>>,
}

impl DisposeToken {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Whether the owning [`Disposable`] has been disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Mark disposed. Returns `true` if this call made the transition.
    fn mark(&self) -> bool {
        !self.disposed.replace(true)
    }
}

impl std::fmt::Debug for DisposeToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisposeToken")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Handle to a live registration.
///
/// Dropping the handle disposes it. Keep it in a field or a
/// [`DisposableBag`] for as long as the callback should stay registered.
#[must_use = "dropping a Disposable cancels the subscription"]
pub struct Disposable {
    token: DisposeToken,
    cleanup: RefCell<Option<Cleanup>>,
}

impl Disposable {
    /// Create a disposable that runs `cleanup` when disposed.
    pub fn new(cleanup: impl FnOnce() + 'static) -> Self {
        Self::with_token(DisposeToken::new(), cleanup)
    }

    /// A disposable with nothing to clean up.
    pub fn empty() -> Self {
        Self {
            token: DisposeToken::new(),
            cleanup: RefCell::new(None),
        }
    }

    pub(crate) fn with_token(token: DisposeToken, cleanup: impl FnOnce() + 'static) -> Self {
        Self {
            token,
            cleanup: RefCell::new(Some(Box::new(cleanup))),
        }
    }

    /// Dispose the registration. Idempotent.
    pub fn dispose(&self) {
        if !self.token.mark() {
            return;
        }
        // Release the borrow before running: cleanup may re-enter.
        let cleanup = self.cleanup.borrow_mut().take();
        if let Some(cleanup) = cleanup {
            cleanup();
        }
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.token.is_disposed()
    }

    /// A token observing this disposable's state.
    #[must_use]
    pub fn token(&self) -> DisposeToken {
        self.token.clone()
    }

    /// Move this disposable into `bag`.
    pub fn add_to(self, bag: &DisposableBag) {
        bag.add(self);
    }
}

impl Drop for Disposable {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Disposable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disposable")
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

/// Owns a set of [`Disposable`]s and disposes them together.
#[derive(Default)]
pub struct DisposableBag {
    members: RefCell<Vec<Disposable>>,
    disposed: Cell<bool>,
}

impl DisposableBag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `disposable`.
    ///
    /// If the bag is already disposed, `disposable` is disposed right away.
    pub fn add(&self, disposable: Disposable) {
        if self.disposed.get() {
            disposable.dispose();
            return;
        }
        self.members.borrow_mut().push(disposable);
    }

    /// Number of members currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Dispose every member. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        let members = std::mem::take(&mut *self.members.borrow_mut());
        tracing::trace!(members = members.len(), "disposable bag disposed");
        for member in &members {
            member.dispose();
        }
    }
}

impl Drop for DisposableBag {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for DisposableBag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisposableBag")
            .field("len", &self.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting() -> (Rc<Cell<u32>>, Disposable) {
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);
        let disposable = Disposable::new(move || count_clone.set(count_clone.get() + 1));
        (count, disposable)
    }

    #[test]
    fn dispose_runs_cleanup_once() {
        let (count, disposable) = counting();
        assert!(!disposable.is_disposed());

        disposable.dispose();
        disposable.dispose();
        assert!(disposable.is_disposed());
        assert_eq!(count.get(), 1);

        drop(disposable);
        assert_eq!(count.get(), 1, "drop after dispose must not rerun cleanup");
    }

    #[test]
    fn drop_disposes() {
        let (count, disposable) = counting();
        let token = disposable.token();
        drop(disposable);
        assert_eq!(count.get(), 1);
        assert!(token.is_disposed());
    }

    #[test]
    fn empty_disposable_flips_flag() {
        let disposable = Disposable::empty();
        let token = disposable.token();
        disposable.dispose();
        assert!(token.is_disposed());
    }

    #[test]
    fn bag_disposes_all_members_once() {
        let bag = DisposableBag::new();
        let (a, da) = counting();
        let (b, db) = counting();
        da.add_to(&bag);
        bag.add(db);
        assert_eq!(bag.len(), 2);

        bag.dispose();
        bag.dispose();
        assert_eq!(a.get(), 1);
        assert_eq!(b.get(), 1);
        assert!(bag.is_empty());
        assert!(bag.is_disposed());
    }

    #[test]
    fn add_to_disposed_bag_disposes_immediately() {
        let bag = DisposableBag::new();
        bag.dispose();

        let (count, disposable) = counting();
        bag.add(disposable);
        assert_eq!(count.get(), 1);
        assert!(bag.is_empty());
    }

    #[test]
    fn bag_drop_disposes_members() {
        let (count, disposable) = counting();
        {
            let bag = DisposableBag::new();
            bag.add(disposable);
        }
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn cleanup_may_dispose_another_disposable() {
        let bag = Rc::new(DisposableBag::new());
        let (sibling_count, sibling) = counting();
        let sibling = Rc::new(sibling);
        let sibling_clone = Rc::clone(&sibling);
        bag.add(Disposable::new(move || sibling_clone.dispose()));

        bag.dispose();
        assert_eq!(sibling_count.get(), 1);
        assert!(sibling.is_disposed());
    }

    #[test]
    fn debug_format() {
        let bag = DisposableBag::new();
        bag.add(Disposable::empty());
        let dbg = format!("{bag:?}");
        assert!(dbg.contains("DisposableBag"));
        assert!(dbg.contains("len: 1"));
    }
}
