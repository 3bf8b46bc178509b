#![forbid(unsafe_code)]

//! Bindery core: observable values, diffing subscriptions, and disposal.
//!
//! # Role in Bindery
//! `bindery-core` is the propagation engine. Model code owns
//! [`Observable`] values; consumers register callbacks through the
//! [`Subscribable`] contract and receive `(old, new)` pairs, or for
//! collections an [`ArrayChange`] describing how the old sequence became the
//! new one. `bindery-source` builds list/table reconciliation on top.
//!
//! # Key Components
//!
//! - [`Disposable`] / [`DisposableBag`] - scoped subscription lifetimes
//! - [`Scheduler`] - pluggable "where does the callback run" policy
//! - [`Observable`] - shared value cell that notifies on change
//! - [`SubscriptionCollection`] - ordered subscriber list with delivery rules
//! - [`BatchScope`] - defers [`DispatchTiming::AfterChange`] deliveries
//! - [`compute_change`] - prefix/suffix trimming array diff
//! - [`Event`] - fire-and-forget notifications
//!
//! # Threading
//! Everything here is single-threaded (`Rc`/`RefCell`). Writes to one
//! observable must be serialized by the caller; a [`Scheduler`] is the only
//! way to move delivery elsewhere.

pub mod array_change;
pub mod batch;
pub mod disposable;
pub mod event;
pub mod logging;
pub mod observable;
pub mod scheduler;
pub mod subscribable;
pub mod subscription;

pub use array_change::{ArrayChange, ChangeKind, compute_change};
pub use batch::{BatchScope, batch, is_batching};
pub use disposable::{Disposable, DisposableBag, DisposeToken};
pub use event::Event;
pub use observable::{Observable, WeakObservable};
pub use scheduler::{DeferredScheduler, ImmediateScheduler, Scheduler};
pub use subscribable::{Subscribable, SubscribableArray};
pub use subscription::{DispatchTiming, SubscriptionCollection, SubscriptionOptions};
