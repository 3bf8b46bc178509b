#![forbid(unsafe_code)]

//! Mutation batches for [`DispatchTiming::AfterChange`] subscribers.
//!
//! A model that performs several writes as one logical change opens a
//! [`BatchScope`]. Values are stored immediately and `Immediate`
//! subscribers still fire on every write, but `AfterChange` subscribers are
//! held back until the outermost scope ends. Each of them then fires once,
//! with the value from before the first write and the final value.
//!
//! # Usage
//!
//! ```
//! use bindery_core::{BatchScope, DispatchTiming, Observable, Subscribable, SubscriptionOptions};
//!
//! let rows = Observable::new(vec![1, 2]);
//! let opts = SubscriptionOptions::default()
//!     .timing(DispatchTiming::AfterChange)
//!     .notify_on_subscribe(false);
//! let _sub = rows.subscribe(opts, |rows: &Vec<i32>| assert_eq!(rows, &vec![1, 2, 3, 4]));
//!
//! {
//!     let _batch = BatchScope::new();
//!     rows.modify(|r| r.push(3)); // deferred
//!     rows.modify(|r| r.push(4)); // coalesced with the first write
//! } // subscriber fires once here
//! ```
//!
//! # Invariants
//!
//! 1. Nested batches are supported: only the outermost scope flushes.
//! 2. Within a batch, `Observable::get()` always returns the latest value.
//! 3. A deferred subscriber fires at most once per batch.
//! 4. Flush runs deferred callbacks in the order they were first enqueued.
//!
//! # Failure Modes
//!
//! - **Callback panics during flush**: remaining callbacks still run; the
//!   first panic is resumed after all callbacks have been attempted.
//!
//! [`DispatchTiming::AfterChange`]: crate::DispatchTiming::AfterChange

use std::cell::RefCell;
use tracing::debug_span;
use web_time::Instant;

type DeferredNotify = Box<dyn FnOnce()>;

struct DeferredEntry {
    key: u64,
    notify: DeferredNotify,
}

struct BatchContext {
    /// Nesting depth. Only flush when this reaches 0.
    depth: u32,
    deferred: Vec<DeferredEntry>,
}

thread_local! {
    static BATCH_CTX: RefCell<Option<BatchContext>> = const { RefCell::new(None) };
}

/// Returns true if a batch is currently active on this thread.
#[must_use]
pub fn is_batching() -> bool {
    BATCH_CTX.with(|ctx| ctx.borrow().is_some())
}

/// Enqueue `f` under `key` if a batch is active, otherwise run it now.
///
/// A later entry with the same key replaces the queued closure but keeps
/// the original queue position. Returns `true` if the call was deferred.
pub(crate) fn defer_or_run_keyed(key: u64, f: impl FnOnce() + 'static) -> bool {
    BATCH_CTX.with(|ctx| {
        let mut guard = ctx.borrow_mut();
        if let Some(ref mut batch) = *guard {
            if let Some(entry) = batch.deferred.iter_mut().find(|entry| entry.key == key) {
                entry.notify = Box::new(f);
            } else {
                batch.deferred.push(DeferredEntry {
                    key,
                    notify: Box::new(f),
                });
            }
            true
        } else {
            drop(guard); // Release borrow before calling f.
            f();
            false
        }
    })
}

/// Run `f` inside a [`BatchScope`].
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    let _scope = BatchScope::new();
    f()
}

fn flush() {
    let deferred: Vec<DeferredNotify> = BATCH_CTX.with(|ctx| {
        ctx.borrow_mut()
            .as_mut()
            .map(|batch| {
                std::mem::take(&mut batch.deferred)
                    .into_iter()
                    .map(|entry| entry.notify)
                    .collect()
            })
            .unwrap_or_default()
    });

    if deferred.is_empty() {
        return;
    }

    let start = Instant::now();
    let span = debug_span!(
        "batch.flush",
        deferred = deferred.len() as u64,
        duration_us = tracing::field::Empty
    );
    let _enter = span.enter();

    let mut first_panic: Option<Box<dyn std::any::Any + Send>> = None;
    for notify in deferred {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(notify));
        if let Err(payload) = result
            && first_panic.is_none()
        {
            first_panic = Some(payload);
        }
    }

    span.record("duration_us", start.elapsed().as_micros() as u64);

    if let Some(payload) = first_panic {
        std::panic::resume_unwind(payload);
    }
}

/// RAII guard that opens a mutation batch.
///
/// While any `BatchScope` is alive on this thread, `AfterChange`
/// deliveries are deferred. When the outermost scope drops they fire.
pub struct BatchScope {
    is_root: bool,
}

impl BatchScope {
    /// Begin a new batch scope, nesting inside any active one.
    #[must_use]
    pub fn new() -> Self {
        let is_root = BATCH_CTX.with(|ctx| {
            let mut guard = ctx.borrow_mut();
            match *guard {
                Some(ref mut batch) => {
                    batch.depth += 1;
                    false
                }
                None => {
                    *guard = Some(BatchContext {
                        depth: 1,
                        deferred: Vec::new(),
                    });
                    true
                }
            }
        });
        Self { is_root }
    }

    /// Number of deferred deliveries queued in the current batch.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        BATCH_CTX.with(|ctx| ctx.borrow().as_ref().map_or(0, |b| b.deferred.len()))
    }
}

impl Default for BatchScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BatchScope {
    fn drop(&mut self) {
        let should_flush = BATCH_CTX.with(|ctx| {
            let mut guard = ctx.borrow_mut();
            if let Some(ref mut batch) = *guard {
                batch.depth -= 1;
                batch.depth == 0
            } else {
                false
            }
        });

        if should_flush {
            // Clear the context even if a deferred callback panics.
            struct ClearOnExit;
            impl Drop for ClearOnExit {
                fn drop(&mut self) {
                    BATCH_CTX.with(|ctx| *ctx.borrow_mut() = None);
                }
            }
            let _clear = ClearOnExit;
            // Deliveries triggered by deferred callbacks are still batched
            // until the queue is empty.
            while self.pending_count() > 0 {
                flush();
            }
        }
    }
}

impl std::fmt::Debug for BatchScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScope")
            .field("is_root", &self.is_root)
            .field("pending", &self.pending_count())
            .finish()
    }
}
