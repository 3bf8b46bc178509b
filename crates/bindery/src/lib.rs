#![forbid(unsafe_code)]

//! Bindery public facade crate.
//!
//! Re-exports the observable core and the data source layer, and offers a
//! prelude for day-to-day use.
//!
//! ```rust,ignore
//! use bindery::prelude::*;
//!
//! let names = Observable::new(vec!["Ada", "Grace"]);
//! let _sub = names.subscribe_array(SubscriptionOptions::default(), |items, change| {
//!     println!("{} items after {}", items.len(), change.kind().as_str());
//! });
//! names.modify(|v| v.push("Edsger")); // "3 items after insert"
//! ```

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use bindery_core::{
    ArrayChange, BatchScope, ChangeKind, DeferredScheduler, DispatchTiming, Disposable,
    DisposableBag, DisposeToken, Event, ImmediateScheduler, Observable, Scheduler, Subscribable,
    SubscribableArray, SubscriptionCollection, SubscriptionOptions, WeakObservable, batch,
    compute_change, is_batching,
};

// --- Data source re-exports -----------------------------------------------

pub use bindery_source::{
    ConfigError, DataSource, DataSourceConfig, DataSourceError, DataSourceView, IndexPath,
    ReconcileState,
};

pub use bindery_core::logging;

// --- Errors ---------------------------------------------------------------

/// Top-level error type for Bindery.
#[derive(Debug)]
pub enum Error {
    /// A data source was misused.
    DataSource(DataSourceError),
    /// A data source config could not be loaded.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataSource(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DataSource(err) => Some(err),
            Self::Config(err) => Some(err),
        }
    }
}

impl From<DataSourceError> for Error {
    fn from(err: DataSourceError) -> Self {
        Self::DataSource(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

/// Standard result type for Bindery APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        ArrayChange, BatchScope, DataSource, DataSourceConfig, DataSourceView, DispatchTiming,
        Disposable, DisposableBag, Error, Event, IndexPath, Observable, Result, Scheduler,
        Subscribable, SubscribableArray, SubscriptionOptions, batch,
    };

    pub use crate::{core, source};
}

pub use bindery_core as core;
pub use bindery_source as source;
