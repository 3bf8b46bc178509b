#![forbid(unsafe_code)]

//! Test doubles shared by the Bindery test suites.
//!
//! - [`RecordingView`]: a [`DataSourceView`](bindery_source::DataSourceView)
//!   that logs every call and tracks its own selection.
//! - [`ManualScheduler`] / [`CountingScheduler`]: schedulers whose run order
//!   and call count a test controls or inspects.
//! - [`capture_tracing`]: collect the spans and events emitted by a closure.

pub mod recording_view;
pub mod schedulers;
pub mod trace_capture;

pub use recording_view::{RecordedCell, RecordingView, ViewCall};
pub use schedulers::{CountingScheduler, ManualScheduler};
pub use trace_capture::{Captured, CapturedEvent, CapturedSpan, capture_tracing};
