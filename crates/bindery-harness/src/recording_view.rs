#![forbid(unsafe_code)]

//! A list widget stand-in that records what a data source asks of it.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;

use bindery_source::{DataSourceView, IndexPath};

/// One call made on a [`RecordingView`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewCall {
    ReloadData,
    InsertItems(Vec<IndexPath>),
    DeleteItems(Vec<IndexPath>),
    BeginUpdates,
    EndUpdates,
    Select(IndexPath),
    Deselect(IndexPath),
    DequeueCell {
        reuse_identifier: String,
        path: IndexPath,
    },
}

impl ViewCall {
    /// Whether the call changes which rows exist.
    #[must_use]
    pub fn is_row_update(&self) -> bool {
        matches!(
            self,
            Self::ReloadData | Self::InsertItems(_) | Self::DeleteItems(_)
        )
    }
}

/// Cell handle returned by [`RecordingView::dequeue_cell`]; a cell setup
/// fills `text`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordedCell {
    pub reuse_identifier: String,
    pub path: IndexPath,
    pub text: String,
}

/// Records every [`DataSourceView`] call in order.
///
/// `select`/`deselect` update the tracked selection, as a real widget
/// would. [`user_select`](Self::user_select) changes the selection without
/// logging a call, the way a tap does before the widget reports it.
#[derive(Debug)]
pub struct RecordingView {
    calls: RefCell<Vec<ViewCall>>,
    selected: RefCell<BTreeSet<IndexPath>>,
    reports_selection: Cell<bool>,
}

impl Default for RecordingView {
    fn default() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            selected: RefCell::new(BTreeSet::new()),
            reports_selection: Cell::new(true),
        }
    }
}

impl RecordingView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A view whose `selected_index_paths` returns `None`.
    #[must_use]
    pub fn without_selection_reporting() -> Self {
        let view = Self::default();
        view.reports_selection.set(false);
        view
    }

    #[must_use]
    pub fn calls(&self) -> Vec<ViewCall> {
        self.calls.borrow().clone()
    }

    /// Return the recorded calls and start a fresh log.
    pub fn take_calls(&self) -> Vec<ViewCall> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }

    /// Number of recorded calls that change which rows exist.
    #[must_use]
    pub fn row_update_count(&self) -> usize {
        self.calls.borrow().iter().filter(|c| c.is_row_update()).count()
    }

    pub fn user_select(&self, path: IndexPath) {
        self.selected.borrow_mut().insert(path);
    }

    pub fn user_deselect(&self, path: IndexPath) {
        self.selected.borrow_mut().remove(&path);
    }

    /// Currently selected rows, in order.
    #[must_use]
    pub fn selected(&self) -> Vec<IndexPath> {
        self.selected.borrow().iter().copied().collect()
    }

    fn record(&self, call: ViewCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl DataSourceView for RecordingView {
    type Cell = RecordedCell;

    fn reload_data(&self) {
        self.record(ViewCall::ReloadData);
    }

    fn selected_index_paths(&self) -> Option<Vec<IndexPath>> {
        self.reports_selection.get().then(|| self.selected())
    }

    fn select(&self, path: IndexPath) {
        self.selected.borrow_mut().insert(path);
        self.record(ViewCall::Select(path));
    }

    fn deselect(&self, path: IndexPath) {
        self.selected.borrow_mut().remove(&path);
        self.record(ViewCall::Deselect(path));
    }

    fn dequeue_cell(&self, reuse_identifier: &str, path: IndexPath) -> RecordedCell {
        self.record(ViewCall::DequeueCell {
            reuse_identifier: reuse_identifier.to_owned(),
            path,
        });
        RecordedCell {
            reuse_identifier: reuse_identifier.to_owned(),
            path,
            text: String::new(),
        }
    }

    fn insert_items(&self, paths: &[IndexPath]) {
        self.record(ViewCall::InsertItems(paths.to_vec()));
    }

    fn delete_items(&self, paths: &[IndexPath]) {
        self.record(ViewCall::DeleteItems(paths.to_vec()));
    }

    fn begin_updates(&self) {
        self.record(ViewCall::BeginUpdates);
    }

    fn end_updates(&self) {
        self.record(ViewCall::EndUpdates);
    }
}
