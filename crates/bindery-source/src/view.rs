#![forbid(unsafe_code)]

//! The capability set a list widget exposes to a [`DataSource`](crate::DataSource).
//!
//! Adapters for concrete toolkits implement [`DataSourceView`]. Only
//! `reload_data`, selection access and cell dequeuing are required; the
//! targeted update calls fall back to a full reload so a minimal adapter is
//! always correct, just not animated.

use crate::index_path::IndexPath;

pub trait DataSourceView {
    /// Handle to a reusable cell, configured by the data source's cell setup.
    type Cell;

    /// Re-read every row.
    fn reload_data(&self);

    /// Rows currently selected in the widget, or `None` if the widget does
    /// not report selection.
    fn selected_index_paths(&self) -> Option<Vec<IndexPath>>;

    fn select(&self, path: IndexPath);

    fn deselect(&self, path: IndexPath);

    /// Obtain a cell for `path`, reusing one registered under
    /// `reuse_identifier` when possible.
    fn dequeue_cell(&self, reuse_identifier: &str, path: IndexPath) -> Self::Cell;

    /// Rows were inserted at `paths` (already present in the data source).
    fn insert_items(&self, paths: &[IndexPath]) {
        let _ = paths;
        self.reload_data();
    }

    /// Rows at `paths` were removed (already gone from the data source).
    fn delete_items(&self, paths: &[IndexPath]) {
        let _ = paths;
        self.reload_data();
    }

    /// Start grouping the following insert/delete calls into one animation.
    fn begin_updates(&self) {}

    fn end_updates(&self) {}
}
