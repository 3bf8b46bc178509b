#![forbid(unsafe_code)]

//! Misconfiguration faults raised by [`DataSource`](crate::DataSource).

use std::fmt;

use crate::index_path::IndexPath;

/// A [`DataSource`](crate::DataSource) was used in a way its setup does not
/// allow.
///
/// The panicking methods on `DataSource` panic with this error's `Display`
/// text; the `try_*` methods return it instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSourceError {
    /// A cell was requested before `use_cell` registered a setup.
    CellNotConfigured,
    /// An edit was requested on a source bound read-only.
    NotEditable,
    /// The item index is past the end of the current items.
    IndexOutOfBounds { path: IndexPath, len: usize },
    /// Only section 0 exists.
    SectionOutOfBounds { section: usize },
    /// The view was dropped before a cell could be dequeued from it.
    ViewDropped,
    /// An edit found the cached items and the observable at different
    /// lengths, so the index path could not address both.
    OutOfSync { cached: usize, observed: usize },
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CellNotConfigured => {
                write!(f, "cell requested before use_cell registered a setup")
            }
            Self::NotEditable => write!(f, "data source is not editable"),
            Self::IndexOutOfBounds { path, len } => {
                write!(f, "index path {path} out of bounds for {len} items")
            }
            Self::SectionOutOfBounds { section } => {
                write!(f, "section {section} out of bounds (only section 0 exists)")
            }
            Self::ViewDropped => write!(f, "view dropped"),
            Self::OutOfSync { cached, observed } => write!(
                f,
                "cached {cached} items but the observable holds {observed}"
            ),
        }
    }
}

impl std::error::Error for DataSourceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            DataSourceError::NotEditable.to_string(),
            "data source is not editable"
        );
        let err = DataSourceError::IndexOutOfBounds {
            path: IndexPath::item(4),
            len: 2,
        };
        assert_eq!(err.to_string(), "index path 0.4 out of bounds for 2 items");
        assert!(
            DataSourceError::SectionOutOfBounds { section: 3 }
                .to_string()
                .contains("section 3")
        );
        assert_eq!(
            DataSourceError::OutOfSync {
                cached: 2,
                observed: 3
            }
            .to_string(),
            "cached 2 items but the observable holds 3"
        );
    }

    #[test]
    fn is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(DataSourceError::CellNotConfigured);
        assert!(err.source().is_none());
    }
}
