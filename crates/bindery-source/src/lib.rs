#![forbid(unsafe_code)]

//! List and table reconciliation for Bindery observables.
//!
//! A [`DataSource`] subscribes to a `Vec<Item>` source, keeps a cached copy
//! of the items, and turns every change into the smallest set of calls on a
//! [`DataSourceView`]. Edits that start in the widget (delete, move) are
//! written back to the observable without being echoed to the view again.
//!
//! ```rust,ignore
//! let contacts = Observable::new(vec!["Ada", "Grace"]);
//! let source = DataSource::new(&contacts, &table_view);
//! source.use_cell("Contact", |name, cell| cell.set_title(name));
//!
//! contacts.modify(|v| v.push("Edsger")); // table_view.insert_items([0.2])
//! source.delete(IndexPath::item(0));     // contacts == ["Grace", "Edsger"]
//! ```

pub mod config;
pub mod data_source;
pub mod error;
pub mod index_path;
pub mod view;

pub use config::{ConfigError, DEFAULT_REUSE_IDENTIFIER, DataSourceConfig};
pub use data_source::{DataSource, ReconcileState};
pub use error::DataSourceError;
pub use index_path::IndexPath;
pub use view::DataSourceView;
