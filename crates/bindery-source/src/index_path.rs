#![forbid(unsafe_code)]

//! Row addresses.

use std::fmt;

/// Position of one item in a sectioned list.
///
/// Orders by section, then item, so sorted sets of paths walk the list top
/// to bottom.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexPath {
    pub section: usize,
    pub item: usize,
}

impl IndexPath {
    #[must_use]
    pub const fn new(section: usize, item: usize) -> Self {
        Self { section, item }
    }

    /// Path to `item` in section 0.
    #[must_use]
    pub const fn item(item: usize) -> Self {
        Self::new(0, item)
    }
}

impl fmt::Display for IndexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section, self.item)
    }
}
