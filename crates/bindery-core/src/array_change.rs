#![forbid(unsafe_code)]

//! Array diffing by boundary trimming.
//!
//! [`compute_change`] describes how an old ordered sequence became a new one
//! as a single [`ArrayChange`]. Detection runs cheapest case first:
//!
//! 1. Equal sequences produce no change at all.
//! 2. `new` extends `old` at the end: `Insert` at `old.len()`.
//! 3. Otherwise the longest common prefix is trimmed, then the longest
//!    common suffix of what remains. What is left in the middle decides the
//!    variant: only new elements → `Insert`; only old elements → `Remove`;
//!    both, with some common boundary → `Replace`; no common boundary at all →
//!    `Set`.
//!
//! # Approximation
//!
//! This is **not** an LCS/Myers diff. Interior moves and swaps are reported
//! as a `Replace` spanning everything between the first and last differing
//! positions, and a swap of the first and last elements degrades to a full
//! `Set`. Consumers get a correct but not always minimal edit, which keeps
//! the diff O(n) with no allocation beyond the reported elements.
//!
//! # Invariants
//!
//! 1. `change.apply(&mut old)` leaves `old == new`.
//! 2. `compute_change(x, x)` is `None`.
//! 3. Prefix trimming is maximal; suffix trimming never overlaps the prefix.

use std::ops::Range;

/// How one ordered sequence became another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayChange<T> {
    /// The whole contents were replaced.
    Set { elements: Vec<T> },
    /// `elements` were inserted starting at `index`.
    Insert { index: usize, elements: Vec<T> },
    /// The elements in `range` of the old sequence were removed.
    Remove { range: Range<usize>, removed: Vec<T> },
    /// The elements in `range` of the old sequence were replaced by
    /// `elements` (which may have a different length).
    Replace {
        range: Range<usize>,
        removed: Vec<T>,
        elements: Vec<T>,
    },
}

/// Variant tag of an [`ArrayChange`], for logging and dispatch tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Set,
    Insert,
    Remove,
    Replace,
}

impl ChangeKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Insert => "insert",
            Self::Remove => "remove",
            Self::Replace => "replace",
        }
    }
}

impl<T> ArrayChange<T> {
    #[must_use]
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Set { .. } => ChangeKind::Set,
            Self::Insert { .. } => ChangeKind::Insert,
            Self::Remove { .. } => ChangeKind::Remove,
            Self::Replace { .. } => ChangeKind::Replace,
        }
    }

    /// Whether this is an insertion at the end of a sequence that had
    /// `old_len` elements.
    #[must_use]
    pub fn is_append(&self, old_len: usize) -> bool {
        matches!(self, Self::Insert { index, .. } if *index == old_len)
    }
}

impl<T: Clone> ArrayChange<T> {
    /// Apply this change to `target`, which must be the old sequence the
    /// change was computed from.
    ///
    /// # Panics
    ///
    /// Panics if an index or range lies outside `target`.
    pub fn apply(&self, target: &mut Vec<T>) {
        match self {
            Self::Set { elements } => {
                target.clear();
                target.extend_from_slice(elements);
            }
            Self::Insert { index, elements } => {
                target.splice(*index..*index, elements.iter().cloned());
            }
            Self::Remove { range, .. } => {
                target.drain(range.clone());
            }
            Self::Replace {
                range, elements, ..
            } => {
                target.splice(range.clone(), elements.iter().cloned());
            }
        }
    }
}

/// Compute the change that turns `old` into `new`.
///
/// Returns `None` when the sequences are element-wise equal.
#[must_use]
pub fn compute_change<T: Clone + PartialEq>(old: &[T], new: &[T]) -> Option<ArrayChange<T>> {
    if old == new {
        return None;
    }

    // Append is the common case for growing lists; skip the suffix scan.
    if new.len() > old.len() && new.starts_with(old) {
        return Some(ArrayChange::Insert {
            index: old.len(),
            elements: new[old.len()..].to_vec(),
        });
    }

    let prefix = common_prefix_len(old, new);
    let max_suffix = old.len().min(new.len()) - prefix;
    let suffix = common_suffix_len(&old[prefix..], &new[prefix..]).min(max_suffix);

    let old_mid = prefix..old.len() - suffix;
    let new_mid = prefix..new.len() - suffix;

    let change = if old_mid.is_empty() {
        ArrayChange::Insert {
            index: prefix,
            elements: new[new_mid].to_vec(),
        }
    } else if new_mid.is_empty() {
        ArrayChange::Remove {
            removed: old[old_mid.clone()].to_vec(),
            range: old_mid,
        }
    } else if prefix == 0 && suffix == 0 {
        ArrayChange::Set {
            elements: new.to_vec(),
        }
    } else {
        ArrayChange::Replace {
            removed: old[old_mid.clone()].to_vec(),
            elements: new[new_mid].to_vec(),
            range: old_mid,
        }
    };
    Some(change)
}

fn common_prefix_len<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

fn common_suffix_len<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}
