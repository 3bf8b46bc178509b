//! Property-based tests for data source reconciliation.
//!
//! 1. After any mix of model writes and user edits, the cached items equal
//!    the observable's value.
//! 2. The row count implied by the view calls always equals the item count.
//! 3. User edits never produce row updates on the editing view.

use std::rc::Rc;

use bindery_core::Observable;
use bindery_harness::{RecordingView, ViewCall};
use bindery_source::{DataSource, IndexPath};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Write(Vec<u8>),
    Delete(prop::sample::Index),
    Move(prop::sample::Index, prop::sample::Index),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        prop::collection::vec(0u8..5, 0..12).prop_map(Op::Write),
        any::<prop::sample::Index>().prop_map(Op::Delete),
        (any::<prop::sample::Index>(), any::<prop::sample::Index>())
            .prop_map(|(a, b)| Op::Move(a, b)),
    ]
}

/// Row count a widget would show after replaying `calls`.
fn replay_rows(mut rows: usize, calls: &[ViewCall], reload_len: usize) -> usize {
    for call in calls {
        match call {
            ViewCall::ReloadData => rows = reload_len,
            ViewCall::InsertItems(paths) => rows += paths.len(),
            ViewCall::DeleteItems(paths) => rows -= paths.len(),
            _ => {}
        }
    }
    rows
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn cache_and_view_track_the_model(
        initial in prop::collection::vec(0u8..5, 0..12),
        ops in prop::collection::vec(op_strategy(), 0..25),
    ) {
        let obs = Observable::new(initial.clone());
        let view = Rc::new(RecordingView::new());
        let source = DataSource::new(&obs, &view);
        let mut rows = replay_rows(0, &view.take_calls(), initial.len());

        for op in ops {
            let len = source.number_of_items(0);
            match op {
                Op::Write(next) => {
                    obs.set(next);
                    rows = replay_rows(rows, &view.take_calls(), obs.with(Vec::len));
                }
                Op::Delete(_) | Op::Move(..) if len == 0 => continue,
                Op::Delete(at) => {
                    source.delete(IndexPath::item(at.index(len)));
                    rows -= 1;
                    prop_assert_eq!(view.row_update_count(), 0);
                }
                Op::Move(from, to) => {
                    source.move_item(IndexPath::item(from.index(len)), IndexPath::item(to.index(len)));
                    prop_assert_eq!(view.row_update_count(), 0);
                }
            }
            prop_assert_eq!(source.items(), obs.get());
            prop_assert_eq!(rows, source.number_of_items(0));
        }
    }
}
