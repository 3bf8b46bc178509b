#![forbid(unsafe_code)]

//! E2E tests for data source reconciliation against a recording view.
//!
//! 1. `incoming` – model changes become targeted view calls
//! 2. `user_edits` – delete/move write back once with no echo
//! 3. `selection` – view selection follows the selections observable
//! 4. `cells` – cell dequeue and setup, misconfiguration faults
//! 5. `lifecycle` – dropped views, dropped observables, logging

use std::cell::RefCell;
use std::rc::Rc;

use bindery_core::{Observable, Subscribable, SubscriptionOptions};
use bindery_harness::{RecordingView, ViewCall, capture_tracing};
use bindery_source::{DataSource, DataSourceConfig, IndexPath, ReconcileState};

type Bound = (
    Observable<Vec<&'static str>>,
    Rc<RecordingView>,
    DataSource<&'static str, RecordingView>,
);

/// Bind `items` to a fresh recording view and clear the initial reload.
fn bound(items: &[&'static str]) -> Bound {
    let obs = Observable::new(items.to_vec());
    let view = Rc::new(RecordingView::new());
    let source = DataSource::new(&obs, &view);
    view.take_calls();
    (obs, view, source)
}

fn p(item: usize) -> IndexPath {
    IndexPath::item(item)
}

mod incoming {
    use super::*;

    #[test]
    fn initial_bind_reloads() {
        let obs = Observable::new(vec!["a"]);
        let view = Rc::new(RecordingView::new());
        let _source = DataSource::new(&obs, &view);
        assert_eq!(view.calls(), vec![ViewCall::ReloadData]);
    }

    #[test]
    fn append_inserts_rows_at_end() {
        let (obs, view, source) = bound(&["a", "b"]);
        obs.modify(|v| v.extend(["c", "d"]));
        assert_eq!(view.take_calls(), vec![ViewCall::InsertItems(vec![p(2), p(3)])]);
        assert_eq!(source.number_of_items(0), 4);
    }

    #[test]
    fn interior_removal_deletes_rows() {
        let (obs, view, source) = bound(&["a", "b", "c", "d", "e"]);
        obs.set(vec!["a", "e"]);
        assert_eq!(
            view.take_calls(),
            vec![ViewCall::DeleteItems(vec![p(1), p(2), p(3)])]
        );
        assert_eq!(source.items(), vec!["a", "e"]);
    }

    #[test]
    fn normalizing_subscriber_ahead_of_source_leaves_view_sorted() {
        let obs = Observable::new(vec!["a", "c"]);
        let writer = obs.clone();
        let _sort = obs.subscribe(SubscriptionOptions::new(), move |v| {
            if !v.is_sorted() {
                writer.modify(|v| v.sort_unstable());
            }
        });
        let view = Rc::new(RecordingView::new());
        let source = DataSource::new(&obs, &view);
        view.take_calls();

        obs.modify(|v| v.push("b"));
        assert_eq!(obs.get(), vec!["a", "b", "c"]);
        assert_eq!(source.items(), obs.get());
        assert_eq!(
            view.take_calls(),
            vec![
                ViewCall::InsertItems(vec![p(2)]),
                ViewCall::BeginUpdates,
                ViewCall::DeleteItems(vec![p(1), p(2)]),
                ViewCall::InsertItems(vec![p(1), p(2)]),
                ViewCall::EndUpdates,
            ]
        );
    }

    #[test]
    fn replacement_is_grouped_update() {
        let (obs, view, _source) = bound(&["a", "b", "c"]);
        obs.set(vec!["a", "x", "y", "z", "c"]);
        assert_eq!(
            view.take_calls(),
            vec![
                ViewCall::BeginUpdates,
                ViewCall::DeleteItems(vec![p(1)]),
                ViewCall::InsertItems(vec![p(1), p(2), p(3)]),
                ViewCall::EndUpdates,
            ]
        );
    }

    #[test]
    fn unrelated_contents_reload() {
        let (obs, view, _source) = bound(&["a", "b"]);
        obs.set(vec!["x", "y"]);
        assert_eq!(view.take_calls(), vec![ViewCall::ReloadData]);
    }

    #[test]
    fn equal_write_issues_nothing() {
        let (obs, view, _source) = bound(&["a"]);
        obs.set(vec!["a"]);
        obs.modify(|v| v.sort());
        assert!(view.take_calls().is_empty());
    }

    #[test]
    fn state_returns_to_idle_after_each_change() {
        let (obs, _view, source) = bound(&["a"]);
        obs.modify(|v| v.push("b"));
        assert_eq!(source.state(), ReconcileState::Idle);
        source.delete(p(0));
        assert_eq!(source.state(), ReconcileState::Idle);
    }
}

mod user_edits {
    use super::*;

    #[test]
    fn delete_mutates_once_with_no_view_calls() {
        let (obs, view, source) = bound(&["a", "b", "c"]);
        let mutations = Rc::new(RefCell::new(Vec::new()));
        let m = Rc::clone(&mutations);
        let _watch = obs.subscribe(
            SubscriptionOptions::default().notify_on_subscribe(false),
            move |v| m.borrow_mut().push(v.clone()),
        );

        source.delete(p(0));
        assert_eq!(*mutations.borrow(), vec![vec!["b", "c"]]);
        assert_eq!(obs.version(), 1);
        assert_eq!(view.row_update_count(), 0);
        assert!(view.take_calls().is_empty());
        assert_eq!(source.items(), obs.get());
    }

    #[test]
    fn move_mutates_once_with_no_view_calls() {
        let (obs, view, source) = bound(&["a", "b", "c", "d"]);
        source.move_item(p(3), p(1));
        assert_eq!(obs.get(), vec!["a", "d", "b", "c"]);
        assert_eq!(obs.version(), 1);
        assert!(view.take_calls().is_empty());
        assert_eq!(source.items(), obs.get());
    }

    #[test]
    fn move_to_same_place_does_not_mutate() {
        let (obs, _view, source) = bound(&["a", "b"]);
        source.move_item(p(1), p(1));
        assert_eq!(obs.version(), 0);
    }

    #[test]
    fn model_changes_after_edit_still_reconcile() {
        let (obs, view, source) = bound(&["a", "b", "c"]);
        source.delete(p(1));
        obs.modify(|v| v.push("d"));
        assert_eq!(view.take_calls(), vec![ViewCall::InsertItems(vec![p(2)])]);
        assert_eq!(source.items(), vec!["a", "c", "d"]);
    }

    #[test]
    fn other_sources_bound_to_same_observable_see_the_edit() {
        let obs = Observable::new(vec!["a", "b"]);
        let editor_view = Rc::new(RecordingView::new());
        let mirror_view = Rc::new(RecordingView::new());
        let editor = DataSource::new(&obs, &editor_view);
        let mirror = DataSource::read_only(&obs, &mirror_view);
        editor_view.take_calls();
        mirror_view.take_calls();

        editor.delete(p(0));
        assert!(editor_view.take_calls().is_empty());
        assert_eq!(mirror_view.take_calls(), vec![ViewCall::DeleteItems(vec![p(0)])]);
        assert_eq!(mirror.items(), vec!["b"]);
    }

    #[test]
    #[should_panic(expected = "data source is not editable")]
    fn editing_read_only_source_panics() {
        let obs = Observable::new(vec!["a"]);
        let view = Rc::new(RecordingView::new());
        let source = DataSource::read_only(&obs, &view);
        source.move_item(p(0), p(0));
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn deleting_past_the_end_panics() {
        let (_obs, _view, source) = bound(&["a"]);
        source.delete(p(5));
    }
}

mod selection {
    use super::*;

    #[test]
    fn reconciles_only_the_difference() {
        // View shows {A, C}; the model expects {B, C}.
        let (_obs, view, source) = bound(&["A", "B", "C"]);
        view.user_select(p(0));
        view.user_select(p(2));

        source.set_selections(&Observable::new(vec!["B", "C"]));
        assert_eq!(
            view.take_calls(),
            vec![ViewCall::Deselect(p(0)), ViewCall::Select(p(1))]
        );
        assert_eq!(view.selected(), vec![p(1), p(2)]);
    }

    #[test]
    fn resyncs_when_selections_change() {
        let (_obs, view, source) = bound(&["A", "B", "C"]);
        let selections = Observable::new(Vec::new());
        source.set_selections(&selections);
        assert!(view.take_calls().is_empty());

        selections.set(vec!["C"]);
        assert_eq!(view.take_calls(), vec![ViewCall::Select(p(2))]);
        selections.set(Vec::new());
        assert_eq!(view.take_calls(), vec![ViewCall::Deselect(p(2))]);
    }

    #[test]
    fn items_missing_from_list_are_ignored() {
        let (_obs, view, source) = bound(&["A"]);
        source.set_selections(&Observable::new(vec!["Z"]));
        assert!(view.take_calls().is_empty());
    }

    #[test]
    fn rebinding_selections_drops_old_binding() {
        let (_obs, view, source) = bound(&["A", "B"]);
        let first = Observable::new(vec!["A"]);
        source.set_selections(&first);
        let second = Observable::new(vec!["B"]);
        source.set_selections(&second);
        view.take_calls();

        first.set(vec!["A", "B"]);
        assert!(view.take_calls().is_empty());
        assert_eq!(first.subscriber_count(), 0);
        assert!(source.selections().is_some_and(|s| s.ptr_eq(&second)));
    }

    #[test]
    fn hidden_view_selection_selects_expected_rows() {
        let obs = Observable::new(vec!["A", "B"]);
        let view = Rc::new(RecordingView::without_selection_reporting());
        let source = DataSource::new(&obs, &view);
        view.take_calls();

        source.set_selections(&Observable::new(vec!["B"]));
        assert_eq!(view.take_calls(), vec![ViewCall::Select(p(1))]);
    }

    #[test]
    fn did_select_fires_events_and_deselects() {
        let (_obs, view, source) = bound(&["A", "B"]);
        let selections = Observable::new(Vec::new());
        source.set_selections(&selections);
        let log = Rc::new(RefCell::new(Vec::new()));
        let (ls, ld) = (Rc::clone(&log), Rc::clone(&log));
        let _s = source.on_select().subscribe(SubscriptionOptions::default(), move |i| {
            ls.borrow_mut().push(format!("+{i}"))
        });
        let _d = source.on_deselect().subscribe(SubscriptionOptions::default(), move |i| {
            ld.borrow_mut().push(format!("-{i}"))
        });

        view.user_select(p(0));
        source.did_select(p(0));
        assert_eq!(*log.borrow(), vec!["+A", "-A"]);
        assert!(selections.get().is_empty());
        assert_eq!(view.take_calls(), vec![ViewCall::Deselect(p(0))]);
        assert!(view.selected().is_empty());
    }

    #[test]
    fn did_select_without_deselect_keeps_row_selected() {
        let obs = Observable::new(vec!["A", "B"]);
        let view = Rc::new(RecordingView::new());
        let source = DataSource::new(&obs, &view).with_config(DataSourceConfig {
            deselect_on_selection: false,
            ..DataSourceConfig::default()
        });
        let selections = Observable::new(Vec::new());
        source.set_selections(&selections);
        view.take_calls();

        view.user_select(p(1));
        source.did_select(p(1));
        assert_eq!(selections.get(), vec!["B"]);
        assert!(view.take_calls().is_empty());
        assert_eq!(view.selected(), vec![p(1)]);
    }
}

mod cells {
    use super::*;

    #[test]
    fn cell_setup_fills_dequeued_cell() {
        let (_obs, view, source) = bound(&["Ada", "Grace"]);
        source.use_cell("Person", |name, cell| cell.text = name.to_uppercase());
        let cell = source.cell_at(p(1));
        assert_eq!(cell.text, "GRACE");
        assert_eq!(cell.path, p(1));
        assert_eq!(
            view.take_calls(),
            vec![ViewCall::DequeueCell {
                reuse_identifier: "Person".into(),
                path: p(1)
            }]
        );
    }

    #[test]
    #[should_panic(expected = "cell requested before use_cell")]
    fn cell_without_setup_panics() {
        let (_obs, _view, source) = bound(&["a"]);
        let _ = source.cell_at(p(0));
    }

    #[test]
    fn can_edit_and_move_follow_config() {
        let obs = Observable::new(vec!["a"]);
        let view = Rc::new(RecordingView::new());
        let source = DataSource::new(&obs, &view).with_config(DataSourceConfig {
            allows_deletion: true,
            ..DataSourceConfig::default()
        });
        assert!(source.can_edit(p(0)));
        assert!(!source.can_move(p(0)));
        assert!(!source.can_edit(p(1)));
    }
}

mod lifecycle {
    use super::*;

    #[test]
    fn dropped_view_makes_changes_silent() {
        let (obs, view, source) = bound(&["a"]);
        drop(view);
        obs.modify(|v| v.push("b"));
        source.sync_selections();
        assert_eq!(source.items(), vec!["a", "b"]);
    }

    #[test]
    fn dropping_source_unsubscribes() {
        let (obs, _view, source) = bound(&["a"]);
        let selections = Observable::new(vec!["a"]);
        source.set_selections(&selections);
        assert_eq!(obs.subscriber_count(), 1);
        drop(source);
        assert_eq!(obs.subscriber_count(), 0);
        assert_eq!(selections.subscriber_count(), 0);
    }

    #[test]
    fn edit_against_dropped_observable_warns() {
        let (obs, _view, source) = bound(&["a"]);
        drop(obs);
        let captured = capture_tracing(|| source.delete(p(0)));
        assert!(captured.has_message("observable dropped"));
        assert_eq!(source.items(), vec!["a"]);
    }

    #[test]
    fn incoming_change_logs_kind() {
        let (obs, _view, _source) = bound(&["a"]);
        let captured = capture_tracing(|| obs.modify(|v| v.push("b")));
        assert!(captured.events.iter().any(|e| {
            e.message() == Some("applying incoming change")
                && e.fields.get("kind").map(String::as_str) == Some("insert")
        }));
    }
}
