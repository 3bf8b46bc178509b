#![forbid(unsafe_code)]

//! Reconciliation between an observable item list and a list widget.
//!
//! # Design
//!
//! A [`DataSource`] keeps a cached copy of the items it last showed. Two
//! paths change that cache, never interleaved for the same change:
//!
//! | Path                  | Trigger                      | View calls                       |
//! |-----------------------|------------------------------|----------------------------------|
//! | incoming change       | the bound source notifies    | reload / insert / delete / both  |
//! | user edit             | `delete` / `move_item`       | none; the widget already shows it |
//!
//! A user edit updates the cache first and then writes the observable once,
//! in [`ReconcileState::ApplyingUserEdit`]. The notification that write
//! produces arrives while that state is active and carries exactly the
//! cached contents, so it is recognised as self-caused and dropped. Any other
//! write landing during the edit (say, a subscriber correcting the value) is
//! still reconciled normally.
//!
//! Incoming changes are diffed against the cache rather than the source's
//! previous value, so view calls always describe what the widget currently
//! shows.
//!
//! # Ownership
//!
//! The data source holds the view and the observable weakly. Calls on a
//! dropped view do nothing; edits against a dropped observable are logged
//! and ignored. Dropping the data source disposes its subscriptions.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::ops::Range;
use std::rc::{Rc, Weak};

use bindery_core::{
    ArrayChange, Disposable, DisposableBag, Event, Observable, Subscribable,
    SubscriptionOptions, WeakObservable, compute_change,
};
use tracing::{debug, trace, warn};

use crate::config::DataSourceConfig;
use crate::error::DataSourceError;
use crate::index_path::IndexPath;
use crate::view::DataSourceView;

/// What a [`DataSource`] is doing right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ReconcileState {
    #[default]
    Idle,
    /// Applying a change reported by the bound source.
    ApplyingIncomingDiff,
    /// Writing a view-originated edit back to the observable.
    ApplyingUserEdit,
}

type CellSetup<Item, C> = Box<dyn Fn(&Item, &mut C)>;

struct CellRegistration<Item, C> {
    reuse_identifier: String,
    setup: CellSetup<Item, C>,
}

struct Shared<Item, V: DataSourceView> {
    view: Weak<V>,
    items: RefCell<Vec<Item>>,
    state: Cell<ReconcileState>,
    config: RefCell<DataSourceConfig>,
    selections: RefCell<Option<Observable<Vec<Item>>>>,
    cell: RefCell<Option<CellRegistration<Item, V::Cell>>>,
    on_select: Event<Item>,
    on_deselect: Event<Item>,
}

/// Sets a [`ReconcileState`] and restores the previous one on drop, so a
/// panicking callback cannot leave the source stuck mid-edit.
struct StateGuard<'a> {
    state: &'a Cell<ReconcileState>,
    previous: ReconcileState,
}

impl<'a> StateGuard<'a> {
    fn enter(state: &'a Cell<ReconcileState>, next: ReconcileState) -> Self {
        let previous = state.replace(next);
        Self { state, previous }
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        self.state.set(self.previous);
    }
}

fn paths(range: Range<usize>) -> Vec<IndexPath> {
    range.map(IndexPath::item).collect()
}

impl<Item, V> Shared<Item, V>
where
    Item: Clone + PartialEq + 'static,
    V: DataSourceView + 'static,
{
    fn receive(&self, old: Option<&Vec<Item>>, new: &[Item]) {
        if self.state.get() == ReconcileState::ApplyingUserEdit && *self.items.borrow() == new {
            trace!(items = new.len(), "self-caused change suppressed");
            return;
        }

        let change = match old {
            None => Some(ArrayChange::Set {
                elements: new.to_vec(),
            }),
            Some(_) => compute_change(self.items.borrow().as_slice(), new),
        };
        let Some(change) = change else { return };

        let _state = StateGuard::enter(&self.state, ReconcileState::ApplyingIncomingDiff);
        change.apply(&mut self.items.borrow_mut());
        debug!(
            kind = change.kind().as_str(),
            items = new.len(),
            "applying incoming change"
        );
        if let Some(view) = self.view.upgrade() {
            Self::update_view(&*view, &change);
        }
        self.sync_selections();
    }

    fn update_view(view: &V, change: &ArrayChange<Item>) {
        match change {
            ArrayChange::Set { .. } => view.reload_data(),
            ArrayChange::Insert { index, elements } => {
                view.insert_items(&paths(*index..*index + elements.len()));
            }
            ArrayChange::Remove { range, .. } => view.delete_items(&paths(range.clone())),
            ArrayChange::Replace {
                range, elements, ..
            } => {
                view.begin_updates();
                view.delete_items(&paths(range.clone()));
                view.insert_items(&paths(range.start..range.start + elements.len()));
                view.end_updates();
            }
        }
    }

    fn sync_selections(&self) {
        let Some(view) = self.view.upgrade() else {
            return;
        };
        let Some(selections) = self.selections.borrow().clone() else {
            return;
        };

        let current: BTreeSet<IndexPath> = view
            .selected_index_paths()
            .unwrap_or_default()
            .into_iter()
            .collect();
        let expected: BTreeSet<IndexPath> = {
            let items = self.items.borrow();
            selections.with(|selected| {
                selected
                    .iter()
                    .filter_map(|wanted| items.iter().position(|item| item == wanted))
                    .map(IndexPath::item)
                    .collect()
            })
        };

        for path in current.difference(&expected) {
            view.deselect(*path);
        }
        for path in expected.difference(&current) {
            view.select(*path);
        }
        trace!(
            current = current.len(),
            expected = expected.len(),
            "selections synced"
        );
    }

    fn check(&self, path: IndexPath) -> Result<(), DataSourceError> {
        if path.section != 0 {
            return Err(DataSourceError::SectionOutOfBounds {
                section: path.section,
            });
        }
        let len = self.items.borrow().len();
        if path.item >= len {
            return Err(DataSourceError::IndexOutOfBounds { path, len });
        }
        Ok(())
    }
}

/// Binds a `Vec<Item>` source to a [`DataSourceView`].
pub struct DataSource<Item, V: DataSourceView> {
    shared: Rc<Shared<Item, V>>,
    /// `None` when bound read-only.
    observable: Option<WeakObservable<Vec<Item>>>,
    subscriptions: DisposableBag,
    selection_subscription: RefCell<Disposable>,
}

impl<Item, V> DataSource<Item, V>
where
    Item: Clone + PartialEq + 'static,
    V: DataSourceView + 'static,
{
    /// Bind an observable the view may edit through [`delete`](Self::delete)
    /// and [`move_item`](Self::move_item).
    ///
    /// The current contents are delivered right away as a full reload.
    pub fn new(observable: &Observable<Vec<Item>>, view: &Rc<V>) -> Self {
        Self::bind(observable, Some(observable.downgrade()), view)
    }

    /// Bind any subscribable list. Edits are programmer errors.
    pub fn read_only<S>(source: &S, view: &Rc<V>) -> Self
    where
        S: Subscribable<Value = Vec<Item>>,
    {
        Self::bind(source, None, view)
    }

    fn bind<S>(source: &S, observable: Option<WeakObservable<Vec<Item>>>, view: &Rc<V>) -> Self
    where
        S: Subscribable<Value = Vec<Item>>,
    {
        let shared = Rc::new(Shared {
            view: Rc::downgrade(view),
            items: RefCell::new(Vec::new()),
            state: Cell::new(ReconcileState::Idle),
            config: RefCell::new(DataSourceConfig::default()),
            selections: RefCell::new(None),
            cell: RefCell::new(None),
            on_select: Event::new(),
            on_deselect: Event::new(),
        });

        let subscriptions = DisposableBag::new();
        let weak = Rc::downgrade(&shared);
        source
            .subscribe_diff(SubscriptionOptions::default(), move |old, new| {
                if let Some(shared) = weak.upgrade() {
                    shared.receive(old, new);
                }
            })
            .add_to(&subscriptions);

        Self {
            shared,
            observable,
            subscriptions,
            selection_subscription: RefCell::new(Disposable::empty()),
        }
    }

    #[must_use]
    pub fn with_config(self, config: DataSourceConfig) -> Self {
        *self.shared.config.borrow_mut() = config;
        self
    }

    #[must_use]
    pub fn config(&self) -> DataSourceConfig {
        self.shared.config.borrow().clone()
    }

    /// Whether view-originated edits can be written back.
    #[must_use]
    pub fn editable(&self) -> bool {
        self.observable.is_some()
    }

    #[must_use]
    pub fn state(&self) -> ReconcileState {
        self.shared.state.get()
    }

    // --- Queries -----------------------------------------------------------

    #[must_use]
    pub fn number_of_sections(&self) -> usize {
        1
    }

    /// Item count of `section`; 0 for any section other than 0.
    #[must_use]
    pub fn number_of_items(&self, section: usize) -> usize {
        if section == 0 {
            self.shared.items.borrow().len()
        } else {
            0
        }
    }

    /// Snapshot of the cached items.
    #[must_use]
    pub fn items(&self) -> Vec<Item> {
        self.shared.items.borrow().clone()
    }

    /// # Panics
    ///
    /// Panics if `path` is out of range.
    #[must_use]
    pub fn item_at(&self, path: IndexPath) -> Item {
        self.try_item_at(path).unwrap_or_else(|err| panic!("{err}"))
    }

    pub fn try_item_at(&self, path: IndexPath) -> Result<Item, DataSourceError> {
        self.shared.check(path)?;
        Ok(self.shared.items.borrow()[path.item].clone())
    }

    /// Whether the view should offer deletion for `path`.
    #[must_use]
    pub fn can_edit(&self, path: IndexPath) -> bool {
        self.editable()
            && self.shared.config.borrow().allows_deletion
            && self.shared.check(path).is_ok()
    }

    /// Whether the view should offer reordering for `path`.
    #[must_use]
    pub fn can_move(&self, path: IndexPath) -> bool {
        self.editable()
            && self.shared.config.borrow().allows_moving
            && self.shared.check(path).is_ok()
    }

    // --- Cells -------------------------------------------------------------

    /// Register how cells are obtained and filled.
    pub fn use_cell(
        &self,
        reuse_identifier: impl Into<String>,
        setup: impl Fn(&Item, &mut V::Cell) + 'static,
    ) {
        *self.shared.cell.borrow_mut() = Some(CellRegistration {
            reuse_identifier: reuse_identifier.into(),
            setup: Box::new(setup),
        });
    }

    /// [`use_cell`](Self::use_cell) with the configured reuse identifier.
    pub fn use_configured_cell(&self, setup: impl Fn(&Item, &mut V::Cell) + 'static) {
        let reuse_identifier = self.shared.config.borrow().reuse_identifier.clone();
        self.use_cell(reuse_identifier, setup);
    }

    /// Dequeue and fill the cell for `path`.
    ///
    /// # Panics
    ///
    /// Panics if no cell setup is registered, the view is gone, or `path` is
    /// out of range.
    pub fn cell_at(&self, path: IndexPath) -> V::Cell {
        self.try_cell_at(path).unwrap_or_else(|err| panic!("{err}"))
    }

    pub fn try_cell_at(&self, path: IndexPath) -> Result<V::Cell, DataSourceError> {
        let view = self
            .shared
            .view
            .upgrade()
            .ok_or(DataSourceError::ViewDropped)?;
        let item = self.try_item_at(path)?;
        let registration = self.shared.cell.borrow();
        let registration = registration
            .as_ref()
            .ok_or(DataSourceError::CellNotConfigured)?;
        let mut cell = view.dequeue_cell(&registration.reuse_identifier, path);
        (registration.setup)(&item, &mut cell);
        Ok(cell)
    }

    // --- User edits --------------------------------------------------------

    /// Remove the item at `path` after the view already removed its row.
    ///
    /// # Panics
    ///
    /// Panics if the source is read-only or `path` is out of range.
    pub fn delete(&self, path: IndexPath) {
        if let Err(err) = self.try_delete(path) {
            panic!("{err}");
        }
    }

    pub fn try_delete(&self, path: IndexPath) -> Result<(), DataSourceError> {
        let target = self.edit_target()?;
        self.shared.check(path)?;
        let Some(observable) = target else {
            warn!(%path, "delete ignored: observable dropped");
            return Ok(());
        };

        self.ensure_in_step(&observable)?;

        let _state = StateGuard::enter(&self.shared.state, ReconcileState::ApplyingUserEdit);
        self.shared.items.borrow_mut().remove(path.item);
        observable.modify(|data| {
            data.remove(path.item);
        });
        debug!(%path, "user delete written back");
        Ok(())
    }

    /// Move the item at `from` to `to` after the view already moved its row.
    ///
    /// # Panics
    ///
    /// Panics if the source is read-only or either path is out of range.
    pub fn move_item(&self, from: IndexPath, to: IndexPath) {
        if let Err(err) = self.try_move_item(from, to) {
            panic!("{err}");
        }
    }

    pub fn try_move_item(&self, from: IndexPath, to: IndexPath) -> Result<(), DataSourceError> {
        let target = self.edit_target()?;
        self.shared.check(from)?;
        self.shared.check(to)?;
        if from == to {
            return Ok(());
        }
        let Some(observable) = target else {
            warn!(%from, %to, "move ignored: observable dropped");
            return Ok(());
        };

        self.ensure_in_step(&observable)?;

        let _state = StateGuard::enter(&self.shared.state, ReconcileState::ApplyingUserEdit);
        let reorder = |data: &mut Vec<Item>| {
            let item = data.remove(from.item);
            data.insert(to.item, item);
        };
        reorder(&mut *self.shared.items.borrow_mut());
        observable.modify(reorder);
        debug!(%from, %to, "user move written back");
        Ok(())
    }

    /// Edits address the cache and the observable with the same index, so
    /// both must hold the same number of items. Nothing is touched otherwise.
    fn ensure_in_step(&self, observable: &Observable<Vec<Item>>) -> Result<(), DataSourceError> {
        let cached = self.shared.items.borrow().len();
        let observed = observable.with(Vec::len);
        if cached == observed {
            return Ok(());
        }
        warn!(cached, observed, "edit refused: cached items out of step with observable");
        Err(DataSourceError::OutOfSync { cached, observed })
    }

    /// `Ok(None)` when editable but the observable is gone.
    fn edit_target(&self) -> Result<Option<Observable<Vec<Item>>>, DataSourceError> {
        self.observable
            .as_ref()
            .map(WeakObservable::upgrade)
            .ok_or(DataSourceError::NotEditable)
    }

    // --- Selection ---------------------------------------------------------

    /// Bind the observable holding the currently selected items.
    ///
    /// View selection is reconciled now and every time `selections` changes.
    pub fn set_selections(&self, selections: &Observable<Vec<Item>>) {
        *self.shared.selections.borrow_mut() = Some(selections.clone());
        let weak = Rc::downgrade(&self.shared);
        let subscription = selections.subscribe(SubscriptionOptions::default(), move |_| {
            if let Some(shared) = weak.upgrade() {
                shared.sync_selections();
            }
        });
        drop(self.selection_subscription.replace(subscription));
    }

    #[must_use]
    pub fn selections(&self) -> Option<Observable<Vec<Item>>> {
        self.shared.selections.borrow().clone()
    }

    /// Select on the view exactly the rows whose items are in the bound
    /// selections, touching no row that is already right.
    pub fn sync_selections(&self) {
        self.shared.sync_selections();
    }

    /// The view reports that the user selected `path`.
    ///
    /// Adds the item to the bound selections, fires [`on_select`](Self::on_select),
    /// and with `deselect_on_selection` immediately deselects the row again.
    ///
    /// # Panics
    ///
    /// Panics if `path` is out of range.
    pub fn did_select(&self, path: IndexPath) {
        if let Err(err) = self.try_did_select(path) {
            panic!("{err}");
        }
    }

    pub fn try_did_select(&self, path: IndexPath) -> Result<(), DataSourceError> {
        let item = self.try_item_at(path)?;
        if let Some(selections) = self.selections() {
            selections.modify(|selected| {
                if !selected.contains(&item) {
                    selected.push(item.clone());
                }
            });
        }
        self.shared.on_select.fire(&item);

        let deselect = self.shared.config.borrow().deselect_on_selection;
        if deselect {
            if let Some(view) = self.shared.view.upgrade() {
                view.deselect(path);
            }
            self.try_did_deselect(path)?;
        }
        Ok(())
    }

    /// The view reports that the user deselected `path`.
    ///
    /// # Panics
    ///
    /// Panics if `path` is out of range.
    pub fn did_deselect(&self, path: IndexPath) {
        if let Err(err) = self.try_did_deselect(path) {
            panic!("{err}");
        }
    }

    pub fn try_did_deselect(&self, path: IndexPath) -> Result<(), DataSourceError> {
        let item = self.try_item_at(path)?;
        if let Some(selections) = self.selections() {
            selections.modify(|selected| {
                if let Some(pos) = selected.iter().position(|s| *s == item) {
                    selected.remove(pos);
                }
            });
        }
        self.shared.on_deselect.fire(&item);
        Ok(())
    }

    #[must_use]
    pub fn on_select(&self) -> &Event<Item> {
        &self.shared.on_select
    }

    #[must_use]
    pub fn on_deselect(&self) -> &Event<Item> {
        &self.shared.on_deselect
    }

    /// Stop listening to the source and selections. Dropping does the same.
    pub fn unbind(&self) {
        self.subscriptions.dispose();
        self.selection_subscription.borrow().dispose();
    }
}

impl<Item, V: DataSourceView> std::fmt::Debug for DataSource<Item, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSource")
            .field("items", &self.shared.items.borrow().len())
            .field("state", &self.shared.state.get())
            .field("editable", &self.observable.is_some())
            .field("view_alive", &(self.shared.view.strong_count() > 0))
            .finish()
    }
}
