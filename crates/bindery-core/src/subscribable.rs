#![forbid(unsafe_code)]

//! The subscription contract consumers program against.
//!
//! [`Subscribable::subscribe_diff`] is the primitive: callbacks receive
//! `(old, new)`, with `old == None` only on the initial delivery.
//! [`Subscribable::subscribe`] drops `old`, and
//! [`SubscribableArray::subscribe_array`] turns `(old, new)` for a `Vec`
//! into an [`ArrayChange`].

use crate::array_change::{ArrayChange, compute_change};
use crate::disposable::Disposable;
use crate::subscription::SubscriptionOptions;

/// A source of values that callbacks can subscribe to.
pub trait Subscribable {
    type Value: Clone + PartialEq + 'static;

    /// Register a callback receiving `(old, new)` on every change.
    fn subscribe_diff(
        &self,
        options: SubscriptionOptions,
        callback: impl Fn(Option<&Self::Value>, &Self::Value) + 'static,
    ) -> Disposable;

    /// Register a callback receiving only the new value.
    fn subscribe(
        &self,
        options: SubscriptionOptions,
        callback: impl Fn(&Self::Value) + 'static,
    ) -> Disposable {
        self.subscribe_diff(options, move |_, new| callback(new))
    }
}

/// Diff-aware subscription for `Vec`-valued sources.
pub trait SubscribableArray<E>: Subscribable<Value = Vec<E>> {
    /// Register a callback receiving the new contents and the change that
    /// produced them. The initial delivery is reported as
    /// [`ArrayChange::Set`].
    fn subscribe_array(
        &self,
        options: SubscriptionOptions,
        callback: impl Fn(&[E], &ArrayChange<E>) + 'static,
    ) -> Disposable;
}

impl<S, E> SubscribableArray<E> for S
where
    S: Subscribable<Value = Vec<E>>,
    E: Clone + PartialEq + 'static,
{
    fn subscribe_array(
        &self,
        options: SubscriptionOptions,
        callback: impl Fn(&[E], &ArrayChange<E>) + 'static,
    ) -> Disposable {
        self.subscribe_diff(options, move |old, new| {
            let change = match old {
                Some(old) => match compute_change(old, new) {
                    Some(change) => change,
                    None => return,
                },
                None => ArrayChange::Set {
                    elements: new.clone(),
                },
            };
            callback(new, &change);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::Observable;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn subscribe_discards_old_value() {
        let obs = Observable::new(1);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        let _sub = obs.subscribe(SubscriptionOptions::default(), move |v| {
            seen_clone.borrow_mut().push(*v)
        });
        obs.set(2);
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn subscribe_array_reports_set_then_diffs() {
        let obs = Observable::new(vec![1, 2, 3]);
        let changes = Rc::new(RefCell::new(Vec::new()));
        let changes_clone = Rc::clone(&changes);
        let _sub = obs.subscribe_array(SubscriptionOptions::default(), move |_, change| {
            changes_clone.borrow_mut().push(change.clone())
        });

        obs.modify(|v| v.extend([4, 5]));
        obs.modify(|v| {
            v.remove(0);
        });

        assert_eq!(
            *changes.borrow(),
            vec![
                ArrayChange::Set {
                    elements: vec![1, 2, 3]
                },
                ArrayChange::Insert {
                    index: 3,
                    elements: vec![4, 5]
                },
                ArrayChange::Remove {
                    range: 0..1,
                    removed: vec![1]
                },
            ]
        );
    }

    #[test]
    fn subscribe_array_passes_new_contents() {
        let obs = Observable::new(vec!['a']);
        let last = Rc::new(RefCell::new(Vec::new()));
        let last_clone = Rc::clone(&last);
        let _sub = obs.subscribe_array(SubscriptionOptions::default(), move |items, _| {
            *last_clone.borrow_mut() = items.to_vec()
        });
        obs.set(vec!['a', 'b']);
        assert_eq!(*last.borrow(), vec!['a', 'b']);
    }
}
