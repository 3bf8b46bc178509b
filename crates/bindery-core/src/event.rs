#![forbid(unsafe_code)]

//! Fire-and-forget notifications.
//!
//! An [`Event<T>`] has no current value: subscribers only hear about
//! payloads fired after they subscribe. It shares the delivery rules of
//! [`SubscriptionCollection`] (ordering, disposal checks, schedulers).

use crate::disposable::Disposable;
use crate::subscription::{SubscriptionCollection, SubscriptionOptions};

/// A stream of payloads with no retained state.
pub struct Event<T> {
    subscribers: SubscriptionCollection<T>,
}

impl<T> Default for Event<T> {
    fn default() -> Self {
        Self {
            subscribers: SubscriptionCollection::default(),
        }
    }
}

impl<T: Clone + 'static> Event<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for future payloads.
    pub fn subscribe(
        &self,
        options: SubscriptionOptions,
        callback: impl Fn(&T) + 'static,
    ) -> Disposable {
        self.subscribers
            .add(options, None, move |_, payload| callback(payload))
    }

    /// Deliver `payload` to every live subscriber.
    pub fn fire(&self, payload: &T) {
        self.subscribers.notify(None, payload);
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<T> std::fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("subscribers", &self.subscribers)
            .finish()
    }
}
