//! Minimal observer list used by the player to publish change notifications.
//!
//! Subscribers are plain closures owned by the control thread; nothing here is
//! `Send`, which keeps notifications on the thread that mutates the state.

use std::fmt;

/// Handle returned by [`Observers::subscribe`], used to unsubscribe later.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<E> = Box<dyn FnMut(&E)>;

pub struct Observers<E> {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Callback<E>)>,
}

impl<E> Default for Observers<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            subscribers: Vec::new(),
        }
    }
}

impl<E> fmt::Debug for Observers<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl<E> Observers<E> {
    pub fn subscribe(&mut self, callback: impl FnMut(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Remove a subscriber. Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// Deliver `event` to every subscriber in subscription order.
    pub fn notify(&mut self, event: &E) {
        for (_, cb) in self.subscribers.iter_mut() {
            cb(event);
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
