//! Provider-side event feed the observation router subscribes to.
//!
//! A tracking provider owns an `EventFeed` and publishes change sets into it;
//! every live `Subscription` gets its own unbounded crossbeam channel. Events
//! published while nobody is subscribed are dropped.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;

/// Identifier of one subscription on a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Receiving end of a feed subscription.
pub struct Subscription<T> {
    id: SubscriptionId,
    receiver: Receiver<T>,
}

impl<T> Subscription<T> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn receiver(&self) -> &Receiver<T> {
        &self.receiver
    }
}

struct FeedInner<T> {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Sender<T>)>,
}

/// Fan-out publisher for one event stream.
pub struct EventFeed<T> {
    inner: Mutex<FeedInner<T>>,
}

impl<T: Clone> EventFeed<T> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(FeedInner {
                next_id: 0,
                subscribers: Vec::new(),
            }),
        })
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = unbounded();
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = SubscriptionId(inner.next_id);
        inner.subscribers.push((id, tx));
        Subscription { id, receiver: rx }
    }

    /// Remove a subscriber. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.lock().subscribers.retain(|(sid, _)| *sid != id);
    }

    /// Deliver `event` to every live subscriber and return how many got it.
    ///
    /// Subscribers whose receiver was dropped are pruned.
    pub fn publish(&self, event: T) -> usize {
        let mut inner = self.inner.lock();
        inner
            .subscribers
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
        inner.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers_is_dropped() {
        let feed = EventFeed::<u32>::new();
        assert_eq!(feed.publish(1), 0);

        let sub = feed.subscribe();
        assert!(sub.receiver().try_recv().is_err());
    }

    #[test]
    fn test_fan_out_and_unsubscribe() {
        let feed = EventFeed::<u32>::new();
        let a = feed.subscribe();
        let b = feed.subscribe();
        assert_ne!(a.id(), b.id());

        assert_eq!(feed.publish(5), 2);
        assert_eq!(a.receiver().try_recv().unwrap(), 5);
        assert_eq!(b.receiver().try_recv().unwrap(), 5);

        feed.unsubscribe(a.id());
        feed.unsubscribe(a.id());
        assert_eq!(feed.publish(6), 1);
        assert!(a.receiver().try_recv().is_err());
        assert_eq!(b.receiver().try_recv().unwrap(), 6);
    }

    #[test]
    fn test_dropped_subscription_is_pruned() {
        let feed = EventFeed::<u32>::new();
        let sub = feed.subscribe();
        drop(sub);

        assert_eq!(feed.publish(1), 0);
        assert_eq!(feed.subscriber_count(), 0);
    }
}
