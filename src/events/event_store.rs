//! Append-only, subscribable event log.
//!
//! `append` notifies every subscriber synchronously, in subscription order,
//! before returning. An append issued from inside a subscriber callback is
//! queued and applied after the current notification cycle drains, so the
//! log and the notification stream never interleave mid-cycle.

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::domain_event::DomainEvent;

/// Handle returned by [`EventStore::on_all`]; pass to [`EventStore::off`]
/// to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

type Subscriber = Arc<dyn Fn(&DomainEvent) + Send + Sync>;

#[derive(Default)]
struct StoreInner {
    log: Vec<DomainEvent>,
    subscribers: Vec<(SubscriberId, Subscriber)>,
    pending: VecDeque<DomainEvent>,
    notifying: bool,
}

/// The ordered conversation log and its subscriber list.
///
/// Owned by the composition root and injected where needed; commands are the
/// only callers of [`append`](Self::append).
#[derive(Default)]
pub struct EventStore {
    inner: Mutex<StoreInner>,
    next_subscriber: AtomicU64,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one event and synchronously run the notification cycle.
    ///
    /// Returns only after every subscriber has returned control. Subscribers
    /// needing long-running work must fire and forget it. Re-entrant appends
    /// are queued behind the event currently being notified.
    pub fn append(&self, event: DomainEvent) {
        {
            let mut inner = self.inner.lock();
            inner.pending.push_back(event);
            if inner.notifying {
                // A cycle is already draining the queue; it will pick this up.
                return;
            }
            inner.notifying = true;
        }

        loop {
            let (event, subscribers) = {
                let mut inner = self.inner.lock();
                match inner.pending.pop_front() {
                    Some(event) => {
                        inner.log.push(event.clone());
                        // Snapshot: unsubscribing mid-cycle must not affect
                        // the cycle in progress.
                        let subs: Vec<Subscriber> =
                            inner.subscribers.iter().map(|(_, s)| s.clone()).collect();
                        (event, subs)
                    }
                    None => {
                        inner.notifying = false;
                        return;
                    }
                }
            };

            for subscriber in subscribers {
                let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| subscriber(&event)));
                if let Err(panic) = outcome {
                    log::error!(
                        "[EventStore] subscriber panicked on '{}': {:?}",
                        event.event_type(),
                        panic
                    );
                }
            }
        }
    }

    /// Subscribe to every appended event. Subscribers are notified in
    /// subscription order.
    pub fn on_all(&self, subscriber: impl Fn(&DomainEvent) + Send + Sync + 'static) -> SubscriberId {
        let id = SubscriberId(self.next_subscriber.fetch_add(1, Ordering::Relaxed));
        self.inner.lock().subscribers.push((id, Arc::new(subscriber)));
        id
    }

    /// Remove a subscriber. Has no effect on a notification cycle already in
    /// progress.
    pub fn off(&self, id: SubscriberId) {
        self.inner.lock().subscribers.retain(|(sid, _)| *sid != id);
    }

    /// Ordered snapshot of the full log, for replay.
    pub fn events(&self) -> Vec<DomainEvent> {
        self.inner.lock().log.clone()
    }

    /// Number of events in the log.
    pub fn len(&self) -> usize {
        self.inner.lock().log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().log.is_empty()
    }

    /// Empty the log and drop all subscriptions. Teardown only.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.log.clear();
        inner.subscribers.clear();
        inner.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::domain_event::{ChatMessage, Role};
    use parking_lot::Mutex as PlMutex;

    fn msg(id: u64, text: &str) -> DomainEvent {
        DomainEvent::MessageAdded(ChatMessage::new(id, Role::User, text))
    }

    #[test]
    fn test_append_notifies_in_subscription_order() {
        let store = EventStore::new();
        let seen = Arc::new(PlMutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = seen.clone();
            store.on_all(move |_| seen.lock().push(tag));
        }
        store.append(msg(1, "hi"));

        assert_eq!(*seen.lock(), vec!["first", "second", "third"]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_reentrant_append_is_queued_until_cycle_completes() {
        let store = Arc::new(EventStore::new());
        let order = Arc::new(PlMutex::new(Vec::new()));

        {
            let store2 = store.clone();
            let order = order.clone();
            store.on_all(move |event| {
                order.lock().push(format!("a:{}", event.event_type()));
                if matches!(event, DomainEvent::MessageAdded(m) if m.id == 1) {
                    // Must not be notified before the current cycle finishes.
                    store2.append(DomainEvent::ChatCleared);
                }
            });
        }
        {
            let order = order.clone();
            store.on_all(move |event| {
                order.lock().push(format!("b:{}", event.event_type()));
            });
        }

        store.append(msg(1, "trigger"));

        assert_eq!(
            *order.lock(),
            vec![
                "a:message_added",
                "b:message_added",
                "a:chat_cleared",
                "b:chat_cleared"
            ]
        );
        // Log order matches notification order.
        let types: Vec<_> = store.events().iter().map(|e| e.event_type().to_string()).collect();
        assert_eq!(types, vec!["message_added", "chat_cleared"]);
    }

    #[test]
    fn test_unsubscribe_mid_cycle_keeps_current_cycle_intact() {
        let store = Arc::new(EventStore::new());
        let hits = Arc::new(AtomicU64::new(0));

        let victim = {
            let hits = hits.clone();
            store.on_all(move |_| {
                hits.fetch_add(1, Ordering::Relaxed);
            })
        };
        {
            let store2 = store.clone();
            store.on_all(move |_| store2.off(victim));
        }

        // The victim was registered first, so it fires once here even though
        // the second subscriber removes it during the same cycle.
        store.append(msg(1, "one"));
        assert_eq!(hits.load(Ordering::Relaxed), 1);

        store.append(msg(2, "two"));
        assert_eq!(hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_off_removes_subscriber() {
        let store = EventStore::new();
        let hits = Arc::new(AtomicU64::new(0));
        let id = {
            let hits = hits.clone();
            store.on_all(move |_| {
                hits.fetch_add(1, Ordering::Relaxed);
            })
        };
        store.append(msg(1, "a"));
        store.off(id);
        store.append(msg(2, "b"));
        assert_eq!(hits.load(Ordering::Relaxed), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_clear_empties_log_and_subscriptions() {
        let store = EventStore::new();
        let hits = Arc::new(AtomicU64::new(0));
        {
            let hits = hits.clone();
            store.on_all(move |_| {
                hits.fetch_add(1, Ordering::Relaxed);
            });
        }
        store.append(msg(1, "a"));
        store.clear();
        assert!(store.is_empty());

        store.append(msg(2, "b"));
        assert_eq!(store.len(), 1);
        assert_eq!(hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_subscriber_panic_does_not_poison_the_cycle() {
        let store = EventStore::new();
        let hits = Arc::new(AtomicU64::new(0));
        store.on_all(|_| panic!("subscriber bug"));
        {
            let hits = hits.clone();
            store.on_all(move |_| {
                hits.fetch_add(1, Ordering::Relaxed);
            });
        }
        store.append(msg(1, "a"));
        assert_eq!(hits.load(Ordering::Relaxed), 1);
        assert_eq!(store.len(), 1);
    }
}
