use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

type Callback<T> = Box<dyn Fn(&T)>;

struct Subscriber<T> {
    id: u64,
    active: Cell<bool>,
    callback: Callback<T>,
}

struct WritableInner<T> {
    value: T,
    next_id: u64,
    subscribers: Vec<Rc<Subscriber<T>>>,
    // Values set while a notification round is running, delivered in order
    // by the outermost `set`.
    pending: VecDeque<T>,
    notifying: bool,
}

/// A writable store: a current value plus an ordered list of subscribers.
///
/// Every [`set`](Writable::set) synchronously invokes all current
/// subscribers, in the order they subscribed, before returning. There is no
/// batching and no equality check; setting the same value notifies again.
///
/// A `set` made from inside a subscriber is queued: the running round
/// finishes delivering its value to every subscriber first, then the queued
/// values are delivered in order, all before the outermost `set` returns.
/// Every subscriber therefore sees the same sequence of values.
///
/// Cloning a `Writable` creates a new handle to the same value and
/// subscriber list.
pub struct Writable<T> {
    inner: Rc<RefCell<WritableInner<T>>>,
}

impl<T: Clone + 'static> Writable<T> {
    /// Create a new store holding `initial`, with no subscribers.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(WritableInner {
                value: initial,
                next_id: 0,
                subscribers: Vec::new(),
                pending: VecDeque::new(),
                notifying: false,
            })),
        }
    }

    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Read the current value without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Replace the value and notify every subscriber.
    ///
    /// Called from inside a subscriber, the value becomes current at once but
    /// its notification is queued behind the round in progress.
    pub fn set(&self, value: T) {
        let start = {
            let mut inner = self.inner.borrow_mut();
            inner.value = value.clone();
            inner.pending.push_back(value);
            if inner.notifying {
                trace!(queued = inner.pending.len(), "publish queued");
                false
            } else {
                inner.notifying = true;
                true
            }
        };
        if start {
            self.notify();
        }
    }

    /// Set the value computed from the current one.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = self.with(f);
        self.set(next);
    }

    /// Subscribe to the store.
    ///
    /// The callback runs once immediately with the current value and then
    /// after every `set`. Dropping the returned [`Subscription`]
    /// unsubscribes; use [`Subscription::detach`] to keep the callback for
    /// the lifetime of the store.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        let subscriber = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            let subscriber = Rc::new(Subscriber {
                id,
                active: Cell::new(true),
                callback: Box::new(callback),
            });
            inner.subscribers.push(Rc::clone(&subscriber));
            trace!(id, subscribers = inner.subscribers.len(), "subscribed");
            subscriber
        };

        let value = self.get();
        (subscriber.callback)(&value);

        let weak: Weak<RefCell<WritableInner<T>>> = Rc::downgrade(&self.inner);
        let id = subscriber.id;
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    remove_subscriber(&inner, id);
                }
            })),
        }
    }

    /// Number of currently registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    fn notify(&self) {
        let _round = NotifyRound(&self.inner);
        loop {
            // Snapshot so callbacks may subscribe, unsubscribe or `set` again
            // without holding the borrow.
            let (value, subscribers) = {
                let mut inner = self.inner.borrow_mut();
                match inner.pending.pop_front() {
                    Some(value) => (value, inner.subscribers.clone()),
                    None => return,
                }
            };
            trace!(subscribers = subscribers.len(), "publishing");
            for subscriber in &subscribers {
                if subscriber.active.get() {
                    (subscriber.callback)(&value);
                }
            }
        }
    }
}

/// Ends a notification round, including when a subscriber panics.
struct NotifyRound<'a, T>(&'a RefCell<WritableInner<T>>);

impl<T> Drop for NotifyRound<'_, T> {
    fn drop(&mut self) {
        let mut inner = self.0.borrow_mut();
        inner.notifying = false;
        inner.pending.clear();
    }
}

fn remove_subscriber<T>(inner: &RefCell<WritableInner<T>>, id: u64) {
    let mut inner = inner.borrow_mut();
    if let Some(pos) = inner.subscribers.iter().position(|s| s.id == id) {
        let removed = inner.subscribers.remove(pos);
        removed.active.set(false);
        trace!(id, subscribers = inner.subscribers.len(), "unsubscribed");
    }
}

impl<T> Clone for Writable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Writable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Writable")
            .field("value", &inner.value)
            .field("subscriber_count", &inner.subscribers.len())
            .finish()
    }
}

/// Handle returned by `subscribe`.
///
/// Unsubscribes on [`unsubscribe`](Subscription::unsubscribe) or on drop.
/// A subscriber removed while a notification is in flight is not called for
/// the rest of that notification.
#[must_use = "dropping a Subscription unsubscribes immediately; call `detach` to keep it"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Stop receiving notifications.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Keep the callback registered for as long as the store lives.
    pub fn detach(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.cancel.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_runs_immediately() {
        let store = Writable::new(5);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);

        let _sub = store.subscribe(move |v| seen_clone.borrow_mut().push(*v));

        assert_eq!(*seen.borrow(), vec![5]);
    }

    #[test]
    fn set_notifies_without_dedup() {
        let store = Writable::new(0);
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);

        let _sub = store.subscribe(move |_| count_clone.set(count_clone.get() + 1));

        store.set(1);
        store.set(1);
        assert_eq!(count.get(), 3);
        assert_eq!(store.get(), 1);
    }

    #[test]
    fn update_from_current() {
        let store = Writable::new(vec![1, 2]);
        store.update(|v| v.iter().map(|n| n * 10).collect());
        assert_eq!(store.get(), vec![10, 20]);
        assert_eq!(store.with(|v| v.len()), 2);
    }

    #[test]
    fn registration_order() {
        let store = Writable::new(0);
        let log = Rc::new(RefCell::new(Vec::new()));

        let log1 = Rc::clone(&log);
        let _s1 = store.subscribe(move |v| log1.borrow_mut().push(('A', *v)));
        let log2 = Rc::clone(&log);
        let _s2 = store.subscribe(move |v| log2.borrow_mut().push(('B', *v)));

        log.borrow_mut().clear();
        store.set(7);
        assert_eq!(*log.borrow(), vec![('A', 7), ('B', 7)]);
    }

    #[test]
    fn unsubscribe_and_drop() {
        let store = Writable::new(0);
        let count = Rc::new(Cell::new(0u32));

        let c1 = Rc::clone(&count);
        let sub = store.subscribe(move |_| c1.set(c1.get() + 1));
        let c2 = Rc::clone(&count);
        let dropped = store.subscribe(move |_| c2.set(c2.get() + 10));
        assert_eq!(count.get(), 11);
        assert_eq!(store.subscriber_count(), 2);

        drop(dropped);
        store.set(1);
        assert_eq!(count.get(), 12);

        sub.unsubscribe();
        store.set(2);
        assert_eq!(count.get(), 12);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn detach_keeps_subscriber() {
        let store = Writable::new(0);
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);

        store
            .subscribe(move |_| count_clone.set(count_clone.get() + 1))
            .detach();

        store.set(1);
        assert_eq!(count.get(), 2);
        assert_eq!(store.subscriber_count(), 1);
    }

    #[test]
    fn unsubscribe_self_during_notification() {
        let store = Writable::new(0);
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let calls = Rc::new(Cell::new(0u32));
        let after = Rc::new(Cell::new(0u32));

        let slot_clone = Rc::clone(&slot);
        let calls_clone = Rc::clone(&calls);
        let sub = store.subscribe(move |v| {
            calls_clone.set(calls_clone.get() + 1);
            if *v == 1 {
                if let Some(sub) = slot_clone.borrow_mut().take() {
                    sub.unsubscribe();
                }
            }
        });
        *slot.borrow_mut() = Some(sub);

        let after_clone = Rc::clone(&after);
        let _later = store.subscribe(move |_| after_clone.set(after_clone.get() + 1));

        store.set(1);
        store.set(2);
        assert_eq!(calls.get(), 2);
        assert_eq!(after.get(), 3);
    }

    #[test]
    fn removed_mid_cycle_is_skipped() {
        let store = Writable::new(0);
        let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let victim_calls = Rc::new(Cell::new(0u32));

        let victim_clone = Rc::clone(&victim);
        let _killer = store.subscribe(move |v| {
            if *v == 1 {
                victim_clone.borrow_mut().take();
            }
        });
        let calls_clone = Rc::clone(&victim_calls);
        *victim.borrow_mut() = Some(store.subscribe(move |_| {
            calls_clone.set(calls_clone.get() + 1);
        }));

        store.set(1);
        assert_eq!(victim_calls.get(), 1);
    }

    #[test]
    fn nested_set_is_queued_behind_current_round() {
        let store = Writable::new(0);
        let first = Rc::new(RefCell::new(Vec::new()));
        let second = Rc::new(RefCell::new(Vec::new()));

        let inner_store = store.clone();
        let first_clone = Rc::clone(&first);
        let _s1 = store.subscribe(move |v| {
            first_clone.borrow_mut().push(*v);
            if *v == 1 {
                inner_store.set(2);
                // The new value is current even before it is delivered.
                assert_eq!(inner_store.get(), 2);
            }
        });
        let second_clone = Rc::clone(&second);
        let _s2 = store.subscribe(move |v| second_clone.borrow_mut().push(*v));

        store.set(1);
        assert_eq!(*first.borrow(), vec![0, 1, 2]);
        assert_eq!(*second.borrow(), vec![0, 1, 2]);
        assert_eq!(store.get(), 2);
    }

    #[test]
    fn chained_nested_sets_keep_order() {
        let store = Writable::new(0);
        let log = Rc::new(RefCell::new(Vec::new()));

        let inner_store = store.clone();
        let _bump = store.subscribe(move |v| {
            if (1..3).contains(v) {
                inner_store.set(v + 1);
            }
        });
        let log_clone = Rc::clone(&log);
        let _s2 = store.subscribe(move |v| log_clone.borrow_mut().push(*v));

        store.set(1);
        assert_eq!(*log.borrow(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn panicking_subscriber_ends_round() {
        let store = Writable::new(0);
        let count = Rc::new(Cell::new(0u32));

        let inner_store = store.clone();
        let sub = store.subscribe(move |v| {
            if *v == 1 {
                inner_store.set(5);
                panic!("subscriber failed");
            }
        });
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| store.set(1)));
        assert!(result.is_err());
        sub.unsubscribe();

        let count_clone = Rc::clone(&count);
        let _s2 = store.subscribe(move |_| count_clone.set(count_clone.get() + 1));
        store.set(2);
        assert_eq!(count.get(), 2);
        assert_eq!(store.get(), 2);
    }

    #[test]
    fn subscription_outlives_store() {
        let store = Writable::new(0);
        let sub = store.subscribe(|_| {});
        drop(store);
        sub.unsubscribe();
    }

    #[test]
    fn debug_format() {
        let store = Writable::new(42);
        let dbg = format!("{:?}", store);
        assert!(dbg.contains("Writable"));
        assert!(dbg.contains("42"));
    }
}
