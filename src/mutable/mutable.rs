use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use super::{MutableStore, Wrapper};
use crate::error::{MutateError, StoreError};
use crate::store::{Subscription, Writable};

struct MutableInner<T> {
    value: Rc<RefCell<T>>,
    a: Rc<Wrapper<T>>,
    b: Rc<Wrapper<T>>,
    on_b: Cell<bool>,
    writable: Writable<Rc<Wrapper<T>>>,
}

/// A double-buffered store around a mutable value.
///
/// The store owns exactly two wrappers, `a` and `b`, which both point at the
/// same value. Each update flips between them and publishes the other one,
/// so a subscriber comparing against the previous wrapper always sees a new
/// identity, and no allocation happens per update.
///
/// Only two identities ever exist. A subscriber that caches a wrapper and
/// compares it against one published two updates later will see the same
/// identity again and may treat that update as unchanged. Use
/// [`SafeMutable`](crate::SafeMutable) when that matters.
///
/// Cloning a `Mutable` creates a new handle to the same store.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use mutstore::mutable;
///
/// let counts = mutable(HashMap::from([("a", 1)]));
/// let sub = counts.subscribe(|w| println!("a = {}", w.value()["a"]));
///
/// counts.mutate(|m| *m.get_mut("a").unwrap() += 1);
/// assert_eq!(counts.current().value()["a"], 2);
/// sub.unsubscribe();
/// ```
pub struct Mutable<T> {
    inner: Rc<MutableInner<T>>,
}

impl<T: 'static> Mutable<T> {
    /// Create a store around `value`, publishing wrapper `a`.
    #[must_use]
    pub fn new(value: T) -> Self {
        let value = Rc::new(RefCell::new(value));
        let a = Rc::new(Wrapper::new(Rc::clone(&value)));
        let b = Rc::new(Wrapper::new(Rc::clone(&value)));
        let writable = Writable::new(Rc::clone(&a));
        Self {
            inner: Rc::new(MutableInner {
                value,
                a,
                b,
                on_b: Cell::new(false),
                writable,
            }),
        }
    }

    /// Subscribe to published wrappers.
    ///
    /// The callback runs once immediately with the current wrapper and then
    /// after every update.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Rc<Wrapper<T>>) + 'static,
    {
        self.inner.writable.subscribe(callback)
    }

    /// Mutate the value in place, then publish the other wrapper.
    ///
    /// If the mutator panics nothing is published and the panic reaches the
    /// caller unchanged.
    ///
    /// # Panics
    ///
    /// Panics if the value is already borrowed, for instance when called from
    /// inside another mutator on this store.
    pub fn mutate<F>(&self, mutator: F)
    where
        F: FnOnce(&mut T),
    {
        mutator(&mut *self.inner.value.borrow_mut());
        self.flip();
    }

    /// Publish the other wrapper without mutating.
    ///
    /// Subscribers are notified even though nothing changed here; this is
    /// how changes made directly through a wrapper's value get announced.
    pub fn touch(&self) {
        self.flip();
    }

    /// Replace the value behind both wrappers, then publish.
    ///
    /// # Panics
    ///
    /// Panics if the value is already borrowed.
    pub fn swap(&self, value: T) {
        drop(self.replace(value));
    }

    /// Like [`swap`](Mutable::swap), returning the previous value.
    ///
    /// # Panics
    ///
    /// Panics if the value is already borrowed.
    pub fn replace(&self, value: T) -> T {
        let old = std::mem::replace(&mut *self.inner.value.borrow_mut(), value);
        self.flip();
        old
    }

    /// Like [`replace`](Mutable::replace), but fails instead of panicking
    /// when the value is borrowed.
    pub fn try_swap(&self, value: T) -> Result<T, StoreError> {
        let mut current = self.inner.value.try_borrow_mut().map_err(|_| {
            debug!("swap refused, value is borrowed");
            StoreError::ValueBorrowed
        })?;
        let old = std::mem::replace(&mut *current, value);
        drop(current);
        self.flip();
        Ok(old)
    }

    /// Run a fallible mutator. Publishes only if it returns `Ok`.
    pub fn try_mutate<E, F>(&self, mutator: F) -> Result<(), MutateError<E>>
    where
        F: FnOnce(&mut T) -> Result<(), E>,
    {
        let mut value = self.inner.value.try_borrow_mut().map_err(|_| {
            debug!("mutate refused, value is borrowed");
            StoreError::ValueBorrowed
        })?;
        mutator(&mut *value).map_err(MutateError::Mutator)?;
        drop(value);
        self.flip();
        Ok(())
    }

    /// The wrapper most recently published.
    #[must_use]
    pub fn current(&self) -> Rc<Wrapper<T>> {
        self.inner.writable.get()
    }

    fn flip(&self) {
        let on_b = !self.inner.on_b.get();
        self.inner.on_b.set(on_b);
        let (slot, next) = if on_b {
            ("b", &self.inner.b)
        } else {
            ("a", &self.inner.a)
        };
        trace!(slot, "mutable store flipped");
        self.inner.writable.set(Rc::clone(next));
    }
}

/// Create a double-buffered [`Mutable`] store around `value`.
pub fn mutable<T: 'static>(value: T) -> Mutable<T> {
    Mutable::new(value)
}

impl<T: 'static> MutableStore<T> for Mutable<T> {
    fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Rc<Wrapper<T>>) + 'static,
    {
        Mutable::subscribe(self, callback)
    }

    fn mutate<F>(&self, mutator: F)
    where
        F: FnOnce(&mut T),
    {
        Mutable::mutate(self, mutator)
    }

    fn touch(&self) {
        Mutable::touch(self)
    }

    fn swap(&self, value: T) {
        Mutable::swap(self, value)
    }

    fn try_mutate<E, F>(&self, mutator: F) -> Result<(), MutateError<E>>
    where
        F: FnOnce(&mut T) -> Result<(), E>,
    {
        Mutable::try_mutate(self, mutator)
    }

    fn current(&self) -> Rc<Wrapper<T>> {
        Mutable::current(self)
    }
}

impl<T> Clone for Mutable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Mutable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let published = if self.inner.on_b.get() { "b" } else { "a" };
        f.debug_struct("Mutable")
            .field("value", &*self.inner.a)
            .field("published", &published)
            .finish()
    }
}
