use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use super::{MutableStore, Wrapper};
use crate::error::{MutateError, StoreError};
use crate::store::{Subscription, Writable};

struct SafeMutableInner<T> {
    value: RefCell<Rc<RefCell<T>>>,
    writable: Writable<Rc<Wrapper<T>>>,
}

/// A store around a mutable value that publishes a new wrapper per update.
///
/// Every published wrapper is distinct from all earlier ones, so code that
/// treats any new identity as a change always sees one. The cost is one
/// small allocation per update. After a [`swap`](SafeMutable::swap), earlier
/// wrappers keep pointing at the value they were published with.
///
/// Cloning a `SafeMutable` creates a new handle to the same store.
pub struct SafeMutable<T> {
    inner: Rc<SafeMutableInner<T>>,
}

impl<T: 'static> SafeMutable<T> {
    /// Create a store around `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        let value = Rc::new(RefCell::new(value));
        let writable = Writable::new(Rc::new(Wrapper::new(Rc::clone(&value))));
        Self {
            inner: Rc::new(SafeMutableInner {
                value: RefCell::new(value),
                writable,
            }),
        }
    }

    /// Subscribe to published wrappers.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Rc<Wrapper<T>>) + 'static,
    {
        self.inner.writable.subscribe(callback)
    }

    /// Mutate the value in place, then publish a new wrapper around it.
    ///
    /// # Panics
    ///
    /// Panics if the value is already borrowed.
    pub fn mutate<F>(&self, mutator: F)
    where
        F: FnOnce(&mut T),
    {
        let cell = self.cell();
        mutator(&mut *cell.borrow_mut());
        self.publish(cell);
    }

    /// Publish a new wrapper without mutating.
    pub fn touch(&self) {
        self.publish(self.cell());
    }

    /// Replace the value and publish a new wrapper around it.
    pub fn swap(&self, value: T) {
        let cell = Rc::new(RefCell::new(value));
        *self.inner.value.borrow_mut() = Rc::clone(&cell);
        self.publish(cell);
    }

    /// Run a fallible mutator. Publishes only if it returns `Ok`.
    pub fn try_mutate<E, F>(&self, mutator: F) -> Result<(), MutateError<E>>
    where
        F: FnOnce(&mut T) -> Result<(), E>,
    {
        let cell = self.cell();
        {
            let mut value = cell.try_borrow_mut().map_err(|_| {
                debug!("mutate refused, value is borrowed");
                StoreError::ValueBorrowed
            })?;
            mutator(&mut *value).map_err(MutateError::Mutator)?;
        }
        self.publish(cell);
        Ok(())
    }

    /// The wrapper most recently published.
    #[must_use]
    pub fn current(&self) -> Rc<Wrapper<T>> {
        self.inner.writable.get()
    }

    fn cell(&self) -> Rc<RefCell<T>> {
        self.inner.value.borrow().clone()
    }

    fn publish(&self, cell: Rc<RefCell<T>>) {
        trace!("safe mutable store publishing fresh wrapper");
        self.inner.writable.set(Rc::new(Wrapper::new(cell)));
    }
}

/// Create a fresh-wrapper [`SafeMutable`] store around `value`.
pub fn safe_mutable<T: 'static>(value: T) -> SafeMutable<T> {
    SafeMutable::new(value)
}

impl<T: 'static> MutableStore<T> for SafeMutable<T> {
    fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Rc<Wrapper<T>>) + 'static,
    {
        SafeMutable::subscribe(self, callback)
    }

    fn mutate<F>(&self, mutator: F)
    where
        F: FnOnce(&mut T),
    {
        SafeMutable::mutate(self, mutator)
    }

    fn touch(&self) {
        SafeMutable::touch(self)
    }

    fn swap(&self, value: T) {
        SafeMutable::swap(self, value)
    }

    fn try_mutate<E, F>(&self, mutator: F) -> Result<(), MutateError<E>>
    where
        F: FnOnce(&mut T) -> Result<(), E>,
    {
        SafeMutable::try_mutate(self, mutator)
    }

    fn current(&self) -> Rc<Wrapper<T>> {
        SafeMutable::current(self)
    }
}

impl<T> Clone for SafeMutable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for SafeMutable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cell = self.inner.value.borrow().clone();
        f.debug_struct("SafeMutable")
            .field("value", &Wrapper::new(cell))
            .finish()
    }
}
