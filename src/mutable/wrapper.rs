use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

/// The object a mutable store publishes.
///
/// A wrapper holds a shared handle to the store's value. Subscribers detect
/// change by wrapper identity ([`Wrapper::same`]), not by comparing values,
/// so the value itself is never cloned to signal an update.
pub struct Wrapper<T> {
    value: Rc<RefCell<T>>,
}

impl<T> Wrapper<T> {
    pub(crate) fn new(value: Rc<RefCell<T>>) -> Self {
        Self { value }
    }

    /// Borrow the current value.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a mutator running on the same store.
    pub fn value(&self) -> Ref<'_, T> {
        self.value.borrow()
    }

    /// Mutably borrow the value, bypassing the store.
    ///
    /// Nothing is published; call `touch` on the store afterwards so
    /// subscribers learn about the change.
    ///
    /// # Panics
    ///
    /// Panics if the value is already borrowed.
    pub fn value_mut(&self) -> RefMut<'_, T> {
        self.value.borrow_mut()
    }

    /// Read the current value through a closure.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    /// Whether `a` and `b` are the same published wrapper.
    pub fn same(a: &Rc<Self>, b: &Rc<Self>) -> bool {
        Rc::ptr_eq(a, b)
    }

    /// Whether both wrappers point at the same underlying value.
    pub fn shares_value(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.value, &other.value)
    }
}

impl<T: Clone> Wrapper<T> {
    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }
}

impl<T: fmt::Debug> fmt::Debug for Wrapper<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value.try_borrow() {
            Ok(value) => f.debug_struct("Wrapper").field("value", &*value).finish(),
            Err(_) => f
                .debug_struct("Wrapper")
                .field("value", &"<borrowed>")
                .finish(),
        }
    }
}
