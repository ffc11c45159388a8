//! Stores that wrap a mutable value.
//!
//! Both stores publish a [`Wrapper`] around the value instead of the value
//! itself. Subscribers treat a change of wrapper identity as "the value
//! changed", which lets the value be mutated in place instead of cloned.
//!
//! - [`Mutable`] alternates between two fixed wrappers and allocates nothing
//!   per update.
//! - [`SafeMutable`] allocates a new wrapper per update, so every published
//!   wrapper is distinct from all earlier ones.

mod mutable;
mod safe_mutable;
mod wrapper;

use std::rc::Rc;

use crate::error::MutateError;
use crate::store::Subscription;

pub use mutable::{mutable, Mutable};
pub use safe_mutable::{safe_mutable, SafeMutable};
pub use wrapper::Wrapper;

/// The contract shared by [`Mutable`] and [`SafeMutable`].
///
/// Every operation that publishes does so synchronously: all current
/// subscribers have been called, in subscription order, before it returns.
/// Called from inside a subscriber, the publish is queued behind the
/// notification in progress and delivered before that one's caller returns.
pub trait MutableStore<T> {
    /// Subscribe to published wrappers. The callback runs immediately with
    /// the current wrapper.
    fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Rc<Wrapper<T>>) + 'static;

    /// Mutate the value in place, then publish.
    fn mutate<F>(&self, mutator: F)
    where
        F: FnOnce(&mut T);

    /// Publish without mutating, for values changed through some other path.
    fn touch(&self);

    /// Replace the value, then publish.
    fn swap(&self, value: T);

    /// Like [`mutate`](MutableStore::mutate), but publishes only if the
    /// mutator returns `Ok`.
    fn try_mutate<E, F>(&self, mutator: F) -> Result<(), MutateError<E>>
    where
        F: FnOnce(&mut T) -> Result<(), E>;

    /// The wrapper most recently published.
    fn current(&self) -> Rc<Wrapper<T>>;
}
