//! # Mutstore
//!
//! Reactive stores around values that are mutated in place.
//!
//! A normal writable store signals change by publishing a new value, which
//! means cloning large structures (or being unable to use uncloneable ones).
//! The stores here publish a small [`Wrapper`] around a shared value instead,
//! and a new wrapper identity is the change signal.
//!
//! ## Stores
//!
//! - [`Mutable<T>`] - double-buffered: alternates between two fixed wrappers,
//!   no allocation per update
//! - [`SafeMutable<T>`] - allocates a new wrapper per update, so every
//!   published wrapper is distinct
//! - [`Writable<T>`] - the underlying publish/subscribe store
//!
//! Both mutable stores implement [`MutableStore`].
//!
//! ```
//! use mutstore::{mutable, Wrapper};
//!
//! let store = mutable(vec![1, 2, 3]);
//! let before = store.current();
//! let sub = store.subscribe(|w| println!("len = {}", w.value().len()));
//!
//! store.mutate(|v| v.push(4));
//!
//! let after = store.current();
//! assert!(!Wrapper::same(&before, &after));
//! assert_eq!(after.value().len(), 4);
//! sub.unsubscribe();
//! ```
//!
//! Everything is single-threaded: handles are `Rc`-based and not `Send`.

pub mod error;
pub mod mutable;
pub mod store;

// Re-export main types for convenience
pub use error::{MutateError, StoreError};
pub use mutable::{mutable, safe_mutable, Mutable, MutableStore, SafeMutable, Wrapper};
pub use store::{Subscription, Writable};
