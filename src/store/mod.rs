//! The publish/subscribe primitive the mutable stores are built on.
//!
//! A [`Writable`] holds a value and calls its subscribers synchronously, in
//! registration order, whenever a new value is set.

mod store;

pub use store::{Subscription, Writable};
