//! Error types for fallible store operations.

use thiserror::Error;

/// Errors raised by the stores themselves.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// The interior value is borrowed elsewhere, either by a mutator that is
    /// still running or by a reader holding a `Ref` from [`Wrapper::value`].
    ///
    /// [`Wrapper::value`]: crate::Wrapper::value
    #[error("store value is already borrowed")]
    ValueBorrowed,
}

/// Error returned by `try_mutate`.
///
/// The mutator's own error is passed through untouched in
/// [`MutateError::Mutator`]. Nothing is published in either case.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MutateError<E> {
    /// The store refused the mutation before running the mutator.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The mutator returned this error.
    #[error("mutator failed: {0}")]
    Mutator(E),
}

impl<E> MutateError<E> {
    /// Returns the mutator's error, if that is what failed.
    pub fn into_mutator_error(self) -> Option<E> {
        match self {
            MutateError::Mutator(e) => Some(e),
            MutateError::Store(_) => None,
        }
    }
}
