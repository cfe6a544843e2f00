//! Operation markers dispatched through a [`Handler`].
//!
//! Each marker wraps the operation's argument, so a single type may handle
//! many operations over the same value, like `Handler<Select<By<Lot, Id>>>`
//! next to `Handler<Insert<Lot>>`.

use std::marker::PhantomData;

use crate::Handler;

/// Stores a new value.
#[derive(Clone, Copy, Debug)]
pub struct Insert<T>(pub T);

/// Overwrites a stored value.
#[derive(Clone, Copy, Debug)]
pub struct Update<T>(pub T);

/// Reads stored values.
#[derive(Clone, Copy, Debug)]
pub struct Select<T>(pub T);

/// Locks a stored value until the current transaction ends.
#[derive(Clone, Copy, Debug)]
pub struct Lock<T>(pub T);

/// Atomically takes one unit of a limited resource (a parking slot, for
/// example).
///
/// Either the unit is taken, or nothing is changed at all.
#[derive(Clone, Copy, Debug)]
pub struct Acquire<T>(pub T);

/// Gives back one unit taken by an [`Acquire`].
#[derive(Clone, Copy, Debug)]
pub struct Release<T>(pub T);

/// Starts a long-running process.
#[derive(Clone, Copy, Debug)]
pub struct Start<T>(pub T);

/// Performs a single step of some process.
#[derive(Clone, Copy, Debug)]
pub struct Perform<T>(pub T);

/// Opens a transaction.
#[derive(Clone, Copy, Debug)]
pub struct Transact;

/// Transactional counterpart of a [`Handler`] of [`Transact`].
pub type Transacted<T> = <T as Handler<Transact>>::Ok;

/// Commits a transaction.
#[derive(Clone, Copy, Debug)]
pub struct Commit;

/// Criterion `B` to pick some `W` values by.
#[derive(Clone, Copy, Debug)]
pub struct By<W, B> {
    /// Picked values type.
    _what: PhantomData<W>,

    /// Criterion itself.
    by: B,
}

impl<W, B> By<W, B> {
    /// Wraps the provided criterion.
    #[must_use]
    pub fn new(by: B) -> Self {
        Self {
            _what: PhantomData,
            by,
        }
    }

    /// Returns the wrapped criterion.
    #[must_use]
    pub fn inner(&self) -> &B {
        &self.by
    }

    /// Unwraps the criterion.
    #[must_use]
    pub fn into_inner(self) -> B {
        self.by
    }
}
