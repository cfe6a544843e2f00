//! In-memory [`Database`] implementation.

mod impls;

use std::{collections::HashMap, future::Future, sync::Arc};

use common::operations::{Commit, Transact};
use derive_more::{Display, Error as StdError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracerr::Traced;

use crate::{
    domain::{booking, lot, Booking, Lot},
    infra::{database, Database},
};

/// In-memory [`Database`] client.
///
/// Transactions are serialized: a [`Tx`] holds the whole [`State`] locked
/// until it's committed or dropped, so a [`NonTx`] client must not be used
/// while a [`Tx`] is alive on the same task.
#[derive(Clone, Debug, Default)]
pub struct Memory<T = NonTx>(T);

impl Memory {
    /// Creates a new empty [`Memory`] database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Data stored in a [`Memory`] database.
#[derive(Clone, Debug, Default)]
pub struct State {
    /// Stored [`Lot`]s.
    lots: HashMap<lot::Id, Lot>,

    /// Stored [`Booking`]s.
    bookings: HashMap<booking::Id, Booking>,
}

/// Non-transactional [`Memory`] client.
#[derive(Clone, Debug, Default)]
pub struct NonTx(Arc<Mutex<State>>);

/// Transactional [`Memory`] client.
///
/// Changes are rolled back once the last clone of this client is dropped
/// without a [`Commit`].
#[derive(Clone, Debug)]
pub struct Tx(Arc<Mutex<Option<TxGuard>>>);

/// Exclusive access to a [`State`] along with its snapshot taken when the
/// transaction started.
#[derive(Debug)]
struct TxGuard {
    /// Locked [`State`].
    state: OwnedMutexGuard<State>,

    /// Snapshot to restore the [`State`] from, unless committed.
    backup: Option<State>,
}

impl Drop for TxGuard {
    fn drop(&mut self) {
        if let Some(backup) = self.backup.take() {
            *self.state = backup;
        }
    }
}

/// Access to a [`State`].
pub trait Storage {
    /// Runs the provided function with an exclusive access to the [`State`].
    ///
    /// # Errors
    ///
    /// If the [`State`] is not accessible anymore.
    fn with<R>(
        &self,
        f: impl FnOnce(&mut State) -> R,
    ) -> impl Future<Output = Result<R, Traced<database::Error>>>;
}

impl Storage for NonTx {
    async fn with<R>(
        &self,
        f: impl FnOnce(&mut State) -> R,
    ) -> Result<R, Traced<database::Error>> {
        Ok(f(&mut *self.0.lock().await))
    }
}

impl Storage for Tx {
    async fn with<R>(
        &self,
        f: impl FnOnce(&mut State) -> R,
    ) -> Result<R, Traced<database::Error>> {
        let mut guard = self.0.lock().await;
        let tx = guard.as_mut().ok_or_else(|| {
            tracerr::new!(database::Error::from(Error::Committed))
        })?;
        Ok(f(&mut *tx.state))
    }
}

impl Database<Transact> for Memory<NonTx> {
    type Ok = Memory<Tx>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        let Memory(NonTx(state)) = self;
        let state = Arc::clone(state).lock_owned().await;
        let backup = Some(state.clone());
        Ok(Memory(Tx(Arc::new(Mutex::new(Some(TxGuard {
            state,
            backup,
        }))))))
    }
}

impl Database<Transact> for Memory<Tx> {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        let Memory(Tx(tx)) = self;
        let mut tx = tx.lock().await.take().ok_or_else(|| {
            tracerr::new!(database::Error::from(Error::Committed))
        })?;
        tx.backup = None;
        Ok(())
    }
}

/// [`Memory`] database error.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Transaction has been committed already.
    #[display("Transaction is already committed")]
    Committed,

    /// Unique constraint is violated.
    #[display("Unique constraint `{_0}` is violated")]
    UniqueViolation(#[error(not(source))] &'static str),
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint,
    /// or of any constraint if [`None`] is provided.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            Self::UniqueViolation(c) => constraint.map_or(true, |n| n == *c),
            Self::Committed => false,
        }
    }
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Commit, Insert, Select, Transact};

    use crate::{
        domain::{
            lot::{Address, Capacity, Coordinates, Name, Price},
            user, Lot,
        },
        infra::Database as _,
    };

    use super::Memory;

    fn lot() -> Lot {
        Lot::new(
            user::Id::new(),
            Name::new("Central").unwrap(),
            Address::new("1 Main St").unwrap(),
            Coordinates::new(12.97, 77.59).unwrap(),
            Capacity::new(10).unwrap(),
            Price::new("50INR".parse().unwrap()).unwrap(),
        )
    }

    #[tokio::test]
    async fn commits_changes() {
        let db = Memory::new();
        let lot = lot();

        let tx = db.execute(Transact).await.unwrap();
        tx.execute(Insert(lot.clone())).await.unwrap();
        tx.execute(Commit).await.unwrap();
        drop(tx);

        let stored = db
            .execute(Select(By::<Option<Lot>, _>::new(lot.id)))
            .await
            .unwrap();
        assert_eq!(stored.map(|l| l.id), Some(lot.id));
    }

    #[tokio::test]
    async fn rolls_back_uncommitted_changes() {
        let db = Memory::new();
        let lot = lot();

        let tx = db.execute(Transact).await.unwrap();
        tx.execute(Insert(lot.clone())).await.unwrap();
        drop(tx);

        let stored = db
            .execute(Select(By::<Option<Lot>, _>::new(lot.id)))
            .await
            .unwrap();
        assert!(stored.is_none());
    }

    #[tokio::test]
    async fn rejects_use_after_commit() {
        let db = Memory::new();

        let tx = db.execute(Transact).await.unwrap();
        tx.execute(Commit).await.unwrap();

        assert!(tx.execute(Commit).await.is_err());
        assert!(tx.execute(Insert(lot())).await.is_err());
    }
}
