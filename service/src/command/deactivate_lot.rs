//! [`Command`] for deactivating a [`Lot`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{lot, user, Lot},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for deactivating a [`Lot`], so no new [`Booking`]s can be made
/// in it.
///
/// Existing [`Booking`]s are not affected.
///
/// [`Booking`]: crate::domain::Booking
#[derive(Clone, Copy, Debug)]
pub struct DeactivateLot {
    /// [`user::Actor`] deactivating the [`Lot`].
    pub actor: user::Actor,

    /// ID of the [`Lot`] to deactivate.
    pub lot_id: lot::Id,
}

impl<Db> Command<DeactivateLot> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Lot>, lot::Id>>,
            Ok = Option<Lot>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>:
        Database<Lock<By<Lot, lot::Id>>, Err = Traced<database::Error>>
            + Database<
                Select<By<Option<Lot>, lot::Id>>,
                Ok = Option<Lot>,
                Err = Traced<database::Error>,
            > + Database<Insert<Lot>, Err = Traced<database::Error>>
            + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Lot;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: DeactivateLot,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeactivateLot { actor, lot_id } = cmd;

        let lot = self
            .database()
            .execute(Select(By::<Option<Lot>, _>::new(lot_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::LotNotExists(lot_id))
            .map_err(tracerr::wrap!())?;
        if !actor.is_or_admin(lot.operator_id) {
            return Err(tracerr::new!(E::NotLotOperator(actor.id)));
        }
        if !lot.is_active() {
            return Ok(lot);
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::new(lot_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut lot = tx
            .execute(Select(By::<Option<Lot>, _>::new(lot_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::LotNotExists(lot_id))
            .map_err(tracerr::wrap!())?;
        if !lot.is_active() {
            return Ok(lot);
        }
        lot.deactivated_at = Some(DateTime::now().coerce());

        tx.execute(Insert(lot.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(lot)
    }
}

/// Error of [`DeactivateLot`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Lot`] with the provided ID does not exist.
    #[display("`Lot(id: {_0})` does not exist")]
    #[from(ignore)]
    LotNotExists(#[error(not(source))] lot::Id),

    /// [`user::Actor`] is neither the [`Lot`] operator nor an admin.
    #[display("`User(id: {_0})` is not the `Lot` operator")]
    #[from(ignore)]
    NotLotOperator(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        spec::{driver, lot, operator_of, service},
        Command as _,
    };

    use super::{DeactivateLot, ExecutionError};

    #[tokio::test]
    async fn deactivates_once() {
        let svc = service();
        let lot = lot(&svc, 3).await;
        let cmd = DeactivateLot {
            actor: operator_of(&lot),
            lot_id: lot.id,
        };

        let deactivated = svc.execute(cmd).await.unwrap();
        assert!(!deactivated.is_active());

        let again = svc.execute(cmd).await.unwrap();
        assert_eq!(again.deactivated_at, deactivated.deactivated_at);
    }

    #[tokio::test]
    async fn forbids_strangers() {
        let svc = service();
        let lot = lot(&svc, 3).await;

        let err = svc
            .execute(DeactivateLot {
                actor: driver(),
                lot_id: lot.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NotLotOperator(_)));
    }
}
