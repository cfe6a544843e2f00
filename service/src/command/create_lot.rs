//! [`Command`] for creating a new [`Lot`].

use common::operations::{Commit, Insert, Transact, Transacted};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{lot, user, Lot},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Lot`].
#[derive(Clone, Debug)]
pub struct CreateLot {
    /// [`user::Actor`] creating the [`Lot`], becoming its operator.
    pub actor: user::Actor,

    /// [`lot::Name`] of a new [`Lot`].
    pub name: lot::Name,

    /// [`lot::Address`] of a new [`Lot`].
    pub address: lot::Address,

    /// [`lot::Coordinates`] of a new [`Lot`].
    pub location: lot::Coordinates,

    /// Total number of slots in a new [`Lot`].
    pub total_slots: lot::Capacity,

    /// Hourly [`lot::Price`] of a new [`Lot`].
    pub price_per_hour: lot::Price,
}

impl<Db> Command<CreateLot> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Insert<Lot>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Lot;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateLot) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateLot {
            actor,
            name,
            address,
            location,
            total_slots,
            price_per_hour,
        } = cmd;

        if !actor.is_operator() {
            return Err(tracerr::new!(E::NotOperator(actor.id)));
        }

        let lot = Lot::new(
            actor.id,
            name,
            address,
            location,
            total_slots,
            price_per_hour,
        );

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

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

/// Error of [`CreateLot`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`user::Actor`] is not allowed to manage [`Lot`]s.
    #[display("`User(id: {_0})` is not an operator")]
    #[from(ignore)]
    NotOperator(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::{
            lot::{Address, Capacity, Coordinates, Name, Price},
            user,
        },
        spec::{admin, driver, operator, service},
        Command as _,
    };

    use super::{CreateLot, ExecutionError};

    fn create_lot(actor: user::Actor) -> CreateLot {
        CreateLot {
            actor,
            name: Name::new("Central Mall").unwrap(),
            address: Address::new("1 Main St").unwrap(),
            location: Coordinates::new(12.97, 77.59).unwrap(),
            total_slots: Capacity::new(20).unwrap(),
            price_per_hour: Price::new("50INR".parse().unwrap()).unwrap(),
        }
    }

    #[tokio::test]
    async fn creates_fully_available_lot() {
        let svc = service();
        let operator = operator();

        let lot = svc.execute(create_lot(operator)).await.unwrap();

        assert_eq!(lot.operator_id, operator.id);
        assert_eq!(lot.available_slots(), 20);
        assert!(lot.is_active());

        assert!(svc.execute(create_lot(admin())).await.is_ok());
    }

    #[tokio::test]
    async fn forbids_drivers() {
        let svc = service();
        let driver = driver();

        let err = svc.execute(create_lot(driver)).await.unwrap_err();

        assert!(
            matches!(err.as_ref(), ExecutionError::NotOperator(id) if *id == driver.id),
            "wrong error: {err}",
        );
    }
}
