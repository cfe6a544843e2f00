//! [`Command`] for updating a [`Lot`].

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{lot, user, Event, Lot},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for updating a [`Lot`].
///
/// Only the provided fields are changed.
#[derive(Clone, Debug)]
pub struct UpdateLot {
    /// [`user::Actor`] updating the [`Lot`].
    pub actor: user::Actor,

    /// ID of the [`Lot`] to update.
    pub lot_id: lot::Id,

    /// New [`lot::Name`] of the [`Lot`].
    pub name: Option<lot::Name>,

    /// New [`lot::Address`] of the [`Lot`].
    pub address: Option<lot::Address>,

    /// New hourly [`lot::Price`] of the [`Lot`].
    ///
    /// Must be in the same currency as the current one.
    pub price_per_hour: Option<lot::Price>,

    /// New total number of slots in the [`Lot`].
    pub total_slots: Option<lot::Capacity>,
}

impl<Db> Command<UpdateLot> for Service<Db>
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

    async fn execute(&self, cmd: UpdateLot) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateLot {
            actor,
            lot_id,
            name,
            address,
            price_per_hour,
            total_slots,
        } = cmd;

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
        if let Some(price) = price_per_hour {
            if price.currency() != lot.price_per_hour.currency() {
                return Err(tracerr::new!(E::CurrencyMismatch(lot_id)));
            }
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Serialize with concurrent reservations.
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

        if let Some(name) = name {
            lot.name = name;
        }
        if let Some(address) = address {
            lot.address = address;
        }
        if let Some(price) = price_per_hour {
            lot.price_per_hour = price;
        }
        let resized = total_slots.filter(|&total| total != lot.total_slots);
        if let Some(total) = resized {
            lot.resize(total);
        }

        tx.execute(Insert(lot.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        if resized.is_some() {
            self.relay().publish(Event::slots_of(&lot));
        }

        Ok(lot)
    }
}

/// Error of [`UpdateLot`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// New [`lot::Price`] is in a different currency.
    #[display("`Lot(id: {_0})` price currency cannot be changed")]
    #[from(ignore)]
    CurrencyMismatch(#[error(not(source))] lot::Id),

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
