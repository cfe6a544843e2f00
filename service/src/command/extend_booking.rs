//! [`Command`] for extending a [`Booking`].

use common::{
    operations::{
        By, Commit, Insert, Lock, Select, Transact, Transacted, Update,
    },
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{booking, lot, user, Booking, Event, Lot},
    infra::{database, Database},
    Service,
};

use super::{Command, MAX_ATTEMPTS};

/// [`Command`] for extending a [`Booking`] by extra [`booking::Hours`],
/// charged at the current [`Lot`] price.
#[derive(Clone, Copy, Debug)]
pub struct ExtendBooking {
    /// [`user::Actor`] extending the [`Booking`].
    ///
    /// Must be the [`Booking`] owner or an admin.
    pub actor: user::Actor,

    /// ID of the [`Booking`] to extend.
    pub booking_id: booking::Id,

    /// Extra [`booking::Hours`] to add.
    pub hours: booking::Hours,
}

impl<Db> Command<ExtendBooking> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Booking>, booking::Id>>,
            Ok = Option<Booking>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>:
        Database<Lock<By<Lot, lot::Id>>, Err = Traced<database::Error>>
            + Database<
                Select<By<Option<Lot>, lot::Id>>,
                Ok = Option<Lot>,
                Err = Traced<database::Error>,
            > + Database<
                Select<By<Option<Booking>, booking::Id>>,
                Ok = Option<Booking>,
                Err = Traced<database::Error>,
            > + Database<
                Update<Booking>,
                Ok = Option<Booking>,
                Err = Traced<database::Error>,
            > + Database<Insert<Lot>, Err = Traced<database::Error>>
            + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Booking;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ExtendBooking,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ExtendBooking {
            actor,
            booking_id,
            hours,
        } = cmd;

        let booking = self
            .database()
            .execute(Select(By::<Option<Booking>, _>::new(booking_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::BookingNotExists(booking_id))
            .map_err(tracerr::wrap!())?;
        if !actor.is_or_admin(booking.user_id) {
            return Err(tracerr::new!(E::NotBookingOwner(actor.id)));
        }
        let lot_id = booking.lot_id;

        for attempt in 1..=MAX_ATTEMPTS {
            let tx = self
                .database()
                .execute(Transact)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;

            // The lot revenue is updated along with the `Booking`.
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

            let mut booking = tx
                .execute(Select(By::<Option<Booking>, _>::new(booking_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::BookingNotExists(booking_id))
                .map_err(tracerr::wrap!())?;
            let amount = booking
                .extend(hours, lot.price_per_hour, DateTime::now())
                .map_err(tracerr::from_and_wrap!(=> E))?;
            lot.stats.add_revenue(amount);

            let Some(booking) = tx
                .execute(Update(booking))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
            else {
                log::debug!(
                    "`Booking(id: {booking_id})` changed concurrently \
                     on attempt {attempt}",
                );
                continue;
            };
            tx.execute(Insert(lot))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            tx.execute(Commit)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            self.relay().publish(Event::status_of(&booking));

            return Ok(booking);
        }

        Err(tracerr::new!(E::ConcurrencyConflict(booking_id)))
    }
}

/// Error of [`ExtendBooking`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Booking`] with the provided ID does not exist.
    #[display("`Booking(id: {_0})` does not exist")]
    #[from(ignore)]
    BookingNotExists(#[error(not(source))] booking::Id),

    /// [`Booking`] kept changing concurrently.
    #[display("`Booking(id: {_0})` is being changed concurrently")]
    #[from(ignore)]
    ConcurrencyConflict(#[error(not(source))] booking::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Lot`] of the [`Booking`] does not exist.
    #[display("`Lot(id: {_0})` does not exist")]
    #[from(ignore)]
    LotNotExists(#[error(not(source))] lot::Id),

    /// [`user::Actor`] is neither the [`Booking`] owner nor an admin.
    #[display("`User(id: {_0})` is not the `Booking` owner")]
    #[from(ignore)]
    NotBookingOwner(#[error(not(source))] user::Id),

    /// [`Booking`] cannot be extended.
    #[display("Invalid `Booking` transition: {_0}")]
    Transition(booking::TransitionError),
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Select};

    use crate::{
        command::{CancelBooking, UpdateLot},
        domain::{booking, lot::Price, Lot},
        infra::Database as _,
        spec::{book, lot, operator_of, owner_of, service},
        Command as _,
    };

    use super::{ExecutionError, ExtendBooking};

    #[tokio::test]
    async fn charges_current_price() {
        let svc = service();
        let lot = lot(&svc, 2).await;
        let booking = book(&svc, &lot).await;
        let amount = booking.amount();

        svc.execute(UpdateLot {
            actor: operator_of(&lot),
            lot_id: lot.id,
            name: None,
            address: None,
            price_per_hour: Some(Price::new("80INR".parse().unwrap()).unwrap()),
            total_slots: None,
        })
        .await
        .unwrap();

        let extended = svc
            .execute(ExtendBooking {
                actor: owner_of(&booking),
                booking_id: booking.id,
                hours: booking::Hours::new(2).unwrap(),
            })
            .await
            .unwrap();

        assert_eq!(extended.total_hours(), booking.total_hours() + 2);
        assert_eq!(
            extended.amount(),
            amount.checked_add("160INR".parse().unwrap()).unwrap(),
        );
        assert_eq!(
            extended.ends_at(),
            booking.starts_at.plus_hours(booking.total_hours() + 2).coerce(),
        );
        assert!(extended.version > booking.version);

        let lot_after = svc
            .database()
            .execute(Select(By::<Option<Lot>, _>::new(lot.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            lot_after.stats.total_revenue,
            amount.checked_add("160INR".parse().unwrap()).unwrap(),
        );
    }

    #[tokio::test]
    async fn rejects_cancelled_booking() {
        let svc = service();
        let lot = lot(&svc, 2).await;
        let booking = book(&svc, &lot).await;
        let owner = owner_of(&booking);
        svc.execute(CancelBooking {
            actor: owner,
            booking_id: booking.id,
            reason: None,
        })
        .await
        .unwrap();

        let err = svc
            .execute(ExtendBooking {
                actor: owner,
                booking_id: booking.id,
                hours: booking::Hours::new(1).unwrap(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Transition(booking::TransitionError::InvalidState(
                booking::Status::Cancelled,
            )),
        ));
    }

    #[tokio::test]
    async fn forbids_lot_operator() {
        let svc = service();
        let lot = lot(&svc, 2).await;
        let booking = book(&svc, &lot).await;

        let err = svc
            .execute(ExtendBooking {
                actor: operator_of(&lot),
                booking_id: booking.id,
                hours: booking::Hours::new(1).unwrap(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NotBookingOwner(_)));
    }
}
