//! [`Command`] for checking a [`Booking`] out.

use common::{
    operations::{By, Commit, Release, Select, Transact, Transacted, Update},
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

/// [`Command`] for marking the [`booking::Vehicle`] of a [`Booking`] as
/// left its [`Lot`], completing the [`Booking`] and freeing its slot.
#[derive(Clone, Copy, Debug)]
pub struct CheckOutBooking {
    /// [`user::Actor`] checking the [`Booking`] out.
    ///
    /// Must be the [`Booking`] owner, the [`Lot`] operator or an admin.
    pub actor: user::Actor,

    /// ID of the [`Booking`] to check out.
    pub booking_id: booking::Id,
}

impl<Db> Command<CheckOutBooking> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Booking>, booking::Id>>,
            Ok = Option<Booking>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Lot>, lot::Id>>,
            Ok = Option<Lot>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Select<By<Option<Booking>, booking::Id>>,
            Ok = Option<Booking>,
            Err = Traced<database::Error>,
        > + Database<
            Update<Booking>,
            Ok = Option<Booking>,
            Err = Traced<database::Error>,
        > + Database<
            Release<By<Option<Lot>, lot::Id>>,
            Ok = Option<Lot>,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Booking;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CheckOutBooking,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CheckOutBooking { actor, booking_id } = cmd;

        let booking = self
            .database()
            .execute(Select(By::<Option<Booking>, _>::new(booking_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::BookingNotExists(booking_id))
            .map_err(tracerr::wrap!())?;
        if !actor.is_or_admin(booking.user_id) {
            let operator_id = self
                .database()
                .execute(Select(By::<Option<Lot>, _>::new(booking.lot_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .map(|lot| lot.operator_id);
            if operator_id != Some(actor.id) {
                return Err(tracerr::new!(E::NotAllowed(actor.id)));
            }
        }

        for attempt in 1..=MAX_ATTEMPTS {
            let tx = self
                .database()
                .execute(Transact)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;

            let mut booking = tx
                .execute(Select(By::<Option<Booking>, _>::new(booking_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::BookingNotExists(booking_id))
                .map_err(tracerr::wrap!())?;
            booking
                .check_out(DateTime::now())
                .map_err(tracerr::from_and_wrap!(=> E))?;

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
            let lot = tx
                .execute(Release(By::new(booking.lot_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;

            tx.execute(Commit)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            self.relay().publish(Event::status_of(&booking));
            if let Some(lot) = lot {
                self.relay().publish(Event::slots_of(&lot));
            }

            return Ok(booking);
        }

        Err(tracerr::new!(E::ConcurrencyConflict(booking_id)))
    }
}

/// Error of [`CheckOutBooking`] [`Command`] execution.
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

    /// [`user::Actor`] is neither the [`Booking`] owner, nor the [`Lot`]
    /// operator, nor an admin.
    #[display("`User(id: {_0})` is not allowed to check the `Booking` out")]
    #[from(ignore)]
    NotAllowed(#[error(not(source))] user::Id),

    /// [`Booking`] cannot be checked out.
    #[display("Invalid `Booking` transition: {_0}")]
    Transition(booking::TransitionError),
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Select};

    use crate::{
        command::CheckInBooking,
        domain::{booking, Lot},
        infra::Database as _,
        spec::{book, driver, lot, operator_of, owner_of, service},
        Command as _,
    };

    use super::{CheckOutBooking, ExecutionError};

    #[tokio::test]
    async fn completes_booking_and_frees_slot() {
        let svc = service();
        let lot = lot(&svc, 1).await;
        let booking = book(&svc, &lot).await;
        svc.execute(CheckInBooking {
            actor: owner_of(&booking),
            booking_id: booking.id,
        })
        .await
        .unwrap();

        let done = svc
            .execute(CheckOutBooking {
                actor: operator_of(&lot),
                booking_id: booking.id,
            })
            .await
            .unwrap();
        assert_eq!(done.status, booking::Status::Completed);
        assert!(done.exited_at.is_some());

        let lot = svc
            .database()
            .execute(Select(By::<Option<Lot>, _>::new(lot.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(lot.available_slots(), 1);
    }

    #[tokio::test]
    async fn requires_active_booking() {
        let svc = service();
        let lot = lot(&svc, 1).await;
        let booking = book(&svc, &lot).await;

        let err = svc
            .execute(CheckOutBooking {
                actor: owner_of(&booking),
                booking_id: booking.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Transition(booking::TransitionError::NotActive(
                booking::Status::Confirmed,
            )),
        ));
    }

    #[tokio::test]
    async fn forbids_strangers() {
        let svc = service();
        let lot = lot(&svc, 1).await;
        let booking = book(&svc, &lot).await;

        let err = svc
            .execute(CheckOutBooking {
                actor: driver(),
                booking_id: booking.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NotAllowed(_)));
    }
}
