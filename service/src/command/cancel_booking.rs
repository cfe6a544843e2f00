//! [`Command`] for cancelling a [`Booking`].

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

/// [`Command`] for cancelling a [`Booking`], freeing its slot if it still
/// holds one.
#[derive(Clone, Debug)]
pub struct CancelBooking {
    /// [`user::Actor`] cancelling the [`Booking`].
    ///
    /// Must be the [`Booking`] owner or an admin.
    pub actor: user::Actor,

    /// ID of the [`Booking`] to cancel.
    pub booking_id: booking::Id,

    /// Optional reason of the cancellation.
    pub reason: Option<booking::Note>,
}

impl<Db> Command<CancelBooking> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Booking>, booking::Id>>,
            Ok = Option<Booking>,
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
        cmd: CancelBooking,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CancelBooking {
            actor,
            booking_id,
            reason,
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
            let held_slot = booking.holds_slot();
            booking
                .cancel(reason.clone(), DateTime::now())
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
            let lot = if held_slot {
                tx.execute(Release(By::new(booking.lot_id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
            } else {
                None
            };

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

/// Error of [`CancelBooking`] [`Command`] execution.
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

    /// [`user::Actor`] is neither the [`Booking`] owner nor an admin.
    #[display("`User(id: {_0})` is not the `Booking` owner")]
    #[from(ignore)]
    NotBookingOwner(#[error(not(source))] user::Id),

    /// [`Booking`] cannot be cancelled.
    #[display("Invalid `Booking` transition: {_0}")]
    Transition(booking::TransitionError),
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Select};

    use crate::{
        command::{CheckInBooking, CheckOutBooking},
        domain::{booking, Lot},
        infra::{Database as _, Memory},
        spec::{admin, book, lot, operator_of, owner_of, service},
        Command as _, Service,
    };

    use super::{CancelBooking, ExecutionError};

    async fn available(svc: &Service<Memory>, lot: &Lot) -> u16 {
        svc.database()
            .execute(Select(By::<Option<Lot>, _>::new(lot.id)))
            .await
            .unwrap()
            .unwrap()
            .available_slots()
    }

    #[tokio::test]
    async fn frees_slot_with_reason() {
        let svc = service();
        let lot = lot(&svc, 1).await;
        let booking = book(&svc, &lot).await;
        assert_eq!(available(&svc, &lot).await, 0);

        let cancelled = svc
            .execute(CancelBooking {
                actor: owner_of(&booking),
                booking_id: booking.id,
                reason: Some(booking::Note::new("Plans changed").unwrap()),
            })
            .await
            .unwrap();

        assert_eq!(cancelled.status, booking::Status::Cancelled);
        let cancellation = cancelled.cancellation.unwrap();
        assert_eq!(
            cancellation.reason.map(|r| r.to_string()).as_deref(),
            Some("Plans changed"),
        );
        assert_eq!(available(&svc, &lot).await, 1);
    }

    #[tokio::test]
    async fn frees_slot_of_parked_vehicle() {
        let svc = service();
        let lot = lot(&svc, 1).await;
        let booking = book(&svc, &lot).await;
        svc.execute(CheckInBooking {
            actor: owner_of(&booking),
            booking_id: booking.id,
        })
        .await
        .unwrap();

        _ = svc
            .execute(CancelBooking {
                actor: admin(),
                booking_id: booking.id,
                reason: None,
            })
            .await
            .unwrap();

        assert_eq!(available(&svc, &lot).await, 1);
    }

    #[tokio::test]
    async fn rejects_finished_booking() {
        let svc = service();
        let lot = lot(&svc, 1).await;
        let booking = book(&svc, &lot).await;
        let owner = owner_of(&booking);
        svc.execute(CheckInBooking {
            actor: owner,
            booking_id: booking.id,
        })
        .await
        .unwrap();
        svc.execute(CheckOutBooking {
            actor: owner,
            booking_id: booking.id,
        })
        .await
        .unwrap();

        let err = svc
            .execute(CancelBooking {
                actor: owner,
                booking_id: booking.id,
                reason: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Transition(booking::TransitionError::InvalidState(
                booking::Status::Completed,
            )),
        ));
        assert_eq!(available(&svc, &lot).await, 1);
    }

    #[tokio::test]
    async fn forbids_lot_operator() {
        let svc = service();
        let lot = lot(&svc, 1).await;
        let booking = book(&svc, &lot).await;

        let err = svc
            .execute(CancelBooking {
                actor: operator_of(&lot),
                booking_id: booking.id,
                reason: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NotBookingOwner(_)));
    }
}
