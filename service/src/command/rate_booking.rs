//! [`Command`] for rating a [`Booking`].

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
    domain::{booking, lot, user, Booking, Lot},
    infra::{database, Database},
    Service,
};

use super::{Command, MAX_ATTEMPTS};

/// [`Command`] for rating a completed [`Booking`], accounting the
/// [`booking::Score`] in the [`Lot`] rating.
#[derive(Clone, Debug)]
pub struct RateBooking {
    /// [`user::Actor`] rating the [`Booking`].
    pub actor: user::Actor,

    /// ID of the [`Booking`] to rate.
    pub booking_id: booking::Id,

    /// Given [`booking::Score`].
    pub score: booking::Score,

    /// Optional comment.
    pub comment: Option<booking::Note>,
}

impl<Db> Command<RateBooking> for Service<Db>
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
        cmd: RateBooking,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RateBooking {
            actor,
            booking_id,
            score,
            comment,
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

            // The lot rating is updated along with the `Booking`.
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
            booking
                .rate(score, comment.clone(), DateTime::now())
                .map_err(tracerr::from_and_wrap!(=> E))?;
            lot.rating.add(score.get());

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

            return Ok(booking);
        }

        Err(tracerr::new!(E::ConcurrencyConflict(booking_id)))
    }
}

/// Error of [`RateBooking`] [`Command`] execution.
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

    /// [`Booking`] cannot be rated.
    #[display("Invalid `Booking` transition: {_0}")]
    Transition(booking::TransitionError),
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Select};
    use rust_decimal::Decimal;

    use crate::{
        command::{CheckInBooking, CheckOutBooking},
        domain::{booking, Booking, Lot},
        infra::{Database as _, Memory},
        spec::{book, lot, operator_of, owner_of, service},
        Command as _, Service,
    };

    use super::{ExecutionError, RateBooking};

    async fn complete(svc: &Service<Memory>, lot: &Lot) -> Booking {
        let booking = book(svc, lot).await;
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
        .unwrap()
    }

    fn rate(booking: &Booking, score: u8) -> RateBooking {
        RateBooking {
            actor: owner_of(booking),
            booking_id: booking.id,
            score: booking::Score::new(score).unwrap(),
            comment: None,
        }
    }

    #[tokio::test]
    async fn updates_lot_rating_once() {
        let svc = service();
        let lot = lot(&svc, 2).await;
        let first = complete(&svc, &lot).await;
        let second = complete(&svc, &lot).await;

        let rated = svc
            .execute(RateBooking {
                comment: Some(booking::Note::new("Easy to find").unwrap()),
                ..rate(&first, 5)
            })
            .await
            .unwrap();
        assert_eq!(rated.rating.map(|r| r.score.get()), Some(5));
        svc.execute(rate(&second, 2)).await.unwrap();

        let err = svc.execute(rate(&first, 1)).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::Transition(booking::TransitionError::AlreadyRated),
        ));

        let lot = svc
            .database()
            .execute(Select(By::<Option<Lot>, _>::new(lot.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(lot.rating.average(), Some(Decimal::new(35, 1)));
    }

    #[tokio::test]
    async fn requires_completed_booking() {
        let svc = service();
        let lot = lot(&svc, 2).await;
        let booking = book(&svc, &lot).await;

        let err = svc.execute(rate(&booking, 4)).await.unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Transition(booking::TransitionError::InvalidState(
                booking::Status::Confirmed,
            )),
        ));
    }

    #[tokio::test]
    async fn forbids_lot_operator() {
        let svc = service();
        let lot = lot(&svc, 2).await;
        let booking = complete(&svc, &lot).await;

        let err = svc
            .execute(RateBooking {
                actor: operator_of(&lot),
                ..rate(&booking, 4)
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NotBookingOwner(_)));
    }
}
