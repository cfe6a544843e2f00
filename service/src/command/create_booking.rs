//! [`Command`] for creating a new [`Booking`].

use common::operations::{
    Acquire, By, Commit, Insert, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{booking, lot, user, Booking, Event, Lot},
    infra::{
        database::{self, QR_TOKEN_CONSTRAINT},
        Database,
    },
    Service,
};

use super::{Command, MAX_ATTEMPTS};

/// [`Command`] for creating a new [`Booking`], reserving a slot in a [`Lot`].
///
/// Either the slot is reserved and the [`Booking`] is stored, or nothing
/// changes at all.
#[derive(Clone, Debug)]
pub struct CreateBooking {
    /// [`user::Actor`] booking the slot.
    pub actor: user::Actor,

    /// ID of the [`Lot`] to book a slot in.
    pub lot_id: lot::Id,

    /// [`booking::Vehicle`] to be parked.
    pub vehicle: booking::Vehicle,

    /// Booked [`booking::Hours`].
    pub duration: booking::Hours,

    /// Requested start of the [`Booking`], if not right away.
    pub starts_at: Option<booking::StartDateTime>,
}

impl<Db> Command<CreateBooking> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Lot>, lot::Id>>,
            Ok = Option<Lot>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Booking>, booking::QrToken>>,
            Ok = Option<Booking>,
            Err = Traced<database::Error>,
        > + Database<
            Acquire<By<Option<Lot>, (lot::Id, booking::Hours)>>,
            Ok = Option<Lot>,
            Err = Traced<database::Error>,
        > + Database<Insert<Booking>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Booking;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateBooking,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateBooking {
            actor,
            lot_id,
            vehicle,
            duration,
            starts_at,
        } = cmd;

        let mut attempt = 1;
        loop {
            let tx = self
                .database()
                .execute(Transact)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;

            let lot = tx
                .execute(Select(By::<Option<Lot>, _>::new(lot_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::LotNotExists(lot_id))
                .map_err(tracerr::wrap!())?;
            if !lot.is_active() {
                return Err(tracerr::new!(E::LotInactive(lot_id)));
            }

            let mut qr_token = booking::QrToken::generate();
            for _ in 1..MAX_ATTEMPTS {
                let taken = tx
                    .execute(Select(By::<Option<Booking>, _>::new(
                        qr_token.clone(),
                    )))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .is_some();
                if !taken {
                    break;
                }
                qr_token = booking::QrToken::generate();
            }

            let lot = tx
                .execute(Acquire(By::new((lot_id, duration))))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::NoSlotsAvailable(lot_id))
                .map_err(tracerr::wrap!())?;

            let booking = Booking::new(
                actor.id,
                &lot,
                vehicle.clone(),
                duration,
                starts_at,
                qr_token,
            );

            match tx.execute(Insert(booking.clone())).await {
                Ok(_) => {}
                Err(e)
                    if attempt < MAX_ATTEMPTS
                        && e.as_ref()
                            .is_unique_violation(Some(QR_TOKEN_CONSTRAINT)) =>
                {
                    log::debug!(
                        "`QrToken` collision on attempt {attempt}, retrying",
                    );
                    attempt += 1;
                    continue;
                }
                Err(e) => {
                    return Err(tracerr::map_from_and_wrap!(=> E)(e));
                }
            }

            tx.execute(Commit)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            self.relay().publish_all([
                Event::slots_of(&lot),
                Event::status_of(&booking),
            ]);

            return Ok(booking);
        }
    }
}

/// Error of [`CreateBooking`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Lot`] is deactivated.
    #[display("`Lot(id: {_0})` is inactive")]
    #[from(ignore)]
    LotInactive(#[error(not(source))] lot::Id),

    /// [`Lot`] with the provided ID does not exist.
    #[display("`Lot(id: {_0})` does not exist")]
    #[from(ignore)]
    LotNotExists(#[error(not(source))] lot::Id),

    /// [`Lot`] has no free slots.
    #[display("`Lot(id: {_0})` has no slots available")]
    #[from(ignore)]
    NoSlotsAvailable(#[error(not(source))] lot::Id),
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Select};
    use futures::future;

    use crate::{
        command::DeactivateLot,
        domain::{booking, Booking, Lot},
        infra::Database as _,
        spec::{driver, lot, operator_of, service, vehicle},
        Command as _,
    };

    use super::{CreateBooking, ExecutionError};

    fn create(lot: &Lot, hours: u8) -> CreateBooking {
        CreateBooking {
            actor: driver(),
            lot_id: lot.id,
            vehicle: vehicle(),
            duration: booking::Hours::new(hours).unwrap(),
            starts_at: None,
        }
    }

    #[tokio::test]
    async fn reserves_slot_and_charges() {
        let svc = service();
        let lot = lot(&svc, 5).await;

        let booking = svc.execute(create(&lot, 3)).await.unwrap();

        assert_eq!(booking.status, booking::Status::Confirmed);
        assert_eq!(booking.payment_status, booking::PaymentStatus::Paid);
        assert_eq!(booking.amount(), "150INR".parse().unwrap());

        let stored = svc
            .database()
            .execute(Select(By::<Option<Booking>, _>::new(
                booking.qr_token.clone(),
            )))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, booking.id);

        let lot = svc
            .database()
            .execute(Select(By::<Option<Lot>, _>::new(lot.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(lot.available_slots(), 4);
        assert_eq!(lot.stats.total_bookings, 1);
        assert_eq!(lot.stats.total_revenue, "150INR".parse().unwrap());
    }

    #[tokio::test]
    async fn never_oversells() {
        let svc = service();
        let lot = lot(&svc, 3).await;

        let results = future::join_all(
            (0..10).map(|_| svc.execute(create(&lot, 1))),
        )
        .await;

        let (ok, failed): (Vec<_>, Vec<_>) =
            results.into_iter().partition(Result::is_ok);
        assert_eq!(ok.len(), 3);
        assert_eq!(failed.len(), 7);
        for err in failed.into_iter().filter_map(Result::err) {
            assert!(
                matches!(err.as_ref(), ExecutionError::NoSlotsAvailable(_)),
                "wrong error: {err}",
            );
        }

        let lot = svc
            .database()
            .execute(Select(By::<Option<Lot>, _>::new(lot.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(lot.available_slots(), 0);
    }

    #[tokio::test]
    async fn rejects_inactive_or_missing_lot() {
        let svc = service();
        let lot = lot(&svc, 3).await;
        svc.execute(DeactivateLot {
            actor: operator_of(&lot),
            lot_id: lot.id,
        })
        .await
        .unwrap();

        let err = svc.execute(create(&lot, 1)).await.unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::LotInactive(_)));

        let err = svc
            .execute(CreateBooking {
                lot_id: crate::domain::lot::Id::new(),
                ..create(&lot, 1)
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::LotNotExists(_)));
    }

    #[tokio::test]
    async fn publishes_changes() {
        use futures::{pin_mut, StreamExt as _};

        use crate::domain::Event;

        let svc = service();
        let lot = lot(&svc, 2).await;
        let events = svc.relay().subscribe();
        pin_mut!(events);

        let booking = svc.execute(create(&lot, 1)).await.unwrap();

        assert_eq!(
            events.next().await,
            Some(Event::SlotsChanged {
                lot_id: lot.id,
                available: 1,
                total: 2,
            }),
        );
        assert_eq!(events.next().await, Some(Event::status_of(&booking)));
    }
}
