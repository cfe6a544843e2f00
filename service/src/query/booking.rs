//! [`Query`] collection related to a single [`Booking`].

use common::{
    operations::{By, Select},
    DateTime,
};
use tracerr::Traced;

use crate::{
    domain::{booking, Booking},
    infra::{database, Database},
    read::booking::Summary,
    Query, Service,
};

/// Queries a [`Summary`] of a [`Booking`] by its [`booking::Id`].
#[derive(Clone, Copy, Debug)]
pub struct ById(pub booking::Id);

/// Queries a [`Summary`] of a [`Booking`] by its [`booking::QrToken`].
///
/// Used at a lot gate, so doesn't require any authorization.
#[derive(Clone, Debug)]
pub struct ByQrToken(pub booking::QrToken);

impl<Db> Query<ById> for Service<Db>
where
    Db: Database<
        Select<By<Option<Booking>, booking::Id>>,
        Ok = Option<Booking>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Summary>;
    type Err = Traced<database::Error>;

    async fn execute(&self, ById(id): ById) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .database()
            .execute(Select(By::new(id)))
            .await
            .map_err(tracerr::wrap!())?
            .map(|b| Summary::at(b, DateTime::now())))
    }
}

impl<Db> Query<ByQrToken> for Service<Db>
where
    Db: Database<
        Select<By<Option<Booking>, booking::QrToken>>,
        Ok = Option<Booking>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Summary>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        ByQrToken(token): ByQrToken,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .database()
            .execute(Select(By::new(token)))
            .await
            .map_err(tracerr::wrap!())?
            .map(|b| Summary::at(b, DateTime::now())))
    }
}

#[cfg(test)]
mod spec {
    use crate::{
        command::CheckInBooking,
        domain::booking::{self, DisplayStatus},
        spec::{book, lot, owner_of, service},
        Command as _, Query as _,
    };

    use super::{ById, ByQrToken};

    #[tokio::test]
    async fn summarizes_booking_at_read_time() {
        let svc = service();
        let lot = lot(&svc, 2).await;
        let booking = book(&svc, &lot).await;

        let summary = svc
            .execute(ByQrToken(booking.qr_token.clone()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary.booking.id, booking.id);
        assert_eq!(summary.display_status, DisplayStatus::Active);
        assert!((58..=60).contains(&summary.remaining_minutes));

        _ = svc
            .execute(CheckInBooking {
                actor: owner_of(&booking),
                booking_id: booking.id,
            })
            .await
            .unwrap();
        let summary = svc.execute(ById(booking.id)).await.unwrap().unwrap();
        assert_eq!(summary.display_status, DisplayStatus::Parked);
    }

    #[tokio::test]
    async fn misses_unknown_booking() {
        let svc = service();

        assert!(svc
            .execute(ByQrToken("ZZZZZZZZ".parse().unwrap()))
            .await
            .unwrap()
            .is_none());
        assert!(svc
            .execute(ById(booking::Id::new()))
            .await
            .unwrap()
            .is_none());
    }
}
