//! [`ExpireOverdueBookings`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::{
    operations::{
        By, Commit, Perform, Release, Select, Start, Transact, Transacted,
        Update,
    },
    DateTime,
};
use derive_more::{Display, Error as StdError, From};
use smart_default::SmartDefault;
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{booking, lot, Booking, Event, Lot},
    infra::{database, Database},
    read::booking::Overdue,
    Service,
};

use super::Task;

/// Configuration for [`ExpireOverdueBookings`] [`Task`].
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// Interval between sweeps.
    #[default(time::Duration::from_secs(60))]
    pub interval: time::Duration,

    /// Maximum number of [`Booking`]s expired in a single sweep.
    #[default(100)]
    pub batch_size: u16,
}

/// [`Task`] expiring [`booking::Status::Confirmed`] [`Booking`]s whose
/// window has passed without the vehicle ever entering, and releasing their
/// slots.
#[derive(Clone, Copy, Debug)]
pub struct ExpireOverdueBookings<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<Db> Task<Start<By<ExpireOverdueBookings<Self>, Config>>> for Service<Db>
where
    ExpireOverdueBookings<Service<Db>>:
        Task<Perform<()>, Ok = usize, Err: Error> + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<ExpireOverdueBookings<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = ExpireOverdueBookings {
            config,
            service: self.clone(),
        };

        let mut interval = interval(task.config.interval);
        loop {
            let _ = interval.tick().await;
            match task.execute(Perform(())).await {
                Ok(0) => log::debug!("no overdue `Booking`s to expire"),
                Ok(n) => log::info!("expired {n} overdue `Booking`s"),
                Err(e) => {
                    log::error!("`task::ExpireOverdueBookings` failed: {e}");
                }
            }
        }
    }
}

impl<Db> Task<Perform<()>> for ExpireOverdueBookings<Service<Db>>
where
    Db: Database<
            Select<By<Vec<Booking>, Overdue>>,
            Ok = Vec<Booking>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
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
    type Ok = usize;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let now = DateTime::now();
        let db = self.service.database();

        let overdue = db
            .execute(Select(By::new(Overdue {
                at: now,
                limit: self.config.batch_size,
            })))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut expired = 0;
        for candidate in overdue {
            let tx = db
                .execute(Transact)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;

            // Re-read, as the `Booking` may have been changed concurrently.
            let Some(mut booking) = tx
                .execute(Select(By::<Option<Booking>, _>::new(candidate.id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
            else {
                continue;
            };
            if booking.expire(now).is_err() {
                continue;
            }

            let Some(booking) = tx
                .execute(Update(booking))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
            else {
                log::debug!(
                    "`Booking(id: {})` changed concurrently, skipping",
                    candidate.id,
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

            log::debug!("`Booking(id: {})` expired", booking.id);
            self.service.relay().publish(Event::status_of(&booking));
            if let Some(lot) = lot {
                self.service.relay().publish(Event::slots_of(&lot));
            }
            expired += 1;
        }

        Ok(expired)
    }
}

/// Error of [`ExpireOverdueBookings`] execution.
#[derive(Debug, Display, From, StdError)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{
        operations::{By, Perform, Select},
        DateTime,
    };

    use crate::{
        command::CreateBooking,
        domain::{booking, Booking, Lot},
        infra::Database as _,
        spec::{driver, lot, service, vehicle},
        Command as _,
    };

    use super::{Config, ExpireOverdueBookings, Task as _};

    #[tokio::test]
    async fn expires_overdue_bookings_once() {
        let svc = service();
        let lot = lot(&svc, 2).await;
        let driver = driver();

        let past = DateTime::now() - Duration::from_secs(3 * 3600);
        let overdue = svc
            .execute(CreateBooking {
                actor: driver,
                lot_id: lot.id,
                vehicle: vehicle(),
                duration: booking::Hours::new(1).unwrap(),
                starts_at: Some(past.coerce()),
            })
            .await
            .unwrap();
        let upcoming = svc
            .execute(CreateBooking {
                actor: driver,
                lot_id: lot.id,
                vehicle: vehicle(),
                duration: booking::Hours::new(1).unwrap(),
                starts_at: None,
            })
            .await
            .unwrap();

        let task = ExpireOverdueBookings {
            config: Config {
                interval: Duration::from_secs(60),
                batch_size: 100,
            },
            service: svc.clone(),
        };
        assert_eq!(task.execute(Perform(())).await.unwrap(), 1);
        assert_eq!(task.execute(Perform(())).await.unwrap(), 0);

        let db = svc.database();
        let expired = db
            .execute(Select(By::<Option<Booking>, _>::new(overdue.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(expired.status, booking::Status::Expired);
        let untouched = db
            .execute(Select(By::<Option<Booking>, _>::new(upcoming.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(untouched.status, booking::Status::Confirmed);

        let lot = db
            .execute(Select(By::<Option<Lot>, _>::new(lot.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(lot.available_slots(), 1);
    }
}
