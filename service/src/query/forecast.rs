//! [`Forecast`] [`Query`] definition.

use common::{
    operations::{By, Select},
    DateTime,
};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{lot, Booking, Lot},
    infra::{advisor::AdvisorError, database, Database},
    read::{self, booking::History},
    Query, Service,
};

/// [`Query`] forecasting availability of a [`Lot`] in the next hours.
///
/// The [`Advisor`] is asked first, and any of its failures fall back to
/// [`read::lot::Forecast::fallback()`], so a forecast is always produced for
/// an existing [`Lot`].
///
/// [`Advisor`]: crate::infra::Advisor
#[derive(Clone, Copy, Debug)]
pub struct Forecast {
    /// ID of the [`Lot`] to forecast.
    pub lot_id: lot::Id,
}

impl Forecast {
    /// Maximum number of past [`Booking`]s handed to the [`Advisor`].
    ///
    /// [`Advisor`]: crate::infra::Advisor
    pub const HISTORY_LIMIT: u16 = 1000;
}

impl<Db> Query<Forecast> for Service<Db>
where
    Db: Database<
            Select<By<Option<Lot>, lot::Id>>,
            Ok = Option<Lot>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Booking>, History>>,
            Ok = Vec<Booking>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Option<read::lot::Forecast>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Forecast { lot_id }: Forecast,
    ) -> Result<Self::Ok, Self::Err> {
        let Some(lot) = self
            .database()
            .execute(Select(By::<Option<Lot>, _>::new(lot_id)))
            .await
            .map_err(tracerr::wrap!())?
        else {
            return Ok(None);
        };

        let history = self
            .database()
            .execute(Select(By::new(History {
                lot_id,
                limit: Forecast::HISTORY_LIMIT,
            })))
            .await
            .map_err(tracerr::wrap!())?;

        let now = DateTime::now();
        let forecast = match self.advisor().forecast(&lot, &history, now).await
        {
            Ok(f) => f,
            Err(e) => {
                if matches!(e.as_ref(), AdvisorError::Disabled) {
                    log::debug!("forecasting `Lot(id: {lot_id})` locally");
                } else {
                    log::warn!(
                        "`Advisor` failed to forecast `Lot(id: {lot_id})`, \
                         falling back: {e}",
                    );
                }
                read::lot::Forecast::fallback(&lot, now)
            }
        };

        Ok(Some(forecast))
    }
}
