//! [`Lot`]-related definitions.

use std::future;

use common::{DateTime, Money, Percent};
use derive_more::{AsRef, Display, From, Into};
use futures::TryFutureExt as _;
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use rust_decimal::prelude::ToPrimitive as _;
use service::{domain, query, read, Query as _};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    AsError, Context, Error,
};

/// A parking lot.
#[derive(Clone, Debug, From)]
pub struct Lot {
    /// ID of this [`Lot`].
    id: Id,

    /// Underlying [`domain::Lot`].
    lot: OnceCell<domain::Lot>,
}

impl From<domain::Lot> for Lot {
    fn from(lot: domain::Lot) -> Self {
        Self {
            id: lot.id.into(),
            lot: OnceCell::new_with(Some(lot)),
        }
    }
}

impl Lot {
    /// Creates a new [`Lot`] with the provided ID.
    ///
    /// # Safety
    ///
    /// Caller must ensure that [`Lot`] with the provided ID exists, otherwise
    /// accessing this [`Lot`] will result with an error.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            lot: OnceCell::new(),
        }
    }

    /// Returns the underlying [`domain::Lot`].
    ///
    /// # Errors
    ///
    /// Errors if the [`domain::Lot`] doesn't exist.
    async fn lot(&self, ctx: &Context) -> Result<&domain::Lot, Error> {
        let id = self.id.into();
        self.lot
            .get_or_try_init(|| {
                ctx.service()
                    .execute(query::lot::ById::by(id))
                    .map_err(AsError::into_error)
                    .map_err(ctx.error())
                    .and_then(|l| {
                        future::ready(
                            l.ok_or_else(|| api::LotError::NotExists.into()),
                        )
                    })
            })
            .await
    }
}

/// A parking lot.
#[graphql_object(context = Context)]
impl Lot {
    /// Unique identifier of this `Lot`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Lot.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.id
    }

    /// ID of the `User` operating this `Lot`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Lot.operatorId",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn operator_id(
        &self,
        ctx: &Context,
    ) -> Result<api::user::Id, Error> {
        Ok(self.lot(ctx).await?.operator_id.into())
    }

    /// Name of this `Lot`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Lot.name",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn name(&self, ctx: &Context) -> Result<Name, Error> {
        Ok(self.lot(ctx).await?.name.clone().into())
    }

    /// Postal address of this `Lot`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Lot.address",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn address(&self, ctx: &Context) -> Result<Address, Error> {
        Ok(self.lot(ctx).await?.address.clone().into())
    }

    /// Latitude of this `Lot` in degrees.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Lot.latitude",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn latitude(&self, ctx: &Context) -> Result<f64, Error> {
        Ok(self.lot(ctx).await?.location.latitude())
    }

    /// Longitude of this `Lot` in degrees.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Lot.longitude",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn longitude(&self, ctx: &Context) -> Result<f64, Error> {
        Ok(self.lot(ctx).await?.location.longitude())
    }

    /// Total number of slots in this `Lot`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Lot.totalSlots",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn total_slots(&self, ctx: &Context) -> Result<i32, Error> {
        Ok(self.lot(ctx).await?.total_slots.get().into())
    }

    /// Number of free slots in this `Lot`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Lot.availableSlots",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn available_slots(&self, ctx: &Context) -> Result<i32, Error> {
        Ok(self.lot(ctx).await?.available_slots().into())
    }

    /// Share of the occupied slots in this `Lot`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Lot.occupancy",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn occupancy(&self, ctx: &Context) -> Result<Percent, Error> {
        Ok(self.lot(ctx).await?.occupancy())
    }

    /// `Availability` of this `Lot` derived from its occupancy.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Lot.availability",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn availability(
        &self,
        ctx: &Context,
    ) -> Result<Availability, Error> {
        Ok(self.lot(ctx).await?.availability().into())
    }

    /// Price of a single slot hour in this `Lot`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Lot.pricePerHour",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn price_per_hour(&self, ctx: &Context) -> Result<Money, Error> {
        Ok(self.lot(ctx).await?.price_per_hour.get())
    }

    /// Indicator whether this `Lot` accepts new bookings.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Lot.isActive",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn is_active(&self, ctx: &Context) -> Result<bool, Error> {
        Ok(self.lot(ctx).await?.is_active())
    }

    /// Number of bookings ever made in this `Lot`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Lot.totalBookings",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn total_bookings(&self, ctx: &Context) -> Result<i32, Error> {
        i32::try_from(self.lot(ctx).await?.stats.total_bookings)
            .map_err(AsError::into_error)
            .map_err(ctx.error())
    }

    /// Revenue earned by this `Lot`, extensions included.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Lot.totalRevenue",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn total_revenue(&self, ctx: &Context) -> Result<Money, Error> {
        Ok(self.lot(ctx).await?.stats.total_revenue)
    }

    /// Average score of this `Lot`, if it was rated at least once.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Lot.rating",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn rating(&self, ctx: &Context) -> Result<Option<f64>, Error> {
        Ok(self
            .lot(ctx)
            .await?
            .rating
            .average()
            .and_then(|avg| avg.to_f64()))
    }

    /// Number of times this `Lot` was rated.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Lot.ratingCount",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn rating_count(&self, ctx: &Context) -> Result<i32, Error> {
        i32::try_from(self.lot(ctx).await?.rating.count)
            .map_err(AsError::into_error)
            .map_err(ctx.error())
    }

    /// `DateTime` when this `Lot` was created.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Lot.createdAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn created_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.lot(ctx).await?.created_at.coerce())
    }

    /// `DateTime` when this `Lot` was deactivated, if it was.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Lot.deactivatedAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn deactivated_at(
        &self,
        ctx: &Context,
    ) -> Result<Option<DateTime>, Error> {
        Ok(self.lot(ctx).await?.deactivated_at.map(|at| at.coerce()))
    }
}

/// Unique identifier of a `Lot`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::lot::Id)]
#[into(domain::lot::Id)]
#[graphql(name = "LotId", transparent)]
pub struct Id(Uuid);

/// Name of a `Lot`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "LotName", with = scalar::Via::<domain::lot::Name>)]
pub struct Name(domain::lot::Name);

/// Postal address of a `Lot`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "LotAddress", with = scalar::Via::<domain::lot::Address>)]
pub struct Address(domain::lot::Address);

/// Availability of a `Lot` derived from its occupancy.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "LotAvailability")]
pub enum Availability {
    /// Less than 80% of slots are occupied.
    Available,

    /// At least 80% of slots are occupied.
    Limited,

    /// All slots are occupied.
    Full,
}

impl From<domain::lot::Availability> for Availability {
    fn from(availability: domain::lot::Availability) -> Self {
        use domain::lot::Availability as A;
        match availability {
            A::Available => Self::Available,
            A::Limited => Self::Limited,
            A::Full => Self::Full,
        }
    }
}

/// `Lot` found near some point.
#[derive(Clone, Debug, From)]
pub struct Nearby(read::lot::Nearby);

/// `Lot` found near some point.
#[graphql_object(name = "NearbyLot", context = Context)]
impl Nearby {
    /// Found `Lot`.
    #[must_use]
    pub fn lot(&self) -> Lot {
        self.0.lot.clone().into()
    }

    /// Distance to the found `Lot` in meters.
    #[must_use]
    pub fn distance(&self) -> f64 {
        self.0.distance
    }
}

/// Forecast of `Lot` availability in the next hours.
#[derive(Clone, Copy, Debug, From)]
pub struct Forecast(read::lot::Forecast);

/// Forecast of `Lot` availability in the next hours.
#[graphql_object(name = "LotForecast", context = Context)]
impl Forecast {
    /// ID of the forecasted `Lot`.
    #[must_use]
    pub fn lot_id(&self) -> Id {
        self.0.lot_id.into()
    }

    /// Number of slots available right now.
    #[must_use]
    pub fn available_now(&self) -> i32 {
        self.0.available_now.into()
    }

    /// Number of slots expected to be available in 1 hour.
    #[must_use]
    pub fn in_1_hour(&self) -> i32 {
        self.0.in_1_hour.into()
    }

    /// Number of slots expected to be available in 2 hours.
    #[must_use]
    pub fn in_2_hours(&self) -> i32 {
        self.0.in_2_hours.into()
    }

    /// Number of slots expected to be available in 4 hours.
    #[must_use]
    pub fn in_4_hours(&self) -> i32 {
        self.0.in_4_hours.into()
    }

    /// Confidence of this `LotForecast`.
    #[must_use]
    pub fn confidence(&self) -> Percent {
        self.0.confidence
    }

    /// Source this `LotForecast` was made by.
    #[must_use]
    pub fn source(&self) -> ForecastSource {
        self.0.source.into()
    }
}

/// Source of a `LotForecast`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "LotForecastSource")]
pub enum ForecastSource {
    /// External prediction advisor.
    Advisor,

    /// Built-in heuristic used when the advisor is unavailable.
    Fallback,
}

impl From<read::lot::ForecastSource> for ForecastSource {
    fn from(source: read::lot::ForecastSource) -> Self {
        use read::lot::ForecastSource as S;
        match source {
            S::Advisor => Self::Advisor,
            S::Fallback => Self::Fallback,
        }
    }
}

pub mod list {
    //! Definitions related to the [`Lot`] list.

    use derive_more::{AsRef, From, Into};
    use juniper::{graphql_object, GraphQLScalar};
    use service::read;

    use super::{Id, Lot};
    use crate::{api::scalar, Context};

    /// Cursor for the `Lot` list.
    #[derive(AsRef, Clone, Copy, Debug, From, GraphQLScalar, Into)]
    #[from(Id, read::lot::list::Cursor)]
    #[graphql(
        name = "LotListCursor",
        with = scalar::Via::<read::lot::list::Cursor>,
    )]
    pub struct Cursor(pub read::lot::list::Cursor);

    /// Edge in the [`Lot`] list.
    #[derive(Clone, Debug, From, Into)]
    pub struct Edge(read::lot::list::Edge);

    /// Edge in the `Lot` list.
    #[graphql_object(name = "LotListEdge", context = Context)]
    impl Edge {
        /// Cursor of this `LotListEdge`.
        #[must_use]
        pub fn cursor(&self) -> Cursor {
            self.0.cursor.into()
        }

        /// Node of this `LotListEdge`.
        #[must_use]
        pub fn node(&self) -> Lot {
            self.0.node.clone().into()
        }
    }

    /// Connection of the [`Lot`] list.
    #[derive(Clone, Debug, From, Into)]
    pub struct Connection(read::lot::list::Page);

    /// Connection of the `Lot` list.
    #[graphql_object(name = "LotListConnection", context = Context)]
    impl Connection {
        /// Edges of this `LotListConnection`.
        #[must_use]
        pub fn edges(&self) -> Vec<Edge> {
            self.0.edges.iter().cloned().map(Into::into).collect()
        }

        /// Information about the page.
        #[must_use]
        pub fn page_info(&self) -> PageInfo {
            PageInfo {
                has_next_page: self.0.has_next_page,
                end_cursor: self.0.end_cursor().copied().map(Into::into),
            }
        }
    }

    /// Information about a [`Connection`] page.
    #[derive(Clone, Copy, Debug)]
    pub struct PageInfo {
        /// Indicator whether there is a next page.
        has_next_page: bool,

        /// End cursor of the page.
        end_cursor: Option<Cursor>,
    }

    /// Information about a `LotListConnection` page.
    #[graphql_object(name = "LotListPageInfo", context = Context)]
    impl PageInfo {
        /// Indicator whether there is a next page.
        #[must_use]
        pub fn has_next_page(&self) -> bool {
            self.has_next_page
        }

        /// End cursor of the page, to be passed as `after` for the next one.
        #[must_use]
        pub fn end_cursor(&self) -> Option<Cursor> {
            self.end_cursor
        }
    }
}
