//! GraphQL [`Query`]s definitions.

use juniper::graphql_object;
use service::{domain, query, read, Query as _};

use crate::{api, AsError, Context, Error};

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";

    /// Default number of nodes on a page.
    const DEFAULT_PAGE_SIZE: i32 = 20;
}

#[graphql_object(context = Context)]
impl Query {
    /// Returns the `Lot` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `LOT_NOT_EXISTS` - the `Lot` with the specified ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "lot",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn lot(id: api::lot::Id, ctx: &Context) -> Result<api::Lot, Error> {
        ctx.service()
            .execute(query::lot::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| api::LotError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Fetches the page of `Lot`s, ordered by their IDs.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_PAGE_SIZE` - `first` is not in `1..=100` range.
    #[tracing::instrument(
        skip_all,
        fields(
            after = ?after,
            first = ?first,
            gql.name = "lots",
            only_available = ?only_available,
            operator = ?operator,
            otel.name = Self::SPAN_NAME,
            query = ?query,
        ),
    )]
    pub async fn lots(
        first: Option<i32>,
        after: Option<api::lot::list::Cursor>,
        operator: Option<api::user::Id>,
        query: Option<String>,
        only_available: Option<bool>,
        ctx: &Context,
    ) -> Result<api::lot::list::Connection, Error> {
        let arguments = read::lot::list::Arguments::new(
            first,
            after.map(Into::into),
            Self::DEFAULT_PAGE_SIZE,
        )
        .ok_or_else(|| api::PaginationError::InvalidSize.into())
        .map_err(ctx.error())?;

        ctx.service()
            .execute(query::lots::List::by(read::lot::list::Selector {
                arguments,
                filter: read::lot::list::Filter {
                    operator_id: operator.map(Into::into),
                    query: query.filter(|q| !q.trim().is_empty()),
                    only_available: only_available.unwrap_or_default(),
                },
            }))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Finds active `Lot`s around the specified point, nearest first.
    ///
    /// `radiusMeters` defaults to 5 km.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_COORDINATES` - the point is out of range;
    /// - `INVALID_RADIUS` - `radiusMeters` is not positive or exceeds 50 km.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "nearbyLots",
            latitude = %latitude,
            longitude = %longitude,
            otel.name = Self::SPAN_NAME,
            radius_meters = ?radius_meters,
        ),
    )]
    pub async fn nearby_lots(
        latitude: f64,
        longitude: f64,
        radius_meters: Option<f64>,
        ctx: &Context,
    ) -> Result<Vec<api::lot::Nearby>, Error> {
        let location =
            api::coordinates(latitude, longitude).map_err(ctx.error())?;
        let radius = radius_meters
            .map_or(Some(domain::lot::Radius::DEFAULT), |m| {
                domain::lot::Radius::new(m)
            })
            .ok_or_else(|| api::ValidationError::Radius.into())
            .map_err(ctx.error())?;

        ctx.service()
            .execute(query::Nearby { location, radius })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|found| found.into_iter().map(Into::into).collect())
    }

    /// Forecasts availability of the `Lot` with the specified ID in the next
    /// hours.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `LOT_NOT_EXISTS` - the `Lot` with the specified ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "lotForecast",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn lot_forecast(
        id: api::lot::Id,
        ctx: &Context,
    ) -> Result<api::lot::Forecast, Error> {
        ctx.service()
            .execute(query::Forecast { lot_id: id.into() })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| api::LotError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the `Booking` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request is not authorized;
    /// - `BOOKING_NOT_EXISTS` - the `Booking` with the specified ID does not
    ///                          exist;
    /// - `NOT_BOOKING_OWNER` - the authenticated `User` neither owns the
    ///                         `Booking` nor is an admin.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "booking",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn booking(
        id: api::booking::Id,
        ctx: &Context,
    ) -> Result<api::Booking, Error> {
        let me = ctx.current_actor().await?;

        let summary = ctx
            .service()
            .execute(query::booking::ById(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| api::BookingError::NotExists.into())
            .map_err(ctx.error())?;
        if !me.is_or_admin(summary.booking.user_id) {
            return Err(api::PrivilegeError::BookingOwner.into())
                .map_err(ctx.error());
        }

        Ok(summary.into())
    }

    /// Returns the `Booking` with the specified QR token.
    ///
    /// Doesn't require authorization, as used at `Lot` gates.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `QR_TOKEN_NOT_EXISTS` - no `Booking` has the specified QR token.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "bookingByQr",
            otel.name = Self::SPAN_NAME,
            token = %token,
        ),
    )]
    pub async fn booking_by_qr(
        token: api::booking::QrToken,
        ctx: &Context,
    ) -> Result<api::Booking, Error> {
        ctx.service()
            .execute(query::booking::ByQrToken(token.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| api::BookingError::QrTokenNotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Fetches the page of the authenticated `User`'s `Booking`s, newest
    /// first.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request is not authorized;
    /// - `INVALID_PAGE_SIZE` - `first` is not in `1..=100` range.
    #[tracing::instrument(
        skip_all,
        fields(
            after = ?after,
            first = ?first,
            gql.name = "myBookings",
            otel.name = Self::SPAN_NAME,
            status = ?status,
        ),
    )]
    pub async fn my_bookings(
        first: Option<i32>,
        after: Option<api::booking::list::Cursor>,
        status: Option<api::booking::Status>,
        ctx: &Context,
    ) -> Result<api::booking::list::Connection, Error> {
        let my_id = ctx.current_session().await?.user_id;

        let arguments = read::booking::list::Arguments::new(
            first,
            after.map(Into::into),
            Self::DEFAULT_PAGE_SIZE,
        )
        .ok_or_else(|| api::PaginationError::InvalidSize.into())
        .map_err(ctx.error())?;

        ctx.service()
            .execute(query::bookings::List::by(
                read::booking::list::Selector {
                    arguments,
                    filter: read::booking::list::Filter {
                        scope: read::booking::list::Scope::User(my_id.into()),
                        status: status.map(Into::into),
                        plate: None,
                    },
                },
            ))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Fetches the page of `Booking`s made in the specified `Lot`, newest
    /// first.
    ///
    /// Available to the `Lot` operator and admins only.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request is not authorized;
    /// - `LOT_NOT_EXISTS` - the `Lot` with the specified ID does not exist;
    /// - `NOT_LOT_OPERATOR` - the authenticated `User` neither operates the
    ///                        `Lot` nor is an admin;
    /// - `INVALID_PAGE_SIZE` - `first` is not in `1..=100` range.
    #[tracing::instrument(
        skip_all,
        fields(
            after = ?after,
            first = ?first,
            gql.name = "lotBookings",
            lot_id = %lot_id,
            otel.name = Self::SPAN_NAME,
            plate = ?plate,
            status = ?status,
        ),
    )]
    pub async fn lot_bookings(
        lot_id: api::lot::Id,
        status: Option<api::booking::Status>,
        plate: Option<api::booking::list::PlateSearch>,
        first: Option<i32>,
        after: Option<api::booking::list::Cursor>,
        ctx: &Context,
    ) -> Result<api::booking::list::Connection, Error> {
        let me = ctx.current_actor().await?;

        let arguments = read::booking::list::Arguments::new(
            first,
            after.map(Into::into),
            Self::DEFAULT_PAGE_SIZE,
        )
        .ok_or_else(|| api::PaginationError::InvalidSize.into())
        .map_err(ctx.error())?;

        let lot = ctx
            .service()
            .execute(query::lot::ById::by(lot_id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| api::LotError::NotExists.into())
            .map_err(ctx.error())?;
        if !me.is_or_admin(lot.operator_id) {
            return Err(api::PrivilegeError::LotOperator.into())
                .map_err(ctx.error());
        }

        ctx.service()
            .execute(query::bookings::List::by(
                read::booking::list::Selector {
                    arguments,
                    filter: read::booking::list::Filter {
                        scope: read::booking::list::Scope::Lot(lot.id),
                        status: status.map(Into::into),
                        plate: plate.map(Into::into),
                    },
                },
            ))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}
