//! GraphQL [`Subscription`]s definitions.

use common::DateTime;
use futures::{
    future,
    stream::{self, BoxStream},
    FutureExt as _, StreamExt as _,
};
use juniper::{graphql_subscription, GraphQLObject};
use service::{domain::Event, query, Query as _};

use crate::{api, context, AsError, Context, Error};

/// Root of all GraphQL subscription.
#[derive(Clone, Copy, Debug)]
pub struct Subscription;

impl Subscription {
    /// Name of the [`tracing::Span`] for the subscriptions.
    const SPAN_NAME: &'static str = "GraphQL subscription";
}

#[graphql_subscription(context = Context)]
impl Subscription {
    /// Subscription waiting for the current authenticated session to expire.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - if the current session is not
    ///                              authenticated or session expired.
    pub async fn wait_session(
        &self,
        ctx: &Context,
    ) -> Result<BoxStream<'static, Result<bool, Error>>, Error> {
        let session = ctx.current_session().await?;
        let timeout = session
            .expires_at
            .duration_since(DateTime::now())
            .unwrap_or_default();
        Ok(stream::once(
            tokio::time::sleep(timeout).map(|()| {
                Err(context::AuthError::AuthorizationRequired.into())
            }),
        )
        .boxed())
    }

    /// Streams changes of available slots in the `Lot` with the specified
    /// ID.
    ///
    /// Starts with the current state of the `Lot`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `LOT_NOT_EXISTS` - the `Lot` with the specified ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "lotAvailability",
            lot_id = %lot_id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn lot_availability(
        &self,
        lot_id: api::lot::Id,
        ctx: &Context,
    ) -> Result<BoxStream<'static, Result<SlotsChange, Error>>, Error> {
        let id = lot_id.into();

        // Subscribe before reading, so no change slips in between.
        let changes = ctx.service().relay().subscribe();
        let lot = ctx
            .service()
            .execute(query::lot::ById::by(id))
            .await
            .map_err(AsError::into_error)?
            .ok_or_else(|| Error::from(api::LotError::NotExists))?;

        let current = SlotsChange {
            lot_id,
            available_slots: i32::from(lot.available_slots()),
            total_slots: i32::from(lot.total_slots.get()),
        };
        Ok(stream::once(future::ready(Ok(current)))
            .chain(changes.filter_map(move |ev| {
                future::ready(match ev {
                    Event::SlotsChanged {
                        lot_id,
                        available,
                        total,
                    } if lot_id == id => Some(Ok(SlotsChange {
                        lot_id: lot_id.into(),
                        available_slots: i32::from(available),
                        total_slots: i32::from(total),
                    })),
                    Event::SlotsChanged { .. }
                    | Event::BookingChanged { .. } => None,
                })
            }))
            .boxed())
    }

    /// Streams status changes of the `Booking` with the specified ID.
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
            booking_id = %booking_id,
            gql.name = "bookingUpdates",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn booking_updates(
        &self,
        booking_id: api::booking::Id,
        ctx: &Context,
    ) -> Result<BoxStream<'static, Result<BookingChange, Error>>, Error> {
        let me = ctx.current_actor().await?;
        let id = booking_id.into();

        let changes = ctx.service().relay().subscribe();
        let summary = ctx
            .service()
            .execute(query::booking::ById(id))
            .await
            .map_err(AsError::into_error)?
            .ok_or_else(|| Error::from(api::BookingError::NotExists))?;
        if !me.is_or_admin(summary.booking.user_id) {
            return Err(api::PrivilegeError::BookingOwner.into());
        }

        Ok(changes
            .filter_map(move |ev| {
                future::ready(match ev {
                    Event::BookingChanged {
                        booking_id, status, ..
                    } if booking_id == id => Some(Ok(BookingChange {
                        booking_id: booking_id.into(),
                        status: status.into(),
                    })),
                    Event::BookingChanged { .. }
                    | Event::SlotsChanged { .. } => None,
                })
            })
            .boxed())
    }
}

/// Number of available slots in a `Lot` at some moment.
#[derive(Clone, Copy, Debug, GraphQLObject)]
#[graphql(name = "LotAvailabilityChange")]
pub struct SlotsChange {
    /// ID of the changed `Lot`.
    pub lot_id: api::lot::Id,

    /// Number of currently free slots in the `Lot`.
    pub available_slots: i32,

    /// Total number of slots in the `Lot`.
    pub total_slots: i32,
}

/// New status of a `Booking`.
#[derive(Clone, Copy, Debug, GraphQLObject)]
#[graphql(name = "BookingStatusChange")]
pub struct BookingChange {
    /// ID of the changed `Booking`.
    pub booking_id: api::booking::Id,

    /// New status of the `Booking`.
    pub status: api::booking::Status,
}
