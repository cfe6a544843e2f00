//! GraphQL [`Mutation`]s definitions.

use common::{DateTime, Money};
use juniper::graphql_object;
use service::{command, domain, Command as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Reserves a slot in the specified `Lot` for `durationHours`, starting
    /// at `startsAt` or right away.
    ///
    /// The `Booking` is charged at the current `Lot` price and is considered
    /// paid.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request is not authorized;
    /// - `INVALID_DURATION` - `durationHours` is not in `1..=168` range;
    /// - `LOT_NOT_EXISTS` - the `Lot` with the specified ID does not exist;
    /// - `LOT_INACTIVE` - the `Lot` doesn't accept new bookings;
    /// - `NO_SLOTS_AVAILABLE` - the `Lot` has no free slots.
    #[tracing::instrument(
        skip_all,
        fields(
            duration_hours = %duration_hours,
            gql.name = "createBooking",
            lot_id = %lot_id,
            otel.name = Self::SPAN_NAME,
            starts_at = ?starts_at,
        ),
    )]
    pub async fn create_booking(
        lot_id: api::lot::Id,
        vehicle: api::booking::VehicleInput,
        duration_hours: i32,
        starts_at: Option<DateTime>,
        ctx: &Context,
    ) -> Result<api::Booking, Error> {
        let actor = ctx.current_actor().await?;
        let duration = api::hours(duration_hours).map_err(ctx.error())?;

        ctx.service()
            .execute(command::CreateBooking {
                actor,
                lot_id: lot_id.into(),
                vehicle: vehicle.into(),
                duration,
                starts_at: starts_at.map(DateTime::coerce),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Prolongs the specified `Booking` by `hours`, charging them at the
    /// current `Lot` price.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request is not authorized;
    /// - `INVALID_DURATION` - `hours` is not in `1..=168` range;
    /// - `BOOKING_NOT_EXISTS` - the `Booking` does not exist;
    /// - `NOT_BOOKING_OWNER` - the authenticated `User` doesn't own the
    ///                         `Booking`;
    /// - `INVALID_BOOKING_STATE` - the `Booking` is neither confirmed nor
    ///                             active;
    /// - `CONCURRENCY_CONFLICT` - the `Booking` is being changed
    ///                            concurrently.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "extendBooking",
            hours = %hours,
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn extend_booking(
        id: api::booking::Id,
        hours: i32,
        ctx: &Context,
    ) -> Result<api::Booking, Error> {
        let actor = ctx.current_actor().await?;
        let hours = api::hours(hours).map_err(ctx.error())?;

        ctx.service()
            .execute(command::ExtendBooking {
                actor,
                booking_id: id.into(),
                hours,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Marks the `Vehicle` of the specified `Booking` as entered its `Lot`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request is not authorized;
    /// - `BOOKING_NOT_EXISTS` - the `Booking` does not exist;
    /// - `NOT_LOT_OPERATOR` - the authenticated `User` neither owns the
    ///                        `Booking` nor operates its `Lot`;
    /// - `ALREADY_CHECKED_IN` - the `Vehicle` has entered already;
    /// - `INVALID_BOOKING_STATE` - the `Booking` is not confirmed;
    /// - `BOOKING_NOT_STARTED` - the `Booking` window has not started yet;
    /// - `BOOKING_WINDOW_PASSED` - the `Booking` window has passed;
    /// - `CONCURRENCY_CONFLICT` - the `Booking` is being changed
    ///                            concurrently.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "checkInBooking",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn check_in_booking(
        id: api::booking::Id,
        ctx: &Context,
    ) -> Result<api::Booking, Error> {
        let actor = ctx.current_actor().await?;

        ctx.service()
            .execute(command::CheckInBooking {
                actor,
                booking_id: id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Marks the `Vehicle` of the specified `Booking` as left its `Lot`,
    /// completing the `Booking` and freeing its slot.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request is not authorized;
    /// - `BOOKING_NOT_EXISTS` - the `Booking` does not exist;
    /// - `NOT_LOT_OPERATOR` - the authenticated `User` neither owns the
    ///                        `Booking` nor operates its `Lot`;
    /// - `BOOKING_NOT_ACTIVE` - the `Vehicle` is not inside the `Lot`;
    /// - `CONCURRENCY_CONFLICT` - the `Booking` is being changed
    ///                            concurrently.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "checkOutBooking",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn check_out_booking(
        id: api::booking::Id,
        ctx: &Context,
    ) -> Result<api::Booking, Error> {
        let actor = ctx.current_actor().await?;

        ctx.service()
            .execute(command::CheckOutBooking {
                actor,
                booking_id: id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Cancels the specified `Booking`, freeing its slot.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request is not authorized;
    /// - `BOOKING_NOT_EXISTS` - the `Booking` does not exist;
    /// - `NOT_BOOKING_OWNER` - the authenticated `User` doesn't own the
    ///                         `Booking`;
    /// - `INVALID_BOOKING_STATE` - the `Booking` is finished already;
    /// - `CONCURRENCY_CONFLICT` - the `Booking` is being changed
    ///                            concurrently.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "cancelBooking",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn cancel_booking(
        id: api::booking::Id,
        reason: Option<api::booking::Note>,
        ctx: &Context,
    ) -> Result<api::Booking, Error> {
        let actor = ctx.current_actor().await?;

        ctx.service()
            .execute(command::CancelBooking {
                actor,
                booking_id: id.into(),
                reason: reason.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Rates the specified completed `Booking` with a `score` in `1..=5`
    /// range.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request is not authorized;
    /// - `INVALID_SCORE` - `score` is not in `1..=5` range;
    /// - `BOOKING_NOT_EXISTS` - the `Booking` does not exist;
    /// - `NOT_BOOKING_OWNER` - the authenticated `User` doesn't own the
    ///                         `Booking`;
    /// - `INVALID_BOOKING_STATE` - the `Booking` is not completed;
    /// - `ALREADY_RATED` - the `Booking` is rated already;
    /// - `CONCURRENCY_CONFLICT` - the `Booking` is being changed
    ///                            concurrently.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "rateBooking",
            id = %id,
            otel.name = Self::SPAN_NAME,
            score = %score,
        ),
    )]
    pub async fn rate_booking(
        id: api::booking::Id,
        score: i32,
        comment: Option<api::booking::Note>,
        ctx: &Context,
    ) -> Result<api::Booking, Error> {
        let actor = ctx.current_actor().await?;
        let score = u8::try_from(score)
            .ok()
            .and_then(domain::booking::Score::new)
            .ok_or_else(|| api::ValidationError::Score.into())
            .map_err(ctx.error())?;

        ctx.service()
            .execute(command::RateBooking {
                actor,
                booking_id: id.into(),
                score,
                comment: comment.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Creates a new `Lot` operated by the authenticated `User`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request is not authorized;
    /// - `NOT_OPERATOR` - the authenticated `User` is not an operator;
    /// - `INVALID_COORDINATES` - the location is out of range;
    /// - `INVALID_CAPACITY` - `totalSlots` is not in `1..=1000` range;
    /// - `INVALID_PRICE` - `pricePerHour` is not positive.
    #[tracing::instrument(
        skip_all,
        fields(
            address = %address,
            gql.name = "createLot",
            name = %name,
            otel.name = Self::SPAN_NAME,
            price_per_hour = %price_per_hour,
            total_slots = %total_slots,
        ),
    )]
    pub async fn create_lot(
        name: api::lot::Name,
        address: api::lot::Address,
        latitude: f64,
        longitude: f64,
        total_slots: i32,
        price_per_hour: Money,
        ctx: &Context,
    ) -> Result<api::Lot, Error> {
        let actor = ctx.current_actor().await?;
        let location =
            api::coordinates(latitude, longitude).map_err(ctx.error())?;
        let total_slots = capacity(total_slots).map_err(ctx.error())?;
        let price_per_hour = price(price_per_hour).map_err(ctx.error())?;

        ctx.service()
            .execute(command::CreateLot {
                actor,
                name: name.into(),
                address: address.into(),
                location,
                total_slots,
                price_per_hour,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Updates the specified `Lot`, leaving the omitted fields untouched.
    ///
    /// Changing `totalSlots` keeps the occupied slots occupied where
    /// possible.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request is not authorized;
    /// - `LOT_NOT_EXISTS` - the `Lot` does not exist;
    /// - `NOT_LOT_OPERATOR` - the authenticated `User` doesn't operate the
    ///                        `Lot`;
    /// - `INVALID_CAPACITY` - `totalSlots` is not in `1..=1000` range;
    /// - `INVALID_PRICE` - `pricePerHour` is not positive or in another
    ///                     currency.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "updateLot",
            id = %id,
            otel.name = Self::SPAN_NAME,
            price_per_hour = ?price_per_hour,
            total_slots = ?total_slots,
        ),
    )]
    pub async fn update_lot(
        id: api::lot::Id,
        name: Option<api::lot::Name>,
        address: Option<api::lot::Address>,
        price_per_hour: Option<Money>,
        total_slots: Option<i32>,
        ctx: &Context,
    ) -> Result<api::Lot, Error> {
        let actor = ctx.current_actor().await?;
        let total_slots =
            total_slots.map(capacity).transpose().map_err(ctx.error())?;
        let price_per_hour =
            price_per_hour.map(price).transpose().map_err(ctx.error())?;

        ctx.service()
            .execute(command::UpdateLot {
                actor,
                lot_id: id.into(),
                name: name.map(Into::into),
                address: address.map(Into::into),
                price_per_hour,
                total_slots,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Deactivates the specified `Lot`, so it accepts no new bookings.
    ///
    /// Existing bookings are kept untouched.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request is not authorized;
    /// - `LOT_NOT_EXISTS` - the `Lot` does not exist;
    /// - `NOT_LOT_OPERATOR` - the authenticated `User` doesn't operate the
    ///                        `Lot`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "deactivateLot",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn deactivate_lot(
        id: api::lot::Id,
        ctx: &Context,
    ) -> Result<api::Lot, Error> {
        let actor = ctx.current_actor().await?;

        ctx.service()
            .execute(command::DeactivateLot {
                actor,
                lot_id: id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

/// Converts the provided number of `slots` into a [`domain::lot::Capacity`].
fn capacity(slots: i32) -> Result<domain::lot::Capacity, Error> {
    u16::try_from(slots)
        .ok()
        .and_then(domain::lot::Capacity::new)
        .ok_or_else(|| api::ValidationError::Capacity.into())
}

/// Converts the provided [`Money`] into a [`domain::lot::Price`].
fn price(money: Money) -> Result<domain::lot::Price, Error> {
    domain::lot::Price::new(money)
        .ok_or_else(|| api::ValidationError::Price.into())
}

impl AsError for command::create_booking::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::LotInactive(_) => api::LotError::Inactive.into(),
            Self::LotNotExists(_) => api::LotError::NotExists.into(),
            Self::NoSlotsAvailable(_) => api::LotError::NoSlotsAvailable.into(),
        })
    }
}

impl AsError for command::extend_booking::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::BookingNotExists(_) => api::BookingError::NotExists.into(),
            Self::ConcurrencyConflict(_) => {
                api::BookingError::ConcurrencyConflict.into()
            }
            Self::Db(e) => return e.try_as_error(),
            Self::LotNotExists(_) => return None,
            Self::NotBookingOwner(_) => {
                api::PrivilegeError::BookingOwner.into()
            }
            Self::Transition(e) => return e.try_as_error(),
        })
    }
}

impl AsError for command::check_in_booking::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::BookingNotExists(_) => api::BookingError::NotExists.into(),
            Self::ConcurrencyConflict(_) => {
                api::BookingError::ConcurrencyConflict.into()
            }
            Self::Db(e) => return e.try_as_error(),
            Self::NotAllowed(_) => GateError::NotAllowed.into(),
            Self::Transition(e) => return e.try_as_error(),
        })
    }
}

impl AsError for command::check_out_booking::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::BookingNotExists(_) => api::BookingError::NotExists.into(),
            Self::ConcurrencyConflict(_) => {
                api::BookingError::ConcurrencyConflict.into()
            }
            Self::Db(e) => return e.try_as_error(),
            Self::NotAllowed(_) => GateError::NotAllowed.into(),
            Self::Transition(e) => return e.try_as_error(),
        })
    }
}

define_error! {
    enum GateError {
        #[code = "NOT_LOT_OPERATOR"]
        #[status = FORBIDDEN]
        #[message = "Authenticated `User` must own the `Booking` or operate \
                     its `Lot`"]
        NotAllowed,
    }
}

impl AsError for command::cancel_booking::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::BookingNotExists(_) => api::BookingError::NotExists.into(),
            Self::ConcurrencyConflict(_) => {
                api::BookingError::ConcurrencyConflict.into()
            }
            Self::Db(e) => return e.try_as_error(),
            Self::NotBookingOwner(_) => {
                api::PrivilegeError::BookingOwner.into()
            }
            Self::Transition(e) => return e.try_as_error(),
        })
    }
}

impl AsError for command::rate_booking::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::BookingNotExists(_) => api::BookingError::NotExists.into(),
            Self::ConcurrencyConflict(_) => {
                api::BookingError::ConcurrencyConflict.into()
            }
            Self::Db(e) => return e.try_as_error(),
            Self::LotNotExists(_) => return None,
            Self::NotBookingOwner(_) => {
                api::PrivilegeError::BookingOwner.into()
            }
            Self::Transition(e) => return e.try_as_error(),
        })
    }
}

impl AsError for command::create_lot::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::NotOperator(_) => Some(api::PrivilegeError::Operator.into()),
        }
    }
}

impl AsError for command::update_lot::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::CurrencyMismatch(_) => api::ValidationError::Price.into(),
            Self::Db(e) => return e.try_as_error(),
            Self::LotNotExists(_) => api::LotError::NotExists.into(),
            Self::NotLotOperator(_) => api::PrivilegeError::LotOperator.into(),
        })
    }
}

impl AsError for command::deactivate_lot::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::LotNotExists(_) => api::LotError::NotExists.into(),
            Self::NotLotOperator(_) => api::PrivilegeError::LotOperator.into(),
        })
    }
}

#[cfg(test)]
mod spec {
    use service::{
        command,
        domain::{booking, lot, user},
    };

    use crate::AsError as _;

    use super::{capacity, price};

    #[test]
    fn validates_lot_inputs() {
        assert_eq!(capacity(25).unwrap().get(), 25);
        for invalid in [0, -3, 1001, 70_000] {
            assert_eq!(capacity(invalid).unwrap_err().code, "INVALID_CAPACITY");
        }

        assert!(price("40INR".parse().unwrap()).is_ok());
        assert_eq!(
            price("0INR".parse().unwrap()).unwrap_err().code,
            "INVALID_PRICE",
        );
    }

    #[test]
    fn booking_error_codes() {
        let id = booking::Id::new();
        let lot_id = lot::Id::new();

        for (err, code, status) in [
            (
                command::create_booking::ExecutionError::NoSlotsAvailable(
                    lot_id,
                )
                .as_error(),
                "NO_SLOTS_AVAILABLE",
                http::StatusCode::CONFLICT,
            ),
            (
                command::create_booking::ExecutionError::LotInactive(lot_id)
                    .as_error(),
                "LOT_INACTIVE",
                http::StatusCode::CONFLICT,
            ),
            (
                command::cancel_booking::ExecutionError::NotBookingOwner(
                    user::Id::new(),
                )
                .as_error(),
                "NOT_BOOKING_OWNER",
                http::StatusCode::FORBIDDEN,
            ),
            (
                command::check_in_booking::ExecutionError::NotAllowed(
                    user::Id::new(),
                )
                .as_error(),
                "NOT_LOT_OPERATOR",
                http::StatusCode::FORBIDDEN,
            ),
            (
                command::check_out_booking::ExecutionError::BookingNotExists(
                    id,
                )
                .as_error(),
                "BOOKING_NOT_EXISTS",
                http::StatusCode::NOT_FOUND,
            ),
            (
                command::extend_booking::ExecutionError::ConcurrencyConflict(
                    id,
                )
                .as_error(),
                "CONCURRENCY_CONFLICT",
                http::StatusCode::CONFLICT,
            ),
            (
                command::check_in_booking::ExecutionError::Transition(
                    booking::TransitionError::WindowPassed,
                )
                .as_error(),
                "BOOKING_WINDOW_PASSED",
                http::StatusCode::CONFLICT,
            ),
            (
                command::check_in_booking::ExecutionError::Transition(
                    booking::TransitionError::NotStarted,
                )
                .as_error(),
                "BOOKING_NOT_STARTED",
                http::StatusCode::CONFLICT,
            ),
            (
                command::rate_booking::ExecutionError::Transition(
                    booking::TransitionError::AlreadyRated,
                )
                .as_error(),
                "ALREADY_RATED",
                http::StatusCode::CONFLICT,
            ),
        ] {
            assert_eq!(err.code, code);
            assert_eq!(err.status_code, status);
        }
    }

    #[test]
    fn lot_error_codes() {
        let err = command::create_lot::ExecutionError::NotOperator(
            user::Id::new(),
        )
        .as_error();
        assert_eq!(err.code, "NOT_OPERATOR");

        let err =
            command::update_lot::ExecutionError::CurrencyMismatch(lot::Id::new())
                .as_error();
        assert_eq!(err.code, "INVALID_PRICE");

        let err = command::extend_booking::ExecutionError::LotNotExists(
            lot::Id::new(),
        )
        .as_error();
        assert_eq!(err.code, "INTERNAL_SERVER_ERROR");
    }
}
