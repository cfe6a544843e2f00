//! GraphQL API definitions.

pub mod booking;
pub mod lot;
mod mutation;
mod query;
pub mod scalar;
mod subscription;
pub mod user;

use service::domain;

use crate::{define_error, AsError, Error};

pub use self::{
    booking::Booking, lot::Lot, mutation::Mutation, query::Query,
    subscription::Subscription,
};

/// GraphQL schema.
pub type Schema = juniper::RootNode<'static, Query, Mutation, Subscription>;

define_error! {
    enum LotError {
        #[code = "LOT_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Lot` with the specified ID does not exist"]
        NotExists,

        #[code = "LOT_INACTIVE"]
        #[status = CONFLICT]
        #[message = "`Lot` doesn't accept new bookings"]
        Inactive,

        #[code = "NO_SLOTS_AVAILABLE"]
        #[status = CONFLICT]
        #[message = "`Lot` has no free slots"]
        NoSlotsAvailable,
    }
}

define_error! {
    enum BookingError {
        #[code = "BOOKING_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Booking` with the specified ID does not exist"]
        NotExists,

        #[code = "QR_TOKEN_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Booking` with the specified QR token does not exist"]
        QrTokenNotExists,

        #[code = "INVALID_BOOKING_STATE"]
        #[status = CONFLICT]
        #[message = "`Booking` status doesn't allow this action"]
        InvalidState,

        #[code = "ALREADY_CHECKED_IN"]
        #[status = CONFLICT]
        #[message = "Vehicle has entered the `Lot` already"]
        AlreadyCheckedIn,

        #[code = "BOOKING_NOT_STARTED"]
        #[status = CONFLICT]
        #[message = "`Booking` window has not started yet"]
        NotStarted,

        #[code = "BOOKING_WINDOW_PASSED"]
        #[status = CONFLICT]
        #[message = "`Booking` window has passed"]
        WindowPassed,

        #[code = "BOOKING_NOT_ACTIVE"]
        #[status = CONFLICT]
        #[message = "Vehicle is not inside the `Lot`"]
        NotActive,

        #[code = "ALREADY_RATED"]
        #[status = CONFLICT]
        #[message = "`Booking` is rated already"]
        AlreadyRated,

        #[code = "CONCURRENCY_CONFLICT"]
        #[status = CONFLICT]
        #[message = "`Booking` is being changed concurrently, try again"]
        ConcurrencyConflict,
    }
}

define_error! {
    enum PrivilegeError {
        #[code = "NOT_BOOKING_OWNER"]
        #[status = FORBIDDEN]
        #[message = "Authenticated `User` must own the `Booking`"]
        BookingOwner,

        #[code = "NOT_LOT_OPERATOR"]
        #[status = FORBIDDEN]
        #[message = "Authenticated `User` must operate the `Lot`"]
        LotOperator,

        #[code = "NOT_OPERATOR"]
        #[status = FORBIDDEN]
        #[message = "Authenticated `User` must be an operator"]
        Operator,
    }
}

define_error! {
    enum ValidationError {
        #[code = "INVALID_DURATION"]
        #[status = BAD_REQUEST]
        #[message = "Duration must be between 1 and 168 hours"]
        Duration,

        #[code = "INVALID_COORDINATES"]
        #[status = BAD_REQUEST]
        #[message = "Latitude must not exceed 90 and longitude 180 degrees"]
        Coordinates,

        #[code = "INVALID_CAPACITY"]
        #[status = BAD_REQUEST]
        #[message = "Number of slots must be between 1 and 1000"]
        Capacity,

        #[code = "INVALID_PRICE"]
        #[status = BAD_REQUEST]
        #[message = "Price must be positive and in the `Lot` currency"]
        Price,

        #[code = "INVALID_RADIUS"]
        #[status = BAD_REQUEST]
        #[message = "Radius must be positive and at most 50 km"]
        Radius,

        #[code = "INVALID_SCORE"]
        #[status = BAD_REQUEST]
        #[message = "Score must be between 1 and 5"]
        Score,
    }
}

define_error! {
    enum PaginationError {
        #[code = "INVALID_PAGE_SIZE"]
        #[status = BAD_REQUEST]
        #[message = "Page size must be between 1 and 100"]
        InvalidSize,
    }
}

impl AsError for domain::booking::TransitionError {
    fn try_as_error(&self) -> Option<Error> {
        use domain::booking::TransitionError as E;

        Some(match self {
            E::AlreadyCheckedIn => BookingError::AlreadyCheckedIn.into(),
            E::AlreadyRated => BookingError::AlreadyRated.into(),
            E::CurrencyMismatch => ValidationError::Price.into(),
            E::InvalidState(_) | E::NotOverdue => {
                BookingError::InvalidState.into()
            }
            E::NotActive(_) => BookingError::NotActive.into(),
            E::NotStarted => BookingError::NotStarted.into(),
            E::WindowPassed => BookingError::WindowPassed.into(),
        })
    }
}

/// Converts the provided `hours` into a [`domain::booking::Hours`].
///
/// # Errors
///
/// With [`ValidationError::Duration`] if `hours` are out of range.
pub(crate) fn hours(hours: i32) -> Result<domain::booking::Hours, Error> {
    u8::try_from(hours)
        .ok()
        .and_then(domain::booking::Hours::new)
        .ok_or_else(|| ValidationError::Duration.into())
}

/// Converts the provided `latitude` and `longitude` into
/// [`domain::lot::Coordinates`].
///
/// # Errors
///
/// With [`ValidationError::Coordinates`] if any of them is out of range.
pub(crate) fn coordinates(
    latitude: f64,
    longitude: f64,
) -> Result<domain::lot::Coordinates, Error> {
    domain::lot::Coordinates::new(latitude, longitude)
        .ok_or_else(|| ValidationError::Coordinates.into())
}

#[cfg(test)]
mod spec {
    use service::domain::booking::{Status, TransitionError};

    use crate::AsError as _;

    use super::{coordinates, hours};

    #[test]
    fn transition_error_codes() {
        for (err, code) in [
            (TransitionError::AlreadyCheckedIn, "ALREADY_CHECKED_IN"),
            (TransitionError::AlreadyRated, "ALREADY_RATED"),
            (
                TransitionError::InvalidState(Status::Completed),
                "INVALID_BOOKING_STATE",
            ),
            (
                TransitionError::NotActive(Status::Confirmed),
                "BOOKING_NOT_ACTIVE",
            ),
            (TransitionError::CurrencyMismatch, "INVALID_PRICE"),
        ] {
            let err = err.as_error();
            assert_eq!(err.code, code);
            assert!(err.status_code.is_client_error());
        }
    }

    #[test]
    fn validates_hours() {
        assert_eq!(hours(3).unwrap().get(), 3);
        for invalid in [-1, 0, 169, 1000] {
            assert_eq!(hours(invalid).unwrap_err().code, "INVALID_DURATION");
        }
    }

    #[test]
    fn validates_coordinates() {
        assert!(coordinates(12.97, 77.59).is_ok());
        assert_eq!(
            coordinates(91.0, 0.0).unwrap_err().code,
            "INVALID_COORDINATES",
        );
        assert_eq!(
            coordinates(0.0, f64::NAN).unwrap_err().code,
            "INVALID_COORDINATES",
        );
    }
}
