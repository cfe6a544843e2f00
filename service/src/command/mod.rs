//! [`Command`] definition.

pub mod authorize_user_session;
pub mod cancel_booking;
pub mod check_in_booking;
pub mod check_out_booking;
pub mod create_booking;
pub mod create_lot;
pub mod deactivate_lot;
pub mod extend_booking;
pub mod rate_booking;
pub mod update_lot;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    authorize_user_session::AuthorizeUserSession,
    cancel_booking::CancelBooking, check_in_booking::CheckInBooking,
    check_out_booking::CheckOutBooking, create_booking::CreateBooking,
    create_lot::CreateLot, deactivate_lot::DeactivateLot,
    extend_booking::ExtendBooking, rate_booking::RateBooking,
    update_lot::UpdateLot,
};

/// Maximum number of attempts a [`Command`] makes when it loses an
/// optimistic concurrency race or hits a colliding
/// [`QrToken`](crate::domain::booking::QrToken).
pub const MAX_ATTEMPTS: u8 = 3;
