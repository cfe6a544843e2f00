//! [`Status`]-related definitions of a [`Booking`].

#[cfg(doc)]
use super::Booking;
use common::define_kind;

define_kind! {
    #[doc = "Lifecycle status of a [`Booking`]."]
    enum Status {
        #[doc = "[`Booking`] is awaiting its payment."]
        Pending = 1,

        #[doc = "[`Booking`] is paid and holds a slot."]
        Confirmed = 2,

        #[doc = "Vehicle has entered the lot."]
        Active = 3,

        #[doc = "Vehicle has left the lot."]
        Completed = 4,

        #[doc = "[`Booking`] was cancelled."]
        Cancelled = 5,

        #[doc = "[`Booking`] has ended without the vehicle ever entering."]
        Expired = 6,
    }
}

impl Status {
    /// Indicates whether this [`Status`] is final, so no further transitions
    /// are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Expired)
    }
}

define_kind! {
    #[doc = "Payment status of a [`Booking`]."]
    enum PaymentStatus {
        #[doc = "Payment is not received yet."]
        Pending = 1,

        #[doc = "Payment is received."]
        Paid = 2,

        #[doc = "Payment has failed."]
        Failed = 3,

        #[doc = "Payment was returned to the payer."]
        Refunded = 4,
    }
}

define_kind! {
    #[doc = "Human-facing status of a [`Booking`] computed at read time."]
    enum DisplayStatus {
        #[doc = "[`Status::Pending`]."]
        Pending = 1,

        #[doc = "[`Booking`] starts in the future."]
        Upcoming = 2,

        #[doc = "[`Booking`] window is running and the vehicle hasn't entered."]
        Active = 3,

        #[doc = "Vehicle is inside the lot within the [`Booking`] window."]
        Parked = 4,

        #[doc = "[`Booking`] window has passed."]
        Overdue = 5,

        #[doc = "[`Status::Completed`]."]
        Completed = 6,

        #[doc = "[`Status::Cancelled`]."]
        Cancelled = 7,

        #[doc = "[`Status::Expired`]."]
        Expired = 8,
    }
}
