//! [`Event`] definitions.

use crate::domain::{booking, lot, Booking, Lot};

/// Change notification published after a successful commit.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Event {
    /// Number of available slots in a [`Lot`] has changed.
    SlotsChanged {
        /// ID of the changed [`Lot`].
        lot_id: lot::Id,

        /// New number of available slots.
        available: u16,

        /// Total number of slots.
        total: u16,
    },

    /// [`Booking`] status has changed.
    BookingChanged {
        /// ID of the changed [`Booking`].
        booking_id: booking::Id,

        /// ID of the [`Lot`] of the changed [`Booking`].
        lot_id: lot::Id,

        /// New [`booking::Status`].
        status: booking::Status,
    },
}

impl Event {
    /// Creates an [`Event::SlotsChanged`] describing the provided [`Lot`].
    #[must_use]
    pub fn slots_of(lot: &Lot) -> Self {
        Self::SlotsChanged {
            lot_id: lot.id,
            available: lot.available_slots(),
            total: lot.total_slots.get(),
        }
    }

    /// Creates an [`Event::BookingChanged`] describing the provided
    /// [`Booking`].
    #[must_use]
    pub fn status_of(booking: &Booking) -> Self {
        Self::BookingChanged {
            booking_id: booking.id,
            lot_id: booking.lot_id,
            status: booking.status,
        }
    }

    /// Returns ID of the [`Lot`] this [`Event`] relates to.
    #[must_use]
    pub fn lot_id(&self) -> lot::Id {
        match self {
            Self::SlotsChanged { lot_id, .. }
            | Self::BookingChanged { lot_id, .. } => *lot_id,
        }
    }
}
