//! Domain definitions.

pub mod booking;
pub mod event;
pub mod lot;
pub mod user;

pub use self::{booking::Booking, event::Event, lot::Lot};
