//! [`Command`] for checking a [`Booking`] in.

use common::{
    operations::{By, Commit, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{booking, lot, user, Booking, Event, Lot},
    infra::{database, Database},
    Service,
};

use super::{Command, MAX_ATTEMPTS};

/// [`Command`] for marking the [`booking::Vehicle`] of a [`Booking`] as
/// entered its [`Lot`].
#[derive(Clone, Copy, Debug)]
pub struct CheckInBooking {
    /// [`user::Actor`] checking the [`Booking`] in.
    ///
    /// Must be the [`Booking`] owner, the [`Lot`] operator or an admin.
    pub actor: user::Actor,

    /// ID of the [`Booking`] to check in.
    pub booking_id: booking::Id,
}

impl<Db> Command<CheckInBooking> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Booking>, booking::Id>>,
            Ok = Option<Booking>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Lot>, lot::Id>>,
            Ok = Option<Lot>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Select<By<Option<Booking>, booking::Id>>,
            Ok = Option<Booking>,
            Err = Traced<database::Error>,
        > + Database<
            Update<Booking>,
            Ok = Option<Booking>,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Booking;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CheckInBooking,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CheckInBooking { actor, booking_id } = cmd;

        let booking = self
            .database()
            .execute(Select(By::<Option<Booking>, _>::new(booking_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::BookingNotExists(booking_id))
            .map_err(tracerr::wrap!())?;
        if !actor.is_or_admin(booking.user_id) {
            let operator_id = self
                .database()
                .execute(Select(By::<Option<Lot>, _>::new(booking.lot_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .map(|lot| lot.operator_id);
            if operator_id != Some(actor.id) {
                return Err(tracerr::new!(E::NotAllowed(actor.id)));
            }
        }

        for attempt in 1..=MAX_ATTEMPTS {
            let tx = self
                .database()
                .execute(Transact)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;

            let mut booking = tx
                .execute(Select(By::<Option<Booking>, _>::new(booking_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::BookingNotExists(booking_id))
                .map_err(tracerr::wrap!())?;
            booking
                .check_in(DateTime::now())
                .map_err(tracerr::from_and_wrap!(=> E))?;

            let Some(booking) = tx
                .execute(Update(booking))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
            else {
                log::debug!(
                    "`Booking(id: {booking_id})` changed concurrently \
                     on attempt {attempt}",
                );
                continue;
            };

            tx.execute(Commit)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            self.relay().publish(Event::status_of(&booking));

            return Ok(booking);
        }

        Err(tracerr::new!(E::ConcurrencyConflict(booking_id)))
    }
}

/// Error of [`CheckInBooking`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Booking`] with the provided ID does not exist.
    #[display("`Booking(id: {_0})` does not exist")]
    #[from(ignore)]
    BookingNotExists(#[error(not(source))] booking::Id),

    /// [`Booking`] kept changing concurrently.
    #[display("`Booking(id: {_0})` is being changed concurrently")]
    #[from(ignore)]
    ConcurrencyConflict(#[error(not(source))] booking::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`user::Actor`] is neither the [`Booking`] owner, nor the [`Lot`]
    /// operator, nor an admin.
    #[display("`User(id: {_0})` is not allowed to check the `Booking` in")]
    #[from(ignore)]
    NotAllowed(#[error(not(source))] user::Id),

    /// [`Booking`] cannot be checked in.
    #[display("Invalid `Booking` transition: {_0}")]
    Transition(booking::TransitionError),
}
