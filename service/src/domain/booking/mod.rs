//! [`Booking`] definitions.

pub mod status;
pub mod vehicle;

use std::sync::LazyLock;

use common::{unit, DateTime, DateTimeOf, Money};
use derive_more::{AsRef, Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rand::Rng as _;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    lot::{self, Price},
    user, Lot,
};

pub use self::{
    status::{DisplayStatus, PaymentStatus, Status},
    vehicle::Vehicle,
};

/// Reservation of a single slot in a [`Lot`] for a time window.
#[derive(Clone, Debug)]
pub struct Booking {
    /// ID of this [`Booking`].
    pub id: Id,

    /// [`QrToken`] presented at the [`Lot`] gate.
    pub qr_token: QrToken,

    /// ID of the user owning this [`Booking`].
    pub user_id: user::Id,

    /// ID of the booked [`Lot`].
    pub lot_id: lot::Id,

    /// Booked [`Vehicle`].
    pub vehicle: Vehicle,

    /// Initially booked number of [`Hours`].
    pub duration: Hours,

    /// [`DateTime`] when this [`Booking`] starts.
    pub starts_at: StartDateTime,

    /// [`Lot`] price per hour at the moment of booking.
    pub hourly_rate: Money,

    /// [`Extension`]s of this [`Booking`] in the order they were made.
    pub extensions: Vec<Extension>,

    /// Lifecycle [`Status`] of this [`Booking`].
    pub status: Status,

    /// [`PaymentStatus`] of this [`Booking`].
    pub payment_status: PaymentStatus,

    /// [`DateTime`] when the [`Vehicle`] entered the [`Lot`].
    pub entered_at: Option<EntryDateTime>,

    /// [`DateTime`] when the [`Vehicle`] left the [`Lot`].
    pub exited_at: Option<ExitDateTime>,

    /// [`Cancellation`] of this [`Booking`], if any.
    pub cancellation: Option<Cancellation>,

    /// [`Rating`] left for this [`Booking`], if any.
    pub rating: Option<Rating>,

    /// [`DateTime`] when this [`Booking`] was created.
    pub created_at: CreationDateTime,

    /// [`Version`] of this [`Booking`] used for optimistic concurrency.
    pub version: Version,
}

impl Booking {
    /// Creates a new paid [`Booking`] of the provided [`Lot`].
    ///
    /// The [`Booking`] starts right away unless `starts_at` is provided.
    #[must_use]
    pub fn new(
        user_id: user::Id,
        lot: &Lot,
        vehicle: Vehicle,
        duration: Hours,
        starts_at: Option<StartDateTime>,
        qr_token: QrToken,
    ) -> Self {
        let created_at = CreationDateTime::now();
        Self {
            id: Id::new(),
            qr_token,
            user_id,
            lot_id: lot.id,
            vehicle,
            duration,
            starts_at: starts_at.unwrap_or_else(|| created_at.coerce()),
            hourly_rate: lot.price_per_hour.get(),
            extensions: vec![],
            status: Status::Confirmed,
            payment_status: PaymentStatus::Paid,
            entered_at: None,
            exited_at: None,
            cancellation: None,
            rating: None,
            created_at,
            version: Version::default(),
        }
    }

    /// Returns the total number of booked hours including [`Extension`]s.
    #[must_use]
    pub fn total_hours(&self) -> u32 {
        self.extensions
            .iter()
            .map(|ext| u32::from(ext.hours.get()))
            .sum::<u32>()
            + u32::from(self.duration.get())
    }

    /// Returns the [`DateTime`] when this [`Booking`] ends.
    #[must_use]
    pub fn ends_at(&self) -> EndDateTime {
        self.starts_at.plus_hours(self.total_hours()).coerce()
    }

    /// Returns the total [`Money`] amount of this [`Booking`] including
    /// [`Extension`]s.
    #[must_use]
    pub fn amount(&self) -> Money {
        self.extensions.iter().fold(
            self.hourly_rate.times(u32::from(self.duration.get())),
            |total, ext| total.checked_add(ext.amount).unwrap_or(total),
        )
    }

    /// Indicates whether this [`Booking`] still holds a [`Lot`] slot.
    #[must_use]
    pub fn holds_slot(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Computes the [`DisplayStatus`] of this [`Booking`] at the provided
    /// moment.
    #[must_use]
    pub fn display_status(&self, now: DateTime) -> DisplayStatus {
        match self.status {
            Status::Cancelled => return DisplayStatus::Cancelled,
            Status::Completed => return DisplayStatus::Completed,
            Status::Expired => return DisplayStatus::Expired,
            Status::Pending => return DisplayStatus::Pending,
            Status::Confirmed | Status::Active => {}
        }

        let ends_at: DateTime = self.ends_at().coerce();
        if self.entered_at.is_some() && self.exited_at.is_none() {
            return if now > ends_at {
                DisplayStatus::Overdue
            } else {
                DisplayStatus::Parked
            };
        }
        if now < self.starts_at.coerce() {
            DisplayStatus::Upcoming
        } else if now <= ends_at {
            DisplayStatus::Active
        } else {
            DisplayStatus::Overdue
        }
    }

    /// Returns the number of whole minutes left until this [`Booking`] ends.
    ///
    /// Zero is returned for finished [`Booking`]s.
    #[must_use]
    pub fn remaining_minutes(&self, now: DateTime) -> u64 {
        if !matches!(self.status, Status::Confirmed | Status::Active)
            || self.exited_at.is_some()
        {
            return 0;
        }
        self.ends_at()
            .duration_since(now)
            .map_or(0, |left| left.as_secs() / 60)
    }

    /// Marks the [`Vehicle`] as entered the [`Lot`].
    ///
    /// Entry is only possible within the booked window.
    ///
    /// # Errors
    ///
    /// If the [`Vehicle`] has entered already, this [`Booking`] is not
    /// [`Status::Confirmed`], or `now` is outside of its window.
    pub fn check_in(&mut self, now: DateTime) -> Result<(), TransitionError> {
        if self.entered_at.is_some() {
            return Err(TransitionError::AlreadyCheckedIn);
        }
        if self.status != Status::Confirmed {
            return Err(TransitionError::InvalidState(self.status));
        }
        if now < self.starts_at.coerce() {
            return Err(TransitionError::NotStarted);
        }
        if now > self.ends_at().coerce() {
            return Err(TransitionError::WindowPassed);
        }
        self.entered_at = Some(now.coerce());
        self.status = Status::Active;
        Ok(())
    }

    /// Marks the [`Vehicle`] as left the [`Lot`], completing this
    /// [`Booking`].
    ///
    /// # Errors
    ///
    /// If this [`Booking`] is not [`Status::Active`].
    pub fn check_out(&mut self, now: DateTime) -> Result<(), TransitionError> {
        if self.status != Status::Active {
            return Err(TransitionError::NotActive(self.status));
        }
        self.exited_at = Some(now.coerce());
        self.status = Status::Completed;
        Ok(())
    }

    /// Cancels this [`Booking`] with an optional `reason`.
    ///
    /// # Errors
    ///
    /// If this [`Booking`] is already in a terminal [`Status`].
    pub fn cancel(
        &mut self,
        reason: Option<Note>,
        now: DateTime,
    ) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::InvalidState(self.status));
        }
        self.cancellation = Some(Cancellation {
            reason,
            cancelled_at: now.coerce(),
        });
        self.status = Status::Cancelled;
        Ok(())
    }

    /// Expires this [`Booking`] if its window has passed without the
    /// [`Vehicle`] ever entering.
    ///
    /// # Errors
    ///
    /// If this [`Booking`] is not [`Status::Confirmed`] or is not overdue yet.
    pub fn expire(&mut self, now: DateTime) -> Result<(), TransitionError> {
        if self.status != Status::Confirmed {
            return Err(TransitionError::InvalidState(self.status));
        }
        if self.entered_at.is_some() || self.ends_at().coerce() >= now {
            return Err(TransitionError::NotOverdue);
        }
        self.status = Status::Expired;
        Ok(())
    }

    /// Extends this [`Booking`] by the provided [`Hours`] at the provided
    /// (current) [`Price`], returning the charged [`Money`] amount.
    ///
    /// # Errors
    ///
    /// If this [`Booking`] is neither [`Status::Confirmed`] nor
    /// [`Status::Active`], or the [`Price`] is in a foreign currency.
    pub fn extend(
        &mut self,
        hours: Hours,
        price: Price,
        now: DateTime,
    ) -> Result<Money, TransitionError> {
        if !matches!(self.status, Status::Confirmed | Status::Active) {
            return Err(TransitionError::InvalidState(self.status));
        }
        let amount = price.get().times(u32::from(hours.get()));
        if amount.currency != self.hourly_rate.currency {
            return Err(TransitionError::CurrencyMismatch);
        }
        self.extensions.push(Extension {
            hours,
            amount,
            created_at: now.coerce(),
        });
        Ok(amount)
    }

    /// Rates this [`Booking`] once it's completed.
    ///
    /// # Errors
    ///
    /// If this [`Booking`] is not [`Status::Completed`] or is rated already.
    pub fn rate(
        &mut self,
        score: Score,
        comment: Option<Note>,
        now: DateTime,
    ) -> Result<(), TransitionError> {
        if self.status != Status::Completed {
            return Err(TransitionError::InvalidState(self.status));
        }
        if self.rating.is_some() {
            return Err(TransitionError::AlreadyRated);
        }
        self.rating = Some(Rating {
            score,
            comment,
            rated_at: now.coerce(),
        });
        Ok(())
    }
}

/// Error of an invalid [`Booking`] transition.
#[derive(Clone, Copy, Debug, Display, Error)]
pub enum TransitionError {
    /// [`Vehicle`] has already entered the [`Lot`].
    #[display("`Booking` is already checked in")]
    AlreadyCheckedIn,

    /// [`Booking`] is already rated.
    #[display("`Booking` is already rated")]
    AlreadyRated,

    /// [`Price`] currency differs from the [`Booking`] one.
    #[display("`Price` currency differs from the `Booking` one")]
    CurrencyMismatch,

    /// Transition is not allowed from the current [`Status`].
    #[display("`Booking` cannot leave `{_0}` status this way")]
    InvalidState(#[error(not(source))] Status),

    /// [`Booking`] is not [`Status::Active`].
    #[display("`Booking` is `{_0}`, not `ACTIVE`")]
    NotActive(#[error(not(source))] Status),

    /// [`Booking`] window hasn't passed yet or the [`Vehicle`] has entered.
    #[display("`Booking` is not overdue")]
    NotOverdue,

    /// [`Booking`] window hasn't started yet.
    #[display("`Booking` has not started yet")]
    NotStarted,

    /// [`Booking`] window has passed without the [`Vehicle`] entering.
    #[display("`Booking` window has passed")]
    WindowPassed,
}

/// ID of a [`Booking`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Short token encoded into a QR code and checked at the [`Lot`] gate.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct QrToken(String);

impl QrToken {
    /// Length of a generated [`QrToken`].
    pub const LEN: usize = 8;

    /// Characters of a generated [`QrToken`].
    ///
    /// Ambiguous `I`, `O`, `0` and `1` are omitted.
    const ALPHABET: &'static [u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

    /// Generates a new random [`QrToken`].
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self(
            (0..Self::LEN)
                .map(|_| {
                    char::from(
                        Self::ALPHABET[rng.gen_range(0..Self::ALPHABET.len())],
                    )
                })
                .collect(),
        )
    }

    /// Creates a new [`QrToken`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `token` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Creates a new [`QrToken`] if the given `token` is valid, normalizing
    /// it to uppercase.
    #[must_use]
    pub fn new(token: impl AsRef<str>) -> Option<Self> {
        let token = token.as_ref().trim().to_uppercase();
        Self::check(&token).then_some(Self(token))
    }

    /// Checks whether the given `token` is a valid [`QrToken`].
    fn check(token: impl AsRef<str>) -> bool {
        /// Regular expression checking [`QrToken`] invariants:
        /// - Must consist of uppercase Latin letters and digits;
        /// - Must be between 6 and 8 characters long.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[A-Z0-9]{6,8}$").expect("valid regex")
        });

        REGEX.is_match(token.as_ref())
    }
}

impl FromStr for QrToken {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `QrToken`")
    }
}

/// Number of hours in `1..=168` range (one week at most).
#[derive(
    Clone, Copy, Debug, Display, Eq, Hash, Into, Ord, PartialEq, PartialOrd,
)]
pub struct Hours(u8);

impl Hours {
    /// Maximum number of [`Hours`].
    pub const MAX: u8 = 168;

    /// Creates new [`Hours`] if the provided number is in `1..=168` range.
    #[must_use]
    pub fn new(hours: u8) -> Option<Self> {
        (1..=Self::MAX).contains(&hours).then_some(Self(hours))
    }

    /// Returns the number of hours.
    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }
}

/// Prolongation of a [`Booking`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Extension {
    /// Number of extra [`Hours`].
    pub hours: Hours,

    /// [`Money`] charged for the extra [`Hours`].
    pub amount: Money,

    /// [`DateTime`] when this [`Extension`] was made.
    pub created_at: ExtensionDateTime,
}

/// Cancellation details of a [`Booking`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Cancellation {
    /// Reason given by the canceller.
    pub reason: Option<Note>,

    /// [`DateTime`] of the cancellation.
    pub cancelled_at: CancellationDateTime,
}

/// Rating of a completed [`Booking`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Rating {
    /// [`Score`] given.
    pub score: Score,

    /// Optional comment.
    pub comment: Option<Note>,

    /// [`DateTime`] when the [`Rating`] was left.
    pub rated_at: RatingDateTime,
}

/// Rating score in `1..=5` range.
#[derive(
    Clone, Copy, Debug, Display, Eq, Hash, Into, Ord, PartialEq, PartialOrd,
)]
pub struct Score(u8);

impl Score {
    /// Creates a new [`Score`] if the provided value is in `1..=5` range.
    #[must_use]
    pub fn new(score: u8) -> Option<Self> {
        (1..=5).contains(&score).then_some(Self(score))
    }

    /// Returns the value of this [`Score`].
    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }
}

/// Free-form text left by a user, such as a cancellation reason or a rating
/// comment.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Note(String);

impl Note {
    /// Maximum length of a [`Note`] in characters.
    pub const MAX_LEN: usize = 500;

    /// Creates a new [`Note`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `note` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(note: impl Into<String>) -> Self {
        Self(note.into())
    }

    /// Creates a new [`Note`] if the given `note` is valid.
    #[must_use]
    pub fn new(note: impl Into<String>) -> Option<Self> {
        let note = note.into();
        Self::check(&note).then_some(Self(note))
    }

    /// Checks whether the given `note` is a valid [`Note`].
    fn check(note: impl AsRef<str>) -> bool {
        let note = note.as_ref();
        !note.trim().is_empty() && note.chars().count() <= Self::MAX_LEN
    }
}

impl FromStr for Note {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Note`")
    }
}

/// Optimistic concurrency version of a [`Booking`].
///
/// Incremented on every stored change.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    Eq,
    From,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Version(i32);

impl Version {
    /// Returns the [`Version`] following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// [`DateTime`] when a [`Booking`] was created.
pub type CreationDateTime = DateTimeOf<(Booking, unit::Creation)>;

/// [`DateTime`] when a [`Booking`] starts.
pub type StartDateTime = DateTimeOf<(Booking, unit::Start)>;

/// [`DateTime`] when a [`Booking`] ends.
pub type EndDateTime = DateTimeOf<(Booking, unit::End)>;

/// [`DateTime`] when a [`Vehicle`] entered a [`Lot`].
pub type EntryDateTime = DateTimeOf<(Booking, unit::Entry)>;

/// [`DateTime`] when a [`Vehicle`] left a [`Lot`].
pub type ExitDateTime = DateTimeOf<(Booking, unit::Exit)>;

/// [`DateTime`] when a [`Booking`] was cancelled.
pub type CancellationDateTime = DateTimeOf<(Booking, unit::Cancellation)>;

/// [`DateTime`] when a [`Booking`] was rated.
pub type RatingDateTime = DateTimeOf<(Booking, unit::Rating)>;

/// [`DateTime`] when an [`Extension`] was made.
pub type ExtensionDateTime = DateTimeOf<(Extension, unit::Creation)>;

#[cfg(test)]
mod spec {
    use std::{collections::HashSet, time::Duration};

    use common::{DateTime, Money};

    use crate::domain::{
        lot::{Address, Capacity, Coordinates, Name, Price},
        user, Lot,
    };

    use super::{
        vehicle, Booking, DisplayStatus, Hours, Note, QrToken, Score, Status,
        TransitionError, Vehicle,
    };

    fn lot(price: &str) -> Lot {
        Lot::new(
            user::Id::new(),
            Name::new("Central Parking").unwrap(),
            Address::new("1 Main St").unwrap(),
            Coordinates::new(12.9716, 77.5946).unwrap(),
            Capacity::new(10).unwrap(),
            Price::new(price.parse().unwrap()).unwrap(),
        )
    }

    fn booking(hours: u8) -> Booking {
        Booking::new(
            user::Id::new(),
            &lot("100INR"),
            Vehicle {
                name: vehicle::Name::new("Swift").unwrap(),
                plate: vehicle::Plate::new("ka01ab1234").unwrap(),
                kind: vehicle::Kind::Car,
            },
            Hours::new(hours).unwrap(),
            None,
            QrToken::generate(),
        )
    }

    fn hours(n: u64) -> Duration {
        Duration::from_secs(n * 3600)
    }

    #[test]
    fn new_booking_is_confirmed_and_priced() {
        let booking = booking(2);

        assert_eq!(booking.status, Status::Confirmed);
        assert_eq!(booking.amount(), "200INR".parse::<Money>().unwrap());
        assert_eq!(
            booking.ends_at().coerce::<()>(),
            booking.starts_at.coerce::<()>() + hours(2),
        );
    }

    #[test]
    fn extension_adds_hours_and_current_price() {
        let mut booking = booking(2);
        let price = Price::new("150INR".parse().unwrap()).unwrap();

        let charged = booking
            .extend(Hours::new(3).unwrap(), price, DateTime::now())
            .unwrap();

        assert_eq!(charged, "450INR".parse().unwrap());
        assert_eq!(booking.total_hours(), 5);
        assert_eq!(booking.amount(), "650INR".parse().unwrap());
        assert_eq!(
            booking.ends_at().coerce::<()>(),
            booking.starts_at.coerce::<()>() + hours(5),
        );
    }

    #[test]
    fn extension_requires_same_currency() {
        let mut booking = booking(1);
        let price = Price::new("1USD".parse().unwrap()).unwrap();

        assert!(matches!(
            booking.extend(Hours::new(1).unwrap(), price, DateTime::now()),
            Err(TransitionError::CurrencyMismatch),
        ));
        assert!(booking.extensions.is_empty());
    }

    #[test]
    fn check_in_requires_confirmed() {
        let mut booking = booking(1);

        booking.check_in(DateTime::now()).unwrap();
        assert_eq!(booking.status, Status::Active);
        assert!(matches!(
            booking.check_in(DateTime::now()),
            Err(TransitionError::AlreadyCheckedIn),
        ));

        let mut cancelled = self::booking(1);
        cancelled.cancel(None, DateTime::now()).unwrap();
        assert!(matches!(
            cancelled.check_in(DateTime::now()),
            Err(TransitionError::InvalidState(Status::Cancelled)),
        ));
    }

    #[test]
    fn check_in_only_within_window() {
        let now = DateTime::now();

        let mut early = booking(1);
        early.starts_at = (now + hours(1)).coerce();
        assert!(matches!(
            early.check_in(now),
            Err(TransitionError::NotStarted),
        ));
        assert_eq!(early.status, Status::Confirmed);
        assert!(early.entered_at.is_none());

        let mut late = booking(1);
        late.starts_at = (now - hours(3)).coerce();
        assert!(matches!(
            late.check_in(now),
            Err(TransitionError::WindowPassed),
        ));
        assert_eq!(late.status, Status::Confirmed);
        late.expire(now).unwrap();
        assert_eq!(late.status, Status::Expired);

        let mut on_time = booking(2);
        on_time.starts_at = (now - hours(1)).coerce();
        on_time.check_in(now).unwrap();
        assert_eq!(on_time.status, Status::Active);
    }

    #[test]
    fn check_out_requires_active() {
        let mut booking = booking(1);
        assert!(matches!(
            booking.check_out(DateTime::now()),
            Err(TransitionError::NotActive(Status::Confirmed)),
        ));

        booking.check_in(DateTime::now()).unwrap();
        booking.check_out(DateTime::now()).unwrap();
        assert_eq!(booking.status, Status::Completed);
        assert!(booking.exited_at.is_some());
        assert!(!booking.holds_slot());
    }

    #[test]
    fn cancel_fails_for_terminal_statuses() {
        let mut booking = booking(1);
        booking.check_in(DateTime::now()).unwrap();
        booking.check_out(DateTime::now()).unwrap();
        assert!(matches!(
            booking.cancel(None, DateTime::now()),
            Err(TransitionError::InvalidState(Status::Completed)),
        ));

        let mut booking = self::booking(1);
        booking
            .cancel(Note::new("plans changed"), DateTime::now())
            .unwrap();
        assert_eq!(booking.status, Status::Cancelled);
        assert!(booking.cancel(None, DateTime::now()).is_err());
    }

    #[test]
    fn active_booking_may_be_cancelled() {
        let mut booking = booking(1);
        booking.check_in(DateTime::now()).unwrap();

        assert!(booking.holds_slot());
        booking.cancel(None, DateTime::now()).unwrap();
        assert_eq!(booking.status, Status::Cancelled);
    }

    #[test]
    fn expires_only_when_overdue() {
        let mut booking = booking(2);
        let now = DateTime::now();

        assert!(matches!(
            booking.expire(now),
            Err(TransitionError::NotOverdue),
        ));

        booking.expire(now + hours(3)).unwrap();
        assert_eq!(booking.status, Status::Expired);
        assert!(matches!(
            booking.expire(now + hours(3)),
            Err(TransitionError::InvalidState(Status::Expired)),
        ));
    }

    #[test]
    fn display_status() {
        let now = DateTime::now();
        let mut booking = booking(2);
        booking.starts_at = (now + hours(1)).coerce();

        assert_eq!(booking.display_status(now), DisplayStatus::Upcoming);
        assert_eq!(
            booking.display_status(now + hours(2)),
            DisplayStatus::Active,
        );
        assert_eq!(
            booking.display_status(now + hours(4)),
            DisplayStatus::Overdue,
        );

        booking.check_in(now + hours(1)).unwrap();
        assert_eq!(
            booking.display_status(now + hours(2)),
            DisplayStatus::Parked,
        );
        assert_eq!(
            booking.display_status(now + hours(4)),
            DisplayStatus::Overdue,
        );

        booking.check_out(now).unwrap();
        assert_eq!(booking.display_status(now), DisplayStatus::Completed);
    }

    #[test]
    fn remaining_minutes() {
        let now = DateTime::now();
        let mut booking = booking(2);
        booking.starts_at = now.coerce();

        assert_eq!(booking.remaining_minutes(now), 120);
        assert_eq!(
            booking.remaining_minutes(now + Duration::from_secs(90)),
            118,
        );
        assert_eq!(booking.remaining_minutes(now + hours(3)), 0);

        booking.cancel(None, now).unwrap();
        assert_eq!(booking.remaining_minutes(now), 0);
    }

    #[test]
    fn rates_completed_once() {
        let mut booking = booking(1);
        let score = Score::new(5).unwrap();
        assert!(matches!(
            booking.rate(score, None, DateTime::now()),
            Err(TransitionError::InvalidState(Status::Confirmed)),
        ));

        booking.check_in(DateTime::now()).unwrap();
        booking.check_out(DateTime::now()).unwrap();
        booking.rate(score, Note::new("nice"), DateTime::now()).unwrap();
        assert!(matches!(
            booking.rate(score, None, DateTime::now()),
            Err(TransitionError::AlreadyRated),
        ));
    }

    #[test]
    fn validates_values() {
        assert!(Hours::new(0).is_none());
        assert!(Hours::new(169).is_none());
        assert!(Hours::new(168).is_some());
        assert!(Score::new(0).is_none());
        assert!(Score::new(6).is_none());
        assert!(Note::new("  ").is_none());
        assert!(Note::new("x".repeat(501)).is_none());

        assert_eq!(QrToken::new("ab12cd").unwrap().to_string(), "AB12CD");
        assert!(QrToken::new("AB12C").is_none());
        assert!(QrToken::new("AB12CD345").is_none());
        assert!(QrToken::new("AB-2CD").is_none());
    }

    #[test]
    fn generated_qr_tokens_are_valid_and_distinct() {
        let tokens = (0..1000)
            .map(|_| QrToken::generate())
            .inspect(|token| {
                let token = token.to_string();
                assert_eq!(token.len(), QrToken::LEN);
                assert!(QrToken::new(&token).is_some());
                assert!(!token.contains(['I', 'O', '0', '1']));
            })
            .collect::<HashSet<_>>();

        assert!(tokens.len() > 990);
    }
}
