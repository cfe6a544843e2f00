//! [`Booking`]-related read definitions.

use common::DateTime;

use crate::domain::{
    booking::{self, DisplayStatus},
    lot, Booking,
};

/// [`Booking`] along with its values derived at read time.
#[derive(Clone, Debug)]
pub struct Summary {
    /// Summarized [`Booking`].
    pub booking: Booking,

    /// [`DisplayStatus`] of the [`Booking`].
    pub display_status: DisplayStatus,

    /// Whole minutes left until the [`Booking`] ends.
    pub remaining_minutes: u64,
}

impl Summary {
    /// Summarizes the provided [`Booking`] at the provided moment.
    #[must_use]
    pub fn at(booking: Booking, now: DateTime) -> Self {
        Self {
            display_status: booking.display_status(now),
            remaining_minutes: booking.remaining_minutes(now),
            booking,
        }
    }
}

/// Selector of [`booking::Status::Confirmed`] [`Booking`]s which have ended
/// without the vehicle ever entering.
#[derive(Clone, Copy, Debug)]
pub struct Overdue {
    /// Moment to consider [`Booking`]s overdue at.
    pub at: DateTime,

    /// Maximum number of [`Booking`]s to select.
    pub limit: u16,
}

/// Selector of the recent [`booking::Status::Active`] and
/// [`booking::Status::Completed`] [`Booking`]s of a [`Lot`], newest first.
///
/// [`Lot`]: crate::domain::Lot
#[derive(Clone, Copy, Debug)]
pub struct History {
    /// ID of the [`Lot`] whose [`Booking`]s are selected.
    ///
    /// [`Lot`]: crate::domain::Lot
    pub lot_id: lot::Id,

    /// Maximum number of [`Booking`]s to select.
    pub limit: u16,
}

impl History {
    /// [`booking::Status`]es of the [`Booking`]s in a [`History`].
    pub const STATUSES: [booking::Status; 2] =
        [booking::Status::Active, booking::Status::Completed];
}

pub mod list {
    //! [`Booking`] list definitions.

    use std::{fmt, str::FromStr};

    use common::{define_pagination, DateTime};
    use derive_more::{AsRef, Display};

    use crate::domain::{
        booking::{self, vehicle::Plate},
        lot, user, Booking,
    };

    define_pagination!(Cursor, Node, Filter);

    /// Node in a [`Page`].
    pub type Node = Booking;

    /// Cursor pointing to a specific [`Booking`] in a list.
    ///
    /// [`Booking`]s are listed newest first, so the cursor is a creation
    /// moment and an ID breaking ties between equal moments.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct Cursor {
        /// [`DateTime`] when the [`Booking`] was created.
        pub created_at: booking::CreationDateTime,

        /// ID of the [`Booking`].
        pub id: booking::Id,
    }

    impl Cursor {
        /// Separator between the [`Cursor`] parts in its string
        /// representation.
        const SEPARATOR: char = '~';
    }

    impl From<&Booking> for Cursor {
        fn from(booking: &Booking) -> Self {
            Self {
                created_at: booking.created_at,
                id: booking.id,
            }
        }
    }

    impl fmt::Display for Cursor {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(
                f,
                "{}{}{}",
                self.created_at.to_rfc3339(),
                Self::SEPARATOR,
                self.id,
            )
        }
    }

    impl FromStr for Cursor {
        type Err = &'static str;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            let (created_at, id) =
                s.split_once(Self::SEPARATOR).ok_or("missing separator")?;
            Ok(Self {
                created_at: DateTime::from_rfc3339(created_at)
                    .map_err(|_| "invalid `DateTime`")?
                    .coerce(),
                id: id.parse().map_err(|_| "invalid `booking::Id`")?,
            })
        }
    }

    /// Filter for [`Selector`].
    #[derive(Clone, Debug)]
    pub struct Filter {
        /// [`Scope`] the listed [`Booking`]s belong to.
        pub scope: Scope,

        /// [`booking::Status`] of the listed [`Booking`]s, if any specific.
        pub status: Option<booking::Status>,

        /// [`PlateSearch`] the [`Booking`]s' vehicles must match, if any.
        pub plate: Option<PlateSearch>,
    }

    impl Filter {
        /// Checks whether the provided [`Booking`] passes this [`Filter`]
        /// (the cursor aside).
        #[must_use]
        pub fn matches(&self, booking: &Booking) -> bool {
            let in_scope = match self.scope {
                Scope::User(id) => booking.user_id == id,
                Scope::Lot(id) => booking.lot_id == id,
            };
            in_scope
                && self.status.map_or(true, |st| booking.status == st)
                && self
                    .plate
                    .as_ref()
                    .map_or(true, |p| p.matches(&booking.vehicle.plate))
        }
    }

    /// Owner of the listed [`Booking`]s.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub enum Scope {
        /// [`Booking`]s made by the user with this ID.
        User(user::Id),

        /// [`Booking`]s of the [`Lot`] with this ID.
        ///
        /// [`Lot`]: crate::domain::Lot
        Lot(lot::Id),
    }

    /// Case-insensitive fragment of a [`Plate`] to look [`Booking`]s up by.
    #[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
    #[as_ref(str)]
    pub struct PlateSearch(String);

    impl PlateSearch {
        /// Maximum length of a [`PlateSearch`], equal to the longest
        /// [`Plate`].
        pub const MAX_LEN: usize = 16;

        /// Creates a new [`PlateSearch`] out of the provided `fragment`,
        /// normalizing it to uppercase.
        ///
        /// [`None`] is returned if the `fragment` is blank, too long, or
        /// contains characters no [`Plate`] may contain.
        #[must_use]
        pub fn new(fragment: impl AsRef<str>) -> Option<Self> {
            let fragment = fragment.as_ref().trim().to_uppercase();
            let valid = (1..=Self::MAX_LEN).contains(&fragment.len())
                && fragment.chars().all(|c| {
                    c.is_ascii_uppercase()
                        || c.is_ascii_digit()
                        || matches!(c, ' ' | '-')
                });
            valid.then_some(Self(fragment))
        }

        /// Checks whether the provided [`Plate`] contains this
        /// [`PlateSearch`].
        #[must_use]
        pub fn matches(&self, plate: &Plate) -> bool {
            AsRef::<str>::as_ref(plate).contains(self.0.as_str())
        }
    }

    impl FromStr for PlateSearch {
        type Err = &'static str;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            Self::new(s).ok_or("invalid `PlateSearch`")
        }
    }

    #[cfg(test)]
    mod spec {
        use common::DateTime;

        use crate::domain::booking::{self, vehicle::Plate};

        use super::{Cursor, PlateSearch};

        #[test]
        fn plate_search_is_case_insensitive_fragment() {
            let plate = Plate::new("KA01AB1234").unwrap();

            assert!(PlateSearch::new("ab12").unwrap().matches(&plate));
            assert!(PlateSearch::new("  ka01 ").unwrap().matches(&plate));
            assert!(!PlateSearch::new("MH12").unwrap().matches(&plate));

            assert!(PlateSearch::new("   ").is_none());
            assert!(PlateSearch::new("KA%").is_none());
            assert!(PlateSearch::new("A".repeat(17)).is_none());
        }

        #[test]
        fn cursor_from_to_string() {
            let cursor = Cursor {
                created_at: DateTime::now().coerce(),
                id: booking::Id::new(),
            };

            assert_eq!(cursor.to_string().parse::<Cursor>(), Ok(cursor));
            assert!("garbage".parse::<Cursor>().is_err());
            assert!(format!("{}~nope", DateTime::now().to_rfc3339())
                .parse::<Cursor>()
                .is_err());
        }
    }
}
