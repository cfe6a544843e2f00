//! [`Lot`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Money, Percent};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::user;

/// Parking lot with a limited number of slots.
#[derive(Clone, Debug)]
pub struct Lot {
    /// ID of this [`Lot`].
    pub id: Id,

    /// ID of the operator owning this [`Lot`].
    pub operator_id: user::Id,

    /// [`Name`] of this [`Lot`].
    pub name: Name,

    /// [`Address`] of this [`Lot`].
    pub address: Address,

    /// [`Coordinates`] of this [`Lot`] entrance.
    pub location: Coordinates,

    /// Total number of slots in this [`Lot`].
    pub total_slots: Capacity,

    /// Number of currently free slots.
    ///
    /// Always within `0..=total_slots`, so is mutated only via [`Lot`]
    /// methods.
    pub(crate) available_slots: u16,

    /// [`Price`] of a single slot per hour.
    pub price_per_hour: Price,

    /// Aggregated [`Stats`] of this [`Lot`].
    pub stats: Stats,

    /// Aggregated [`Rating`] of this [`Lot`].
    pub rating: Rating,

    /// [`DateTime`] when this [`Lot`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Lot`] was deactivated, if it was.
    pub deactivated_at: Option<DeactivationDateTime>,
}

impl Lot {
    /// Creates a new active [`Lot`] with all its slots available.
    #[must_use]
    pub fn new(
        operator_id: user::Id,
        name: Name,
        address: Address,
        location: Coordinates,
        total_slots: Capacity,
        price_per_hour: Price,
    ) -> Self {
        Self {
            id: Id::new(),
            operator_id,
            name,
            address,
            location,
            total_slots,
            available_slots: total_slots.get(),
            stats: Stats::zero(price_per_hour.currency()),
            price_per_hour,
            rating: Rating::default(),
            created_at: CreationDateTime::now(),
            deactivated_at: None,
        }
    }

    /// Returns the number of currently free slots.
    #[must_use]
    pub fn available_slots(&self) -> u16 {
        self.available_slots
    }

    /// Returns the number of currently occupied slots.
    #[must_use]
    pub fn occupied_slots(&self) -> u16 {
        self.total_slots.get() - self.available_slots
    }

    /// Indicates whether this [`Lot`] accepts new reservations.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.deactivated_at.is_none()
    }

    /// Returns the [`Percent`] of the occupied slots.
    #[must_use]
    pub fn occupancy(&self) -> Percent {
        Percent::of(
            u32::from(self.occupied_slots()),
            u32::from(self.total_slots.get()),
        )
        .unwrap_or(Percent::HUNDRED)
    }

    /// Returns the current [`Availability`] of this [`Lot`].
    #[must_use]
    pub fn availability(&self) -> Availability {
        Availability::from(self.occupancy())
    }

    /// Takes a single slot of this [`Lot`] for the provided number of `hours`,
    /// accounting it in the [`Stats`].
    ///
    /// Returns `false` and leaves this [`Lot`] untouched if it's inactive or
    /// has no free slots.
    pub fn acquire_slot(&mut self, hours: u32) -> bool {
        if !self.is_active() || self.available_slots == 0 {
            return false;
        }
        self.available_slots -= 1;
        self.stats.total_bookings += 1;
        self.stats.add_revenue(self.price_per_hour.get().times(hours));
        true
    }

    /// Gives a single slot back to this [`Lot`].
    ///
    /// Never makes [`Lot::available_slots()`] exceed the total.
    pub fn release_slot(&mut self) {
        self.available_slots =
            (self.available_slots + 1).min(self.total_slots.get());
    }

    /// Changes the [`Capacity`] of this [`Lot`] preserving the number of
    /// occupied slots where possible.
    ///
    /// Available slots are clamped to zero when the new total is below the
    /// number of occupied slots.
    pub fn resize(&mut self, total_slots: Capacity) {
        let occupied = self.occupied_slots();
        self.total_slots = total_slots;
        self.available_slots = total_slots.get().saturating_sub(occupied);
    }
}

/// ID of a [`Lot`].
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

/// Name of a [`Lot`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(str, String)]
pub struct Name(String);

impl Name {
    /// Maximum length of a [`Name`] in characters.
    pub const MAX_LEN: usize = 100;

    /// Creates a new [`Name`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `name` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a new [`Name`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`Name`].
    fn check(name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        name.trim() == name
            && !name.is_empty()
            && name.chars().count() <= Self::MAX_LEN
    }
}

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Name`")
    }
}

/// Postal address of a [`Lot`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(str, String)]
pub struct Address(String);

impl Address {
    /// Maximum length of an [`Address`] in characters.
    pub const MAX_LEN: usize = 200;

    /// Creates a new [`Address`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `address` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Creates a new [`Address`] if the given `address` is valid.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Option<Self> {
        let address = address.into();
        Self::check(&address).then_some(Self(address))
    }

    /// Checks whether the given `address` is a valid [`Address`].
    fn check(address: impl AsRef<str>) -> bool {
        let address = address.as_ref();
        address.trim() == address
            && !address.is_empty()
            && address.chars().count() <= Self::MAX_LEN
    }
}

impl FromStr for Address {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Address`")
    }
}

/// Mean radius of the Earth in meters.
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Geographic coordinates in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinates {
    /// Latitude in `-90..=90` degrees.
    latitude: f64,

    /// Longitude in `-180..=180` degrees.
    longitude: f64,
}

impl Coordinates {
    /// Creates new [`Coordinates`] if both `latitude` and `longitude` are in
    /// their ranges.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        ((-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude))
        .then_some(Self {
            latitude,
            longitude,
        })
    }

    /// Returns the latitude of these [`Coordinates`].
    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Returns the longitude of these [`Coordinates`].
    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Calculates the great-circle distance in meters to the `other`
    /// [`Coordinates`] using the haversine formula.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        let (lat1, lat2) =
            (self.latitude.to_radians(), other.latitude.to_radians());
        let d_lat = lat2 - lat1;
        let d_lng = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METERS * a.sqrt().atan2((1.0 - a).sqrt())
    }

    /// Returns the [`Area`] covering every point within the provided
    /// [`Radius`] from these [`Coordinates`].
    ///
    /// The [`Area`] is wider than the circle, so it's only suitable for
    /// pre-filtering.
    #[must_use]
    pub fn area_within(&self, radius: Radius) -> Area {
        let d_lat = (radius.meters() / EARTH_RADIUS_METERS).to_degrees();
        let min_latitude = (self.latitude - d_lat).max(-90.0);
        let max_latitude = (self.latitude + d_lat).min(90.0);

        let widest = self.latitude.abs().max(max_latitude.abs()).max(
            min_latitude.abs(),
        );
        let (min_longitude, max_longitude) = if widest >= 90.0 {
            (-180.0, 180.0)
        } else {
            let d_lng = d_lat / widest.to_radians().cos();
            if d_lng >= 180.0 {
                (-180.0, 180.0)
            } else {
                (self.longitude - d_lng, self.longitude + d_lng)
            }
        };

        Area {
            min_latitude,
            max_latitude,
            min_longitude,
            max_longitude,
        }
    }
}

/// Rectangular geographic area in degrees.
///
/// Longitudes may go beyond `-180..=180` range when the area crosses the
/// antimeridian.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Area {
    /// Southern border.
    pub min_latitude: f64,

    /// Northern border.
    pub max_latitude: f64,

    /// Western border.
    pub min_longitude: f64,

    /// Eastern border.
    pub max_longitude: f64,
}

impl Area {
    /// Indicates whether the provided [`Coordinates`] lie within this
    /// [`Area`].
    #[must_use]
    pub fn contains(&self, point: &Coordinates) -> bool {
        let lng = point.longitude;
        (self.min_latitude..=self.max_latitude).contains(&point.latitude)
            && [lng - 360.0, lng, lng + 360.0].iter().any(|lng| {
                (self.min_longitude..=self.max_longitude).contains(lng)
            })
    }
}

/// Search radius in meters.
#[derive(Clone, Copy, Debug, Display, PartialEq, PartialOrd)]
pub struct Radius(f64);

impl Radius {
    /// Default [`Radius`] of a nearby search.
    pub const DEFAULT: Self = Self(5_000.0);

    /// Maximum allowed [`Radius`].
    pub const MAX: Self = Self(50_000.0);

    /// Creates a new [`Radius`] if the provided `meters` are positive and
    /// don't exceed the [`Radius::MAX`].
    #[must_use]
    pub fn new(meters: f64) -> Option<Self> {
        (meters > 0.0 && meters <= Self::MAX.0).then_some(Self(meters))
    }

    /// Returns this [`Radius`] in meters.
    #[must_use]
    pub fn meters(&self) -> f64 {
        self.0
    }
}

/// Total number of slots in a [`Lot`].
#[derive(
    Clone, Copy, Debug, Display, Eq, Hash, Into, Ord, PartialEq, PartialOrd,
)]
pub struct Capacity(u16);

impl Capacity {
    /// Maximum number of slots in a single [`Lot`].
    pub const MAX: u16 = 1000;

    /// Creates a new [`Capacity`] if the provided number of `slots` is in
    /// `1..=1000` range.
    #[must_use]
    pub fn new(slots: u16) -> Option<Self> {
        (1..=Self::MAX).contains(&slots).then_some(Self(slots))
    }

    /// Returns the number of slots.
    #[must_use]
    pub fn get(&self) -> u16 {
        self.0
    }
}

/// Strictly positive price of a [`Lot`] slot per hour.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub struct Price(Money);

impl Price {
    /// Creates a new [`Price`] if the provided [`Money`] amount is positive.
    #[must_use]
    pub fn new(money: Money) -> Option<Self> {
        money.is_positive().then_some(Self(money))
    }

    /// Returns the [`Money`] amount of this [`Price`].
    #[must_use]
    pub fn get(&self) -> Money {
        self.0
    }

    /// Returns the currency of this [`Price`].
    #[must_use]
    pub fn currency(&self) -> common::money::Currency {
        self.0.currency
    }
}

/// Aggregated statistics of a [`Lot`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Stats {
    /// Number of bookings ever made in a [`Lot`].
    pub total_bookings: u64,

    /// Revenue ever earned by a [`Lot`].
    pub total_revenue: Money,
}

impl Stats {
    /// Creates empty [`Stats`] accounting revenue in the provided currency.
    #[must_use]
    pub fn zero(currency: common::money::Currency) -> Self {
        Self {
            total_bookings: 0,
            total_revenue: Money::zero(currency),
        }
    }

    /// Adds the provided `amount` to the total revenue.
    ///
    /// Amounts in a foreign currency are ignored, as a [`Lot`] never changes
    /// its currency.
    pub fn add_revenue(&mut self, amount: Money) {
        if let Some(total) = self.total_revenue.checked_add(amount) {
            self.total_revenue = total;
        }
    }
}

/// Aggregated rating of a [`Lot`] collected from completed bookings.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Rating {
    /// Sum of all the scores.
    pub total_score: u64,

    /// Number of the scores.
    pub count: u64,
}

impl Rating {
    /// Accounts a new `score`.
    pub fn add(&mut self, score: u8) {
        self.total_score += u64::from(score);
        self.count += 1;
    }

    /// Returns the average score rounded to one decimal place, if any scores
    /// were collected.
    #[must_use]
    pub fn average(&self) -> Option<Decimal> {
        (self.count > 0).then(|| {
            (Decimal::from(self.total_score) / Decimal::from(self.count))
                .round_dp_with_strategy(
                    1,
                    RoundingStrategy::MidpointAwayFromZero,
                )
        })
    }
}

define_kind! {
    #[doc = "Availability of a [`Lot`] derived from its occupancy."]
    enum Availability {
        #[doc = "Less than 80% of slots are occupied."]
        Available = 1,

        #[doc = "At least 80% of slots are occupied."]
        Limited = 2,

        #[doc = "All slots are occupied."]
        Full = 3,
    }
}

impl From<Percent> for Availability {
    fn from(occupancy: Percent) -> Self {
        if occupancy >= Percent::HUNDRED {
            Self::Full
        } else if occupancy.value() >= Decimal::from(80) {
            Self::Limited
        } else {
            Self::Available
        }
    }
}

/// [`DateTime`] when a [`Lot`] was created.
pub type CreationDateTime = DateTimeOf<(Lot, unit::Creation)>;

/// [`DateTime`] when a [`Lot`] was deactivated.
pub type DeactivationDateTime = DateTimeOf<(Lot, unit::Deactivation)>;

#[cfg(test)]
mod spec {
    use common::{money::Currency, Money};
    use rust_decimal::Decimal;

    use crate::domain::user;

    use super::{
        Address, Availability, Capacity, Coordinates, Lot, Name, Price,
        Radius,
    };

    fn lot(total: u16, price: &str) -> Lot {
        Lot::new(
            user::Id::new(),
            Name::new("Central Parking").unwrap(),
            Address::new("1 Main St").unwrap(),
            Coordinates::new(12.9716, 77.5946).unwrap(),
            Capacity::new(total).unwrap(),
            Price::new(price.parse().unwrap()).unwrap(),
        )
    }

    #[test]
    fn validates_fields() {
        assert!(Name::new("").is_none());
        assert!(Name::new(" padded ").is_none());
        assert!(Name::new("x".repeat(101)).is_none());
        assert!(Name::new("x".repeat(100)).is_some());
        assert!(Address::new("a".repeat(201)).is_none());

        assert!(Capacity::new(0).is_none());
        assert!(Capacity::new(1001).is_none());
        assert!(Capacity::new(1000).is_some());

        assert!(Coordinates::new(90.1, 0.0).is_none());
        assert!(Coordinates::new(0.0, -180.5).is_none());
        assert!(Coordinates::new(-90.0, 180.0).is_some());

        assert!(Price::new(Money::zero(Currency::Inr)).is_none());
        assert!(Radius::new(0.0).is_none());
        assert!(Radius::new(50_001.0).is_none());
    }

    #[test]
    fn acquires_until_full() {
        let mut lot = lot(2, "100INR");

        assert!(lot.acquire_slot(2));
        assert!(lot.acquire_slot(3));
        assert!(!lot.acquire_slot(1));

        assert_eq!(lot.available_slots(), 0);
        assert_eq!(lot.stats.total_bookings, 2);
        assert_eq!(lot.stats.total_revenue, "500INR".parse().unwrap());
        assert_eq!(lot.availability(), Availability::Full);
    }

    #[test]
    fn inactive_lot_cannot_be_acquired() {
        let mut lot = lot(2, "100INR");
        lot.deactivated_at = Some(super::DeactivationDateTime::now());

        assert!(!lot.acquire_slot(1));
        assert_eq!(lot.available_slots(), 2);
        assert_eq!(lot.stats.total_bookings, 0);
    }

    #[test]
    fn release_never_exceeds_total() {
        let mut lot = lot(3, "10USD");
        assert!(lot.acquire_slot(1));

        lot.release_slot();
        lot.release_slot();
        lot.release_slot();

        assert_eq!(lot.available_slots(), 3);
    }

    #[test]
    fn resize_preserves_occupied_slots() {
        let mut lot = lot(10, "10USD");
        for _ in 0..4 {
            assert!(lot.acquire_slot(1));
        }

        lot.resize(Capacity::new(12).unwrap());
        assert_eq!(lot.available_slots(), 8);

        lot.resize(Capacity::new(5).unwrap());
        assert_eq!(lot.available_slots(), 1);

        lot.resize(Capacity::new(2).unwrap());
        assert_eq!(lot.available_slots(), 0);
        assert_eq!(lot.total_slots.get(), 2);
    }

    #[test]
    fn availability_thresholds() {
        let mut lot = lot(10, "10USD");
        assert_eq!(lot.availability(), Availability::Available);

        for _ in 0..8 {
            assert!(lot.acquire_slot(1));
        }
        assert_eq!(lot.occupancy().value(), Decimal::from(80));
        assert_eq!(lot.availability(), Availability::Limited);
    }

    #[test]
    fn haversine_distance() {
        let bangalore = Coordinates::new(12.9716, 77.5946).unwrap();
        let mysore = Coordinates::new(12.2958, 76.6394).unwrap();

        let distance = bangalore.distance_to(&mysore);
        assert!((distance - 127_000.0).abs() < 2_000.0, "{distance}");
        assert!(bangalore.distance_to(&bangalore).abs() < f64::EPSILON);
    }

    #[test]
    fn area_covers_radius() {
        let center = Coordinates::new(12.9716, 77.5946).unwrap();
        let radius = Radius::new(5_000.0).unwrap();
        let area = center.area_within(radius);

        let near = Coordinates::new(13.0100, 77.5946).unwrap();
        let far = Coordinates::new(13.1000, 77.5946).unwrap();
        assert!(center.distance_to(&near) < radius.meters());
        assert!(area.contains(&near));
        assert!(!area.contains(&far));

        let east = Coordinates::new(0.0, 179.99).unwrap();
        let west = Coordinates::new(0.0, -179.99).unwrap();
        assert!(east.area_within(radius).contains(&west));
    }

    #[test]
    fn rating_average() {
        let mut lot = lot(1, "10USD");
        assert_eq!(lot.rating.average(), None);

        lot.rating.add(5);
        lot.rating.add(4);
        lot.rating.add(4);
        assert_eq!(lot.rating.average(), Some("4.3".parse().unwrap()));
    }
}
