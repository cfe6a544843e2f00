//! [`Lot`]-related read definitions.

use common::{define_kind, DateTime, Percent};
use rust_decimal::{prelude::ToPrimitive as _, Decimal};

use crate::domain::{lot, Lot};

/// [`Lot`] found near some point.
#[derive(Clone, Debug)]
pub struct Nearby {
    /// Found [`Lot`].
    pub lot: Lot,

    /// Distance to the [`Lot`] in meters.
    pub distance: f64,
}

/// Forecast of [`Lot`] availability.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Forecast {
    /// ID of the forecasted [`Lot`].
    pub lot_id: lot::Id,

    /// Number of slots available right now.
    pub available_now: u16,

    /// Number of slots expected to be available in 1 hour.
    pub in_1_hour: u16,

    /// Number of slots expected to be available in 2 hours.
    pub in_2_hours: u16,

    /// Number of slots expected to be available in 4 hours.
    pub in_4_hours: u16,

    /// Confidence of this [`Forecast`].
    pub confidence: Percent,

    /// [`ForecastSource`] of this [`Forecast`].
    pub source: ForecastSource,
}

impl Forecast {
    /// Confidence of a [`ForecastSource::Fallback`] [`Forecast`].
    pub const FALLBACK_CONFIDENCE: u8 = 60;

    /// Makes a deterministic [`Forecast`] for the provided [`Lot`] out of
    /// typical demand at the provided moment.
    ///
    /// Every hour is expected to take 5% of the total slots, scaled by the
    /// [`demand_multiplier()`].
    #[must_use]
    pub fn fallback(lot: &Lot, now: DateTime) -> Self {
        let available = lot.available_slots();
        let hourly_demand = Decimal::from(lot.total_slots.get())
            * Decimal::new(5, 2)
            * demand_multiplier(now.hour());
        let after = |hours: u8| {
            let taken = (hourly_demand * Decimal::from(hours)).ceil();
            taken
                .to_u16()
                .map_or(0, |taken| available.saturating_sub(taken))
        };

        Self {
            lot_id: lot.id,
            available_now: available,
            in_1_hour: after(1),
            in_2_hours: after(2),
            in_4_hours: after(4),
            confidence: Percent::new(Decimal::from(Self::FALLBACK_CONFIDENCE))
                .unwrap_or(Percent::ZERO),
            source: ForecastSource::Fallback,
        }
    }
}

/// Returns the parking demand multiplier typical for the provided UTC hour of
/// a day.
#[must_use]
pub fn demand_multiplier(hour: u8) -> Decimal {
    match hour {
        8..=10 => Decimal::new(15, 1),
        17..=19 => Decimal::new(14, 1),
        12..=14 => Decimal::new(12, 1),
        0..=6 | 22..=23 => Decimal::new(5, 1),
        _ => Decimal::ONE,
    }
}

define_kind! {
    #[doc = "Source of a [`Forecast`]."]
    enum ForecastSource {
        #[doc = "External prediction advisor."]
        Advisor = 1,

        #[doc = "Built-in heuristic used when the advisor is unavailable."]
        Fallback = 2,
    }
}

pub mod list {
    //! [`Lot`] list definitions.

    use common::define_pagination;

    use crate::domain::{lot, user, Lot};

    define_pagination!(Cursor, Node, Filter);

    /// Node in a [`Page`].
    pub type Node = Lot;

    /// Cursor pointing to a specific [`Lot`] in a list.
    pub type Cursor = lot::Id;

    /// Filter for [`Selector`].
    #[derive(Clone, Debug, Default)]
    pub struct Filter {
        /// ID of the operator whose [`Lot`]s are listed.
        pub operator_id: Option<user::Id>,

        /// Text to fuzzy search for in [`Lot`] names and addresses.
        pub query: Option<String>,

        /// Indicator whether only active [`Lot`]s with free slots are listed.
        pub only_available: bool,
    }
}

#[cfg(test)]
mod spec {
    use common::{DateTime, Percent};
    use rust_decimal::Decimal;

    use crate::domain::{
        lot::{Address, Capacity, Coordinates, Name, Price},
        user, Lot,
    };

    use super::{demand_multiplier, Forecast, ForecastSource};

    /// Returns a [`DateTime`] of the provided UTC hour.
    fn at_hour(hour: i64) -> DateTime {
        DateTime::from_unix_timestamp(hour * 3600).unwrap()
    }

    #[test]
    fn multiplier_by_hour() {
        assert_eq!(demand_multiplier(9), "1.5".parse::<Decimal>().unwrap());
        assert_eq!(demand_multiplier(18), "1.4".parse::<Decimal>().unwrap());
        assert_eq!(demand_multiplier(13), "1.2".parse::<Decimal>().unwrap());
        assert_eq!(demand_multiplier(23), "0.5".parse::<Decimal>().unwrap());
        assert_eq!(demand_multiplier(3), "0.5".parse::<Decimal>().unwrap());
        assert_eq!(demand_multiplier(15), Decimal::ONE);
        assert_eq!(demand_multiplier(7), Decimal::ONE);
    }

    #[test]
    fn fallback_forecast() {
        let mut lot = Lot::new(
            user::Id::new(),
            Name::new("Mall").unwrap(),
            Address::new("2 Ring Rd").unwrap(),
            Coordinates::new(0.0, 0.0).unwrap(),
            Capacity::new(100).unwrap(),
            Price::new("50INR".parse().unwrap()).unwrap(),
        );
        for _ in 0..60 {
            assert!(lot.acquire_slot(1));
        }

        // 100 slots * 5% * 1.5 = 7.5 slots per hour.
        let forecast = Forecast::fallback(&lot, at_hour(9));
        assert_eq!(forecast.available_now, 40);
        assert_eq!(forecast.in_1_hour, 32);
        assert_eq!(forecast.in_2_hours, 25);
        assert_eq!(forecast.in_4_hours, 10);
        assert_eq!(forecast.source, ForecastSource::Fallback);
        assert_eq!(forecast.confidence, Percent::new(60.into()).unwrap());

        // 100 slots * 5% * 0.5 = 2.5 slots per hour.
        let forecast = Forecast::fallback(&lot, at_hour(2));
        assert_eq!(forecast.in_1_hour, 37);
        assert_eq!(forecast.in_4_hours, 30);
    }

    #[test]
    fn fallback_never_goes_negative() {
        let mut lot = Lot::new(
            user::Id::new(),
            Name::new("Tiny").unwrap(),
            Address::new("3 Side St").unwrap(),
            Coordinates::new(0.0, 0.0).unwrap(),
            Capacity::new(2).unwrap(),
            Price::new("50INR".parse().unwrap()).unwrap(),
        );
        assert!(lot.acquire_slot(1));

        let forecast = Forecast::fallback(&lot, at_hour(9));
        assert_eq!(forecast.available_now, 1);
        assert_eq!(forecast.in_1_hour, 0);
        assert_eq!(forecast.in_4_hours, 0);
    }
}
