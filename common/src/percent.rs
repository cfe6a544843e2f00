//! [`Percent`]-related definitions.

use std::str::FromStr;

use derive_more::Display;
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::{Decimal, RoundingStrategy};

/// Percentage in `0..=100` range.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Percent(Decimal);

impl Percent {
    /// Zero percents.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Hundred percents.
    pub const HUNDRED: Self = Self(Decimal::ONE_HUNDRED);

    /// Creates a new [`Percent`] if the provided value lies in `0..=100`
    /// range.
    #[must_use]
    pub fn new(val: Decimal) -> Option<Self> {
        (Decimal::ZERO..=Decimal::ONE_HUNDRED)
            .contains(&val)
            .then_some(Self(val))
    }

    /// Calculates which whole [`Percent`] the `part` is of the `whole`,
    /// rounding half away from zero.
    ///
    /// [`None`] is returned if `whole` is zero or `part` exceeds it.
    #[must_use]
    pub fn of(part: u32, whole: u32) -> Option<Self> {
        if whole == 0 || part > whole {
            return None;
        }
        let val = Decimal::from(part) * Decimal::ONE_HUNDRED
            / Decimal::from(whole);
        Some(Self(val.round_dp_with_strategy(
            0,
            RoundingStrategy::MidpointAwayFromZero,
        )))
    }

    /// Converts the provided `0..=1` fraction into a [`Percent`].
    #[must_use]
    pub fn from_fraction(fraction: Decimal) -> Option<Self> {
        Self::new(fraction * Decimal::ONE_HUNDRED)
    }

    /// Returns the underlying [`Decimal`] value of this [`Percent`].
    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.0
    }
}

impl FromStr for Percent {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s)
            .ok()
            .and_then(Self::new)
            .ok_or("invalid percent value")
    }
}

#[cfg(feature = "juniper")]
mod juniper {
    //! Module providing integration with [`juniper`] crate.

    use std::str::FromStr as _;

    use juniper::{graphql_scalar, InputValue, ScalarValue, Value};

    /// Percentage in `0..=100` range, represented as a decimal string.
    #[graphql_scalar(with = Self, parse_token(String))]
    type Percent = super::Percent;

    impl Percent {
        fn to_output<S: ScalarValue>(p: &Percent) -> Value<S> {
            Value::scalar(p.to_string())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            input
                .as_string_value()
                .ok_or_else(|| {
                    format!(
                        "Cannot parse `Percent` input scalar from \
                         non-string value: {input}",
                    )
                })
                .and_then(|s| {
                    Self::from_str(s).map_err(|e| {
                        format!("Cannot parse `Percent` input scalar: {e}")
                    })
                })
        }
    }
}

#[cfg(test)]
mod spec {
    use rust_decimal::Decimal;

    use super::Percent;

    #[test]
    fn rounds_ratio() {
        assert_eq!(Percent::of(0, 10), Some(Percent::ZERO));
        assert_eq!(Percent::of(10, 10), Some(Percent::HUNDRED));
        assert_eq!(Percent::of(1, 3).unwrap().value(), Decimal::from(33));
        assert_eq!(Percent::of(2, 3).unwrap().value(), Decimal::from(67));
        assert_eq!(Percent::of(1, 0), None);
        assert_eq!(Percent::of(11, 10), None);
    }

    #[test]
    fn bounds() {
        assert!(Percent::new(Decimal::from(101)).is_none());
        assert!(Percent::new(Decimal::NEGATIVE_ONE).is_none());
        assert!("42.5".parse::<Percent>().is_ok());
        assert_eq!(
            Percent::from_fraction(Decimal::new(6, 1)).unwrap().value(),
            Decimal::from(60),
        );
    }
}
