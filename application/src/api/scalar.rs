//! GraphQL scalar definitions.

use std::{fmt, marker::PhantomData, str::FromStr};

use juniper::{
    GraphQLType, InputValue, ParseScalarResult, ParseScalarValue, ScalarToken,
    ScalarValue, Value,
};

/// Helper type to use in `#[graphql(with = ..)]` attribute of string-like
/// domain newtypes (`Lot` names, QR tokens, plates and so on).
///
/// Output uses the [`Display`] impl of the `As` type, while input is trimmed
/// and parsed with its [`FromStr`] impl, so the domain validation applies to
/// every GraphQL argument.
///
/// [`Display`]: fmt::Display
#[derive(Debug)]
pub struct Via<As>(PhantomData<As>);

impl<As> Via<As> {
    /// Converts the target type into a scalar [`Value`].
    pub fn to_output<T, S>(value: &T) -> Value<S>
    where
        As: fmt::Display,
        T: AsRef<As>,
        S: ScalarValue,
    {
        Value::from(value.as_ref().to_string())
    }

    /// Constructs the target type from a scalar [`InputValue`].
    ///
    /// # Errors
    ///
    /// If the `input` is not a string, or it doesn't parse as `As`, or the
    /// parsed `As` is not convertible into the target type.
    pub fn from_input<T, S>(input: &InputValue<S>) -> Result<T, String>
    where
        As: FromStr,
        As::Err: fmt::Display,
        T: TryFrom<As> + GraphQLType<S, TypeInfo = ()>,
        T::Error: fmt::Display,
        S: ScalarValue,
    {
        let invalid = |reason: &dyn fmt::Display| {
            format!(
                "Cannot parse input scalar `{}`: {reason}",
                T::name(&()).unwrap_or("<unnamed>"),
            )
        };

        let s = input.as_string_value().ok_or_else(|| {
            invalid(&format_args!("expected string, found: {input}"))
        })?;
        let parsed = s
            .trim()
            .parse::<As>()
            .map_err(|e| invalid(&format_args!("\"{s}\" is invalid: {e}")))?;
        T::try_from(parsed).map_err(|e| invalid(&e))
    }

    /// Parses the provided [`ScalarToken`] as a [`String`].
    ///
    /// # Errors
    ///
    /// If the token is not a string.
    pub fn parse_token<S: ScalarValue>(
        value: ScalarToken<'_>,
    ) -> ParseScalarResult<S> {
        <String as ParseScalarValue<S>>::from_str(value)
    }
}

#[cfg(test)]
mod spec {
    use juniper::{DefaultScalarValue, InputValue, Value};
    use service::domain;

    use crate::api;

    use super::Via;

    type LotName = Via<domain::lot::Name>;

    #[test]
    fn parses_trimmed_input() {
        let name: api::lot::Name = LotName::from_input(&InputValue::<
            DefaultScalarValue,
        >::scalar("  Central Mall "))
        .unwrap();

        let out: Value<DefaultScalarValue> = LotName::to_output(&name);
        assert_eq!(out.as_string_value(), Some("Central Mall"));
    }

    #[test]
    fn rejects_invalid_input() {
        let err = LotName::from_input::<api::lot::Name, DefaultScalarValue>(
            &InputValue::scalar(42),
        )
        .unwrap_err();
        assert!(err.contains("LotName"), "{err}");
        assert!(err.contains("expected string"), "{err}");

        let err = LotName::from_input::<api::lot::Name, DefaultScalarValue>(
            &InputValue::scalar("   "),
        )
        .unwrap_err();
        assert!(err.contains("is invalid"), "{err}");
    }
}
