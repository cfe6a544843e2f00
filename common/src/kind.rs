//! Macros for defining kind enums.

/// Macro for defining a kind enum.
///
/// Defined enum is (de)serialized and displayed in `SCREAMING_SNAKE_CASE`,
/// and is stored as `INT2` in Postgres, so the values of its variants must
/// never be reassigned once persisted.
///
/// # Example
///
/// ```rust
/// # use common::define_kind;
///
/// define_kind! {
///     #[doc = "Kind of a parked vehicle."]
///     enum Kind {
///         #[doc = "A passenger car."]
///         Car = 1,
///
///         #[doc = "A motorcycle."]
///         Bike = 2,
///     }
/// }
///
/// assert_eq!(Kind::from_u8(2), Some(Kind::Bike));
/// assert_eq!(Kind::Car.to_string(), "CAR");
/// ```
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_kind {
    (
        #[doc = $doc:literal]
        enum $name:ident {
            $(
                #[doc = $variant_doc:literal]
                $variant:ident = $value:expr
            ),* $(,)?
        }
    ) => {
        $crate::__kind_serde! {
            #[derive(
                Clone,
                Copy,
                Debug,
                $crate::private::strum::Display,
                $crate::private::strum::EnumString,
                Eq,
                Hash,
                PartialEq,
            )]
            #[doc = $doc]
            #[repr(u8)]
            #[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
            pub enum $name {
                $(
                     #[doc = $variant_doc]
                     $variant = $value,
                )*
            }
        }

        impl $name {
            #[doc = ::core::concat!(
                "All the [`", ::core::stringify!($name), "`] variants."
            )]
            pub const ALL: &'static [Self] = &[$(Self::$variant),*];

            /// Converts this into its [`u8`] representation.
            #[must_use]
            pub const fn u8(self) -> u8 {
                self as u8
            }

            #[doc = ::core::concat!(
                "Looks up the [`", ::core::stringify!($name), "`] variant ",
                "by its [`u8`] representation."
            )]
            #[must_use]
            pub fn from_u8(value: u8) -> Option<Self> {
                Self::ALL.iter().copied().find(|v| v.u8() == value)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'a> $crate::private::postgres_types::FromSql<'a> for $name {
            $crate::private::postgres_types::accepts!(INT2);

            fn from_sql(
                ty: &$crate::private::postgres_types::Type,
                raw: &[u8],
            ) -> Result<
                $name,
                Box<dyn ::std::error::Error
                    + ::core::marker::Sync
                    + ::core::marker::Send>,
            > {
                let v = u8::try_from(i16::from_sql(ty, raw)?)?;
                Self::from_u8(v).ok_or_else(|| {
                    ::std::format!(
                        "invalid `{}` value: {v}",
                        ::core::stringify!($name),
                    )
                    .into()
                })
            }
        }

        #[cfg(feature = "postgres")]
        impl $crate::private::postgres_types::ToSql for $name {
            $crate::private::postgres_types::accepts!(INT2);
            $crate::private::postgres_types::to_sql_checked!();

            fn to_sql(
                &self,
                ty: &$crate::private::postgres_types::Type,
                w: &mut $crate::private::postgres_types::private::BytesMut,
            ) -> Result<
                $crate::private::postgres_types::IsNull,
                ::std::boxed::Box<
                    dyn ::std::error::Error
                        + ::core::marker::Sync
                        + ::core::marker::Send
                >,
            > {
                i16::from(self.u8()).to_sql(ty, w)
            }
        }
    };
}

/// Adds [`serde`] derives to a kind enum whenever this crate is built with
/// the `serde` feature, regardless of the features of the calling crate.
///
/// [`serde`]: https://docs.rs/serde
#[cfg(feature = "serde")]
#[doc(hidden)]
#[macro_export]
macro_rules! __kind_serde {
    ($item:item) => {
        #[derive(
            $crate::private::serde::Deserialize,
            $crate::private::serde::Serialize,
        )]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        $item
    };
}

/// Passes a kind enum through untouched, as this crate is built without the
/// `serde` feature.
#[cfg(not(feature = "serde"))]
#[doc(hidden)]
#[macro_export]
macro_rules! __kind_serde {
    ($item:item) => {
        $item
    };
}

#[cfg(test)]
mod spec {
    define_kind! {
        #[doc = "Payment method."]
        enum Method {
            #[doc = "Card."]
            Card = 1,

            #[doc = "Cash at the gate."]
            CashAtGate = 3,
        }
    }

    #[test]
    fn looks_up_by_u8() {
        assert_eq!(Method::ALL, &[Method::Card, Method::CashAtGate]);
        assert_eq!(Method::from_u8(3), Some(Method::CashAtGate));
        assert_eq!(Method::from_u8(2), None);
        assert_eq!(Method::CashAtGate.u8(), 3);
    }

    #[test]
    fn uses_screaming_snake_case() {
        assert_eq!(Method::CashAtGate.to_string(), "CASH_AT_GATE");
        assert_eq!("CARD".parse::<Method>(), Ok(Method::Card));
        assert!("card".parse::<Method>().is_err());
    }
}
