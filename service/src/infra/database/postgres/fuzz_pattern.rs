//! [`FuzzPattern`] definition.

use derive_more::Display;
use itertools::Itertools as _;
use postgres_types::{FromSql, ToSql};

/// Characters having special meaning in `SIMILAR TO` patterns.
const SPECIAL: &[char] = &[
    '\\', '%', '_', '|', '*', '+', '?', '{', '}', '(', ')', '[', ']',
];

/// `SIMILAR TO` pattern matching a `Lot` whose name or address contains any
/// of the searched words, case-insensitively.
#[derive(Clone, Debug, Display, Eq, FromSql, PartialEq, ToSql)]
#[postgres(transparent)]
pub struct FuzzPattern(String);

impl FuzzPattern {
    /// Creates a new [`FuzzPattern`] out of the given search `input`.
    #[must_use]
    pub fn new(input: &str) -> Self {
        let words = input.split_whitespace().map(|word| {
            word.to_lowercase().chars().fold(
                String::with_capacity(word.len() + 2),
                |mut out, c| {
                    if SPECIAL.contains(&c) {
                        out.push('\\');
                    }
                    out.push(c);
                    out
                },
            )
        });
        Self(format!("%({})%", words.format("|")))
    }
}

#[cfg(test)]
mod spec {
    use super::FuzzPattern;

    #[test]
    fn matches_any_word() {
        assert_eq!(
            FuzzPattern::new("  Mall   Central ").to_string(),
            "%(mall|central)%",
        );
    }

    #[test]
    fn escapes_special_chars() {
        assert_eq!(
            FuzzPattern::new("50% [P1]").to_string(),
            r"%(50\%|\[p1\])%",
        );
        assert_eq!(FuzzPattern::new(r"a_b\c").to_string(), r"%(a\_b\\c)%");
    }
}
