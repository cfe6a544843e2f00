//! [`User`]-related definitions.
//!
//! Users themselves are managed by an external identity provider, so only
//! their identity and [`Role`] are known here.

pub mod session;

use common::define_kind;
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use self::session::Session;

/// ID of a platform user.
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

define_kind! {
    #[doc = "Role of a platform user."]
    enum Role {
        #[doc = "Driver reserving parking slots."]
        Driver = 1,

        #[doc = "Operator owning and managing parking lots."]
        Operator = 2,

        #[doc = "Platform administrator allowed to do anything."]
        Admin = 3,
    }
}

/// Authenticated user performing an action.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Actor {
    /// ID of the user.
    pub id: Id,

    /// [`Role`] of the user.
    pub role: Role,
}

impl Actor {
    /// Indicates whether this [`Actor`] is a [`Role::Admin`].
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Indicates whether this [`Actor`] may manage parking lots.
    #[must_use]
    pub fn is_operator(&self) -> bool {
        matches!(self.role, Role::Operator | Role::Admin)
    }

    /// Indicates whether this [`Actor`] is the provided user or an
    /// [`Role::Admin`].
    #[must_use]
    pub fn is_or_admin(&self, id: Id) -> bool {
        self.id == id || self.is_admin()
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use super::{Actor, Id, Role};

    #[test]
    fn role_text_forms_agree() {
        for role in Role::ALL.iter().copied() {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{role}\""));
            assert_eq!(serde_json::from_str::<Role>(&json).unwrap(), role);
            assert_eq!(Role::from_str(&role.to_string()).unwrap(), role);
        }
        assert_eq!(
            serde_json::from_str::<Role>("\"OPERATOR\"").unwrap(),
            Role::Operator,
        );
        assert!(serde_json::from_str::<Role>("\"operator\"").is_err());
    }

    #[test]
    fn admin_acts_for_anyone() {
        let me = Id::new();
        let driver = Actor {
            id: me,
            role: Role::Driver,
        };
        let admin = Actor {
            id: Id::new(),
            role: Role::Admin,
        };

        assert!(driver.is_or_admin(me));
        assert!(!driver.is_or_admin(Id::new()));
        assert!(!driver.is_operator());
        assert!(admin.is_or_admin(me));
        assert!(admin.is_operator());
    }
}
