//! User-related definitions.
//!
//! Users are managed by an external identity provider, so only their IDs and
//! roles are exposed here.

use derive_more::{Display, From, Into};
use juniper::{GraphQLEnum, GraphQLScalar};
use service::domain;
use uuid::Uuid;

/// Unique identifier of a `User`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::user::Id)]
#[into(domain::user::Id)]
#[graphql(name = "UserId", transparent)]
pub struct Id(Uuid);

/// Role of a `User`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "UserRole")]
pub enum Role {
    /// Driver reserving parking slots.
    Driver,

    /// Operator owning and managing parking lots.
    Operator,

    /// Platform administrator.
    Admin,
}

impl From<domain::user::Role> for Role {
    fn from(role: domain::user::Role) -> Self {
        use domain::user::Role as R;
        match role {
            R::Driver => Self::Driver,
            R::Operator => Self::Operator,
            R::Admin => Self::Admin,
        }
    }
}
