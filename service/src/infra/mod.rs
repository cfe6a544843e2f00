//! Infrastructure layer.

pub mod advisor;
pub mod database;
pub mod relay;

#[cfg(any(test, feature = "memory"))]
pub use self::database::{memory, Memory};
pub use self::{advisor::Advisor, database::Database, relay::Relay};
#[cfg(feature = "postgres")]
pub use self::database::{postgres, Postgres};
