//! Clients running [`Postgres`] queries either on a pooled connection per
//! query ([`NonTx`]) or within a single transaction ([`Tx`]).
//!
//! [`Postgres`]: super::Postgres

pub mod non_tx;
pub mod tx;

pub use self::{non_tx::NonTx, tx::Tx};
