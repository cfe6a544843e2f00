//! Business logic of the parking slot reservation system: `Lot` inventory,
//! `Booking` lifecycle and the slot accounting between them.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;
pub mod read;
pub mod task;

use common::operations::{By, Start};
use derive_more::{Debug, Error};

#[cfg(doc)]
use infra::Database;
use infra::{advisor, Advisor, Relay};

pub use self::{command::Command, query::Query, task::Task};

/// [`Service`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// [JWT] decoding key of the identity provider issuing sessions.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[debug(skip)]
    pub jwt_decoding_key: jsonwebtoken::DecodingKey,

    /// [`task::ExpireOverdueBookings`] configuration.
    pub expire_overdue_bookings: task::expire_overdue_bookings::Config,

    /// [`Advisor`] configuration.
    pub advisor: advisor::Config,

    /// Number of events buffered by the [`Relay`] for a slow subscriber.
    pub relay_capacity: usize,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,

    /// [`Relay`] publishing committed changes of this [`Service`].
    relay: Relay,

    /// [`Advisor`] forecasting availability for this [`Service`].
    advisor: Advisor,
}

impl<Db> Service<Db> {
    /// Creates a new [`Service`] with the provided parameters.
    pub fn new(config: Config, database: Db) -> (Self, task::Background)
    where
        Self: Task<
                Start<
                    By<
                        task::ExpireOverdueBookings<Self>,
                        task::expire_overdue_bookings::Config,
                    >,
                >,
                Ok = (),
                Err: Error,
            > + Clone
            + 'static,
    {
        let this = Self::without_tasks(config, database);

        let mut bg = task::Background::default();
        let svc = this.clone();
        bg.spawn("expire_overdue_bookings", async move {
            svc.execute(Start(By::new(svc.config().expire_overdue_bookings)))
                .await
        });

        (this, bg)
    }

    /// Creates a new [`Service`] with the provided parameters, without
    /// spawning any background [`Task`]s.
    pub fn without_tasks(config: Config, database: Db) -> Self {
        Self {
            relay: Relay::new(config.relay_capacity),
            advisor: Advisor::new(config.advisor.clone()),
            config,
            database,
        }
    }

    /// Returns [`Config`] of this [`Service`].
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }

    /// Returns [`Relay`] of this [`Service`].
    #[must_use]
    pub fn relay(&self) -> &Relay {
        &self.relay
    }

    /// Returns [`Advisor`] of this [`Service`].
    #[must_use]
    pub fn advisor(&self) -> &Advisor {
        &self.advisor
    }
}

#[cfg(test)]
mod spec;
