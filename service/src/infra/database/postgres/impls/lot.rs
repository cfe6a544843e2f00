//! [`Lot`]-related [`Database`] implementations.

use common::{
    operations::{Acquire, By, Insert, Lock, Release, Select},
    Money,
};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{booking, lot, Lot},
    infra::{
        database::{
            self,
            postgres::{Connection, FuzzPattern},
            Postgres,
        },
        Database,
    },
    read,
};

/// Columns of the `lots` table in the order [`from_row()`] expects them.
macro_rules! columns {
    () => {
        "id, operator_id, name, address, latitude, longitude, \
         total_slots, available_slots, price, price_currency, \
         total_bookings, total_revenue, rating_total, rating_count, \
         created_at, deactivated_at"
    };
}

/// Converts the provided `lots` table [`Row`] into a [`Lot`].
fn from_row(row: &Row) -> Lot {
    let currency = row.get("price_currency");
    Lot {
        id: row.get("id"),
        operator_id: row.get("operator_id"),
        name: row.get("name"),
        address: row.get("address"),
        location: lot::Coordinates::new(
            row.get("latitude"),
            row.get("longitude"),
        )
        .expect("`location` out of range"),
        total_slots: u16::try_from(row.get::<_, i16>("total_slots"))
            .ok()
            .and_then(lot::Capacity::new)
            .expect("`total_slots` out of range"),
        available_slots: u16::try_from(row.get::<_, i16>("available_slots"))
            .expect("`available_slots` overflow"),
        price_per_hour: lot::Price::new(Money {
            amount: row.get("price"),
            currency,
        })
        .expect("`price` is not positive"),
        stats: lot::Stats {
            total_bookings: u64::try_from(row.get::<_, i64>("total_bookings"))
                .expect("`total_bookings` overflow"),
            total_revenue: Money {
                amount: row.get("total_revenue"),
                currency,
            },
        },
        rating: lot::Rating {
            total_score: u64::try_from(row.get::<_, i64>("rating_total"))
                .expect("`rating_total` overflow"),
            count: u64::try_from(row.get::<_, i64>("rating_count"))
                .expect("`rating_count` overflow"),
        },
        created_at: row.get("created_at"),
        deactivated_at: row.get("deactivated_at"),
    }
}

impl<C> Database<Select<By<Option<Lot>, lot::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Lot>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Lot>, lot::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: lot::Id = by.into_inner();

        const SQL: &str = concat!(
            "SELECT ",
            columns!(),
            " FROM lots \
              WHERE id = $1::UUID \
              LIMIT 1",
        );
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Insert<Lot>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(lot): Insert<Lot>,
    ) -> Result<Self::Ok, Self::Err> {
        let Lot {
            id,
            operator_id,
            name,
            address,
            location,
            total_slots,
            available_slots,
            price_per_hour,
            stats,
            rating,
            created_at,
            deactivated_at,
        } = lot;

        let total_slots = i16::try_from(total_slots.get())
            .expect("`total_slots` overflow");
        let available_slots =
            i16::try_from(available_slots).expect("`available_slots` overflow");
        let total_bookings = i64::try_from(stats.total_bookings)
            .expect("`total_bookings` overflow");
        let rating_total =
            i64::try_from(rating.total_score).expect("`rating_total` overflow");
        let rating_count =
            i64::try_from(rating.count).expect("`rating_count` overflow");

        const SQL: &str = "\
            INSERT INTO lots (\
                id, operator_id, name, address, latitude, longitude, \
                total_slots, available_slots, price, price_currency, \
                total_bookings, total_revenue, rating_total, rating_count, \
                created_at, deactivated_at \
            ) VALUES (\
                $1::UUID, $2::UUID, $3::VARCHAR, $4::VARCHAR, \
                $5::FLOAT8, $6::FLOAT8, \
                $7::INT2, $8::INT2, $9::NUMERIC, $10::INT2, \
                $11::INT8, $12::NUMERIC, $13::INT8, $14::INT8, \
                $15::TIMESTAMPTZ, $16::TIMESTAMPTZ \
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET name = EXCLUDED.name, \
                address = EXCLUDED.address, \
                latitude = EXCLUDED.latitude, \
                longitude = EXCLUDED.longitude, \
                total_slots = EXCLUDED.total_slots, \
                available_slots = EXCLUDED.available_slots, \
                price = EXCLUDED.price, \
                total_bookings = EXCLUDED.total_bookings, \
                total_revenue = EXCLUDED.total_revenue, \
                rating_total = EXCLUDED.rating_total, \
                rating_count = EXCLUDED.rating_count, \
                deactivated_at = EXCLUDED.deactivated_at";
        self.exec(
            SQL,
            &[
                &id,
                &operator_id,
                &name,
                &address,
                &location.latitude(),
                &location.longitude(),
                &total_slots,
                &available_slots,
                &price_per_hour.get().amount,
                &price_per_hour.currency(),
                &total_bookings,
                &stats.total_revenue.amount,
                &rating_total,
                &rating_count,
                &created_at,
                &deactivated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Lot, lot::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Lot, lot::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: lot::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM lots \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Acquire<By<Option<Lot>, (lot::Id, booking::Hours)>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Lot>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Acquire(by): Acquire<By<Option<Lot>, (lot::Id, booking::Hours)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (id, hours) = by.into_inner();
        let hours = i32::from(hours.get());

        // Availability check and decrement must be a single statement, so
        // concurrent reservations never oversell.
        const SQL: &str = concat!(
            "UPDATE lots \
             SET available_slots = available_slots - 1, \
                 total_bookings = total_bookings + 1, \
                 total_revenue = total_revenue + price * $2::INT4 \
             WHERE id = $1::UUID \
               AND deactivated_at IS NULL \
               AND available_slots > 0 \
             RETURNING ",
            columns!(),
        );
        Ok(self
            .query_opt(SQL, &[&id, &hours])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Release<By<Option<Lot>, lot::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Lot>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Release(by): Release<By<Option<Lot>, lot::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: lot::Id = by.into_inner();

        const SQL: &str = concat!(
            "UPDATE lots \
             SET available_slots = LEAST(available_slots + 1, total_slots) \
             WHERE id = $1::UUID \
             RETURNING ",
            columns!(),
        );
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Select<By<Vec<Lot>, lot::Area>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Lot>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Lot>, lot::Area>>,
    ) -> Result<Self::Ok, Self::Err> {
        let lot::Area {
            min_latitude,
            max_latitude,
            min_longitude,
            max_longitude,
        } = by.into_inner();

        const SQL: &str = concat!(
            "SELECT ",
            columns!(),
            " FROM lots \
              WHERE deactivated_at IS NULL \
                AND latitude BETWEEN $1::FLOAT8 AND $2::FLOAT8 \
                AND (longitude BETWEEN $3::FLOAT8 AND $4::FLOAT8 \
                     OR longitude - 360 BETWEEN $3::FLOAT8 AND $4::FLOAT8 \
                     OR longitude + 360 BETWEEN $3::FLOAT8 AND $4::FLOAT8)",
        );
        Ok(self
            .query(
                SQL,
                &[&min_latitude, &max_latitude, &min_longitude, &max_longitude],
            )
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Select<By<read::lot::list::Page, read::lot::list::Selector>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::lot::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::lot::list::Page, read::lot::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::lot::list::Selector {
            arguments,
            filter:
                read::lot::list::Filter {
                    operator_id,
                    query,
                    only_available,
                },
        } = by.into_inner();

        let limit =
            i32::try_from(arguments.fetch_limit()).expect("`limit` overflow");

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&limit];

        let cursor_idx = arguments.after().map(|c| {
            ps.push(c);
            ps.len()
        });
        let operator_idx = operator_id.as_ref().map(|id| {
            ps.push(id);
            ps.len()
        });

        let pattern = query
            .as_deref()
            .filter(|q| !q.trim().is_empty())
            .map(FuzzPattern::new);
        let pattern_idx = pattern.as_ref().map(|p| {
            ps.push(p);
            ps.len()
        });

        let sql = format!(
            "SELECT {columns} \
             FROM lots \
             WHERE true \
                   {cursor} \
                   {operator} \
                   {search} \
                   {availability} \
             ORDER BY id ASC \
             LIMIT $1::INT4",
            columns = columns!(),
            cursor = cursor_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!("AND id > ${idx}::UUID"))
            }),
            operator = operator_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!("AND operator_id = ${idx}::UUID"))
            }),
            search = pattern_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!(
                    "AND LOWER(name || ' ' || address) \
                         SIMILAR TO ${idx}::VARCHAR"
                ))
            }),
            availability = if only_available {
                "AND deactivated_at IS NULL AND available_slots > 0"
            } else {
                ""
            },
        );
        let rows = self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?;

        Ok(read::lot::list::Page::new(
            &arguments,
            rows.iter().map(|row| {
                let lot = from_row(row);
                (lot.id, lot)
            }),
        ))
    }
}
