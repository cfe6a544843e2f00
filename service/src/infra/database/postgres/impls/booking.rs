//! [`Booking`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::{
    operations::{By, Insert, Select, Update},
    Money,
};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{booking, Booking},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Columns of the `bookings` table in the order [`from_row()`] expects them.
macro_rules! columns {
    () => {
        "id, qr_token, user_id, lot_id, \
         vehicle_name, vehicle_plate, vehicle_kind, \
         duration, starts_at, hourly_rate, hourly_rate_currency, \
         status, payment_status, entered_at, exited_at, \
         cancellation_reason, cancelled_at, \
         rating_score, rating_comment, rated_at, \
         created_at, version"
    };
}

/// Converts the provided `bookings` table [`Row`] into a [`Booking`] without
/// its [`booking::Extension`]s.
fn from_row(row: &Row) -> Booking {
    let hours = |column| {
        u8::try_from(row.get::<_, i16>(column))
            .ok()
            .and_then(booking::Hours::new)
            .expect("`Hours` out of range")
    };

    Booking {
        id: row.get("id"),
        qr_token: row.get("qr_token"),
        user_id: row.get("user_id"),
        lot_id: row.get("lot_id"),
        vehicle: booking::Vehicle {
            name: row.get("vehicle_name"),
            plate: row.get("vehicle_plate"),
            kind: row.get("vehicle_kind"),
        },
        duration: hours("duration"),
        starts_at: row.get("starts_at"),
        hourly_rate: Money {
            amount: row.get("hourly_rate"),
            currency: row.get("hourly_rate_currency"),
        },
        extensions: vec![],
        status: row.get("status"),
        payment_status: row.get("payment_status"),
        entered_at: row.get("entered_at"),
        exited_at: row.get("exited_at"),
        cancellation: row.get::<_, Option<_>>("cancelled_at").map(
            |cancelled_at| booking::Cancellation {
                reason: row.get("cancellation_reason"),
                cancelled_at,
            },
        ),
        rating: row.get::<_, Option<_>>("rated_at").map(|rated_at| {
            booking::Rating {
                score: u8::try_from(row.get::<_, i16>("rating_score"))
                    .ok()
                    .and_then(booking::Score::new)
                    .expect("`rating_score` out of range"),
                comment: row.get("rating_comment"),
                rated_at,
            }
        }),
        created_at: row.get("created_at"),
        version: row.get("version"),
    }
}

impl<C> Postgres<C>
where
    C: Connection,
{
    /// Converts the provided `bookings` table [`Row`]s into [`Booking`]s,
    /// loading their [`booking::Extension`]s.
    async fn bookings_from_rows(
        &self,
        rows: &[Row],
    ) -> Result<Vec<Booking>, Traced<database::Error>> {
        let mut bookings = rows.iter().map(from_row).collect::<Vec<_>>();
        if bookings.is_empty() {
            return Ok(bookings);
        }
        let ids = bookings.iter().map(|b| b.id).collect::<Vec<_>>();

        const SQL: &str = "\
            SELECT booking_id, hours, amount, amount_currency, created_at \
            FROM booking_extensions \
            WHERE booking_id = ANY($1::UUID[]) \
            ORDER BY booking_id, num";
        let mut extensions = self
            .query(SQL, &[&ids])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| {
                let ext = booking::Extension {
                    hours: u8::try_from(row.get::<_, i16>("hours"))
                        .ok()
                        .and_then(booking::Hours::new)
                        .expect("`hours` out of range"),
                    amount: Money {
                        amount: row.get("amount"),
                        currency: row.get("amount_currency"),
                    },
                    created_at: row.get("created_at"),
                };
                (row.get::<_, booking::Id>("booking_id"), ext)
            })
            .into_group_map();

        for booking in &mut bookings {
            booking.extensions =
                extensions.remove(&booking.id).unwrap_or_default();
        }
        Ok(bookings)
    }

    /// Stores the [`booking::Extension`]s of the provided [`Booking`] which
    /// are not stored yet.
    async fn store_extensions(
        &self,
        booking: &Booking,
    ) -> Result<(), Traced<database::Error>> {
        if booking.extensions.is_empty() {
            return Ok(());
        }

        let (nums, hours, amounts, currencies, created_at): (
            Vec<i16>,
            Vec<i16>,
            Vec<_>,
            Vec<i16>,
            Vec<_>,
        ) = booking
            .extensions
            .iter()
            .enumerate()
            .map(|(num, ext)| {
                (
                    i16::try_from(num).expect("`num` overflow"),
                    i16::from(ext.hours.get()),
                    ext.amount.amount,
                    i16::from(ext.amount.currency.u8()),
                    ext.created_at,
                )
            })
            .multiunzip();

        // Extensions are append-only, so already stored ones stay untouched.
        const SQL: &str = "\
            INSERT INTO booking_extensions (\
                booking_id, num, hours, amount, amount_currency, created_at \
            ) \
            SELECT $1::UUID, * \
            FROM UNNEST(\
                $2::INT2[], $3::INT2[], $4::NUMERIC[], $5::INT2[], \
                $6::TIMESTAMPTZ[]\
            ) \
            ON CONFLICT (booking_id, num) DO NOTHING";
        self.exec(
            SQL,
            &[&booking.id, &nums, &hours, &amounts, &currencies, &created_at],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C, IDs> Database<Select<By<HashMap<booking::Id, Booking>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[booking::Id]>,
{
    type Ok = HashMap<booking::Id, Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<booking::Id, Booking>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[booking::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        const SQL: &str = concat!(
            "SELECT ",
            columns!(),
            " FROM bookings \
              WHERE id = ANY($1::UUID[])",
        );
        let rows = self
            .query(SQL, &[&ids])
            .await
            .map_err(tracerr::wrap!())?;
        Ok(self
            .bookings_from_rows(&rows)
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|b| (b.id, b))
            .collect())
    }
}

impl<C> Database<Select<By<Option<Booking>, booking::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<booking::Id, Booking>, [booking::Id; 1]>>,
        Ok = HashMap<booking::Id, Booking>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Booking>, booking::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<C> Database<Select<By<Option<Booking>, booking::QrToken>>>
    for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<Option<Booking>, booking::Id>>,
        Ok = Option<Booking>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Booking>, booking::QrToken>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let token: booking::QrToken = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM bookings \
            WHERE qr_token = $1::VARCHAR \
            LIMIT 1";
        let Some(row) = self
            .query_opt(SQL, &[&token])
            .await
            .map_err(tracerr::wrap!())?
        else {
            return Ok(None);
        };

        self.execute(Select(By::new(row.get::<_, booking::Id>("id"))))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Insert<Booking>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(booking): Insert<Booking>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            INSERT INTO bookings (\
                id, qr_token, user_id, lot_id, \
                vehicle_name, vehicle_plate, vehicle_kind, \
                duration, starts_at, ends_at, \
                hourly_rate, hourly_rate_currency, \
                status, payment_status, entered_at, exited_at, \
                cancellation_reason, cancelled_at, \
                rating_score, rating_comment, rated_at, \
                created_at, version \
            ) VALUES (\
                $1::UUID, $2::VARCHAR, $3::UUID, $4::UUID, \
                $5::VARCHAR, $6::VARCHAR, $7::INT2, \
                $8::INT2, $9::TIMESTAMPTZ, $10::TIMESTAMPTZ, \
                $11::NUMERIC, $12::INT2, \
                $13::INT2, $14::INT2, $15::TIMESTAMPTZ, $16::TIMESTAMPTZ, \
                $17::VARCHAR, $18::TIMESTAMPTZ, \
                $19::INT2, $20::VARCHAR, $21::TIMESTAMPTZ, \
                $22::TIMESTAMPTZ, $23::INT4 \
            )";
        let cols = Columns::of(&booking);
        self.exec(
            SQL,
            &[
                &booking.id,
                &booking.qr_token,
                &booking.user_id,
                &booking.lot_id,
                &booking.vehicle.name,
                &booking.vehicle.plate,
                &booking.vehicle.kind,
                &cols.duration,
                &booking.starts_at,
                &cols.ends_at,
                &booking.hourly_rate.amount,
                &booking.hourly_rate.currency,
                &booking.status,
                &booking.payment_status,
                &booking.entered_at,
                &booking.exited_at,
                &cols.cancellation_reason,
                &cols.cancelled_at,
                &cols.rating_score,
                &cols.rating_comment,
                &cols.rated_at,
                &booking.created_at,
                &booking.version,
            ],
        )
        .await
        .map_err(tracerr::wrap!())?;

        self.store_extensions(&booking)
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Booking>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(mut booking): Update<Booking>,
    ) -> Result<Self::Ok, Self::Err> {
        let expected = booking.version;
        booking.version = expected.next();

        // Only mutable columns are updated, and only if nobody has updated
        // the row since it was read.
        const SQL: &str = "\
            UPDATE bookings \
            SET ends_at = $3::TIMESTAMPTZ, \
                status = $4::INT2, \
                payment_status = $5::INT2, \
                entered_at = $6::TIMESTAMPTZ, \
                exited_at = $7::TIMESTAMPTZ, \
                cancellation_reason = $8::VARCHAR, \
                cancelled_at = $9::TIMESTAMPTZ, \
                rating_score = $10::INT2, \
                rating_comment = $11::VARCHAR, \
                rated_at = $12::TIMESTAMPTZ, \
                version = $13::INT4 \
            WHERE id = $1::UUID \
              AND version = $2::INT4";
        let cols = Columns::of(&booking);
        let updated = self
            .exec(
                SQL,
                &[
                    &booking.id,
                    &expected,
                    &cols.ends_at,
                    &booking.status,
                    &booking.payment_status,
                    &booking.entered_at,
                    &booking.exited_at,
                    &cols.cancellation_reason,
                    &cols.cancelled_at,
                    &cols.rating_score,
                    &cols.rating_comment,
                    &cols.rated_at,
                    &booking.version,
                ],
            )
            .await
            .map_err(tracerr::wrap!())?;
        if updated == 0 {
            return Ok(None);
        }

        self.store_extensions(&booking)
            .await
            .map_err(tracerr::wrap!())?;
        Ok(Some(booking))
    }
}

/// Derived and flattened [`Booking`] columns.
struct Columns<'b> {
    /// `duration` column.
    duration: i16,

    /// `ends_at` column.
    ends_at: booking::EndDateTime,

    /// `cancellation_reason` column.
    cancellation_reason: Option<&'b booking::Note>,

    /// `cancelled_at` column.
    cancelled_at: Option<booking::CancellationDateTime>,

    /// `rating_score` column.
    rating_score: Option<i16>,

    /// `rating_comment` column.
    rating_comment: Option<&'b booking::Note>,

    /// `rated_at` column.
    rated_at: Option<booking::RatingDateTime>,
}

impl<'b> Columns<'b> {
    /// Flattens the provided [`Booking`] into [`Columns`].
    fn of(booking: &'b Booking) -> Self {
        Self {
            duration: i16::from(booking.duration.get()),
            ends_at: booking.ends_at(),
            cancellation_reason: booking
                .cancellation
                .as_ref()
                .and_then(|c| c.reason.as_ref()),
            cancelled_at: booking.cancellation.as_ref().map(|c| c.cancelled_at),
            rating_score: booking
                .rating
                .as_ref()
                .map(|r| i16::from(r.score.get())),
            rating_comment: booking
                .rating
                .as_ref()
                .and_then(|r| r.comment.as_ref()),
            rated_at: booking.rating.as_ref().map(|r| r.rated_at),
        }
    }
}

impl<C> Database<Select<By<Vec<Booking>, read::booking::Overdue>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Booking>, read::booking::Overdue>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::booking::Overdue { at, limit } = by.into_inner();
        let limit = i32::from(limit);

        const SQL: &str = concat!(
            "SELECT ",
            columns!(),
            " FROM bookings \
              WHERE status = $1::INT2 \
                AND entered_at IS NULL \
                AND ends_at < $2::TIMESTAMPTZ \
              ORDER BY ends_at ASC \
              LIMIT $3::INT4",
        );
        let rows = self
            .query(SQL, &[&booking::Status::Confirmed, &at, &limit])
            .await
            .map_err(tracerr::wrap!())?;
        self.bookings_from_rows(&rows)
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Select<By<Vec<Booking>, read::booking::History>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Booking>, read::booking::History>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::booking::History { lot_id, limit } = by.into_inner();
        let limit = i32::from(limit);
        let statuses = read::booking::History::STATUSES
            .map(|s| i16::from(s.u8()))
            .to_vec();

        const SQL: &str = concat!(
            "SELECT ",
            columns!(),
            " FROM bookings \
              WHERE lot_id = $1::UUID \
                AND status = ANY($2::INT2[]) \
              ORDER BY created_at DESC \
              LIMIT $3::INT4",
        );
        let rows = self
            .query(SQL, &[&lot_id, &statuses, &limit])
            .await
            .map_err(tracerr::wrap!())?;
        self.bookings_from_rows(&rows)
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C>
    Database<
        Select<By<read::booking::list::Page, read::booking::list::Selector>>,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = read::booking::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::booking::list::Page, read::booking::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        use read::booking::list::{Filter, Scope};

        let read::booking::list::Selector {
            arguments,
            filter:
                Filter {
                    scope,
                    status,
                    plate,
                },
        } = by.into_inner();

        let limit =
            i32::try_from(arguments.fetch_limit()).expect("`limit` overflow");

        let (scope_column, scope_id): (_, &(dyn ToSql + Sync)) = match &scope {
            Scope::User(id) => ("user_id", id),
            Scope::Lot(id) => ("lot_id", id),
        };
        let plate = plate.as_ref().map(|p| AsRef::<str>::as_ref(p));

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&limit, scope_id];

        let status_idx = status.as_ref().map(|s| {
            ps.push(s);
            ps.len()
        });
        let plate_idx = plate.as_ref().map(|p| {
            ps.push(p);
            ps.len()
        });
        let cursor_idx = arguments.after().map(|c| {
            ps.push(&c.created_at);
            ps.push(&c.id);
            ps.len() - 1
        });

        let sql = format!(
            "SELECT {columns} \
             FROM bookings \
             WHERE {scope_column} = $2::UUID \
                   {status} \
                   {plate} \
                   {cursor} \
             ORDER BY created_at DESC, id DESC \
             LIMIT $1::INT4",
            columns = columns!(),
            status = status_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!("AND status = ${idx}::INT2"))
            }),
            plate = plate_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!(
                    "AND STRPOS(vehicle_plate, ${idx}::VARCHAR) > 0",
                ))
            }),
            cursor = cursor_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!(
                    "AND (created_at, id) < \
                         (${idx}::TIMESTAMPTZ, ${}::UUID)",
                    idx + 1,
                ))
            }),
        );
        let rows = self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?;
        let bookings = self
            .bookings_from_rows(&rows)
            .await
            .map_err(tracerr::wrap!())?;

        Ok(read::booking::list::Page::new(
            &arguments,
            bookings
                .into_iter()
                .map(|b| (read::booking::list::Cursor::from(&b), b)),
        ))
    }
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Insert, Select};

    use crate::{
        domain::{
            booking::{self, Hours, QrToken},
            lot::{Address, Capacity, Coordinates, Name, Price},
            user, Booking, Lot,
        },
        infra::Database as _,
        read::booking::list::{
            Arguments, Filter, Page, PlateSearch, Scope, Selector,
        },
        spec::vehicle,
    };

    use super::super::spec::postgres;

    #[tokio::test]
    #[ignore = "requires running Postgres"]
    async fn lists_lot_bookings_by_status_and_plate() {
        let db = postgres().await;
        let lot = Lot::new(
            user::Id::new(),
            Name::new("Central Mall").unwrap(),
            Address::new("1 Main St").unwrap(),
            Coordinates::new(12.97, 77.59).unwrap(),
            Capacity::new(5).unwrap(),
            Price::new("50INR".parse().unwrap()).unwrap(),
        );
        db.execute(Insert(lot.clone())).await.unwrap();

        let mut ids = vec![];
        for (plate, status) in [
            ("KA01AB1234", booking::Status::Confirmed),
            ("MH12XY9876", booking::Status::Cancelled),
            ("KA05AB7777", booking::Status::Confirmed),
        ] {
            let mut b = Booking::new(
                user::Id::new(),
                &lot,
                vehicle(),
                Hours::new(1).unwrap(),
                None,
                QrToken::generate(),
            );
            b.vehicle.plate = plate.parse().unwrap();
            b.status = status;
            ids.push(b.id);
            db.execute(Insert(b)).await.unwrap();
        }

        let list = |status, plate| {
            db.execute(Select(By::<Page, _>::new(Selector {
                arguments: Arguments::new(Some(10), None, 10).unwrap(),
                filter: Filter {
                    scope: Scope::Lot(lot.id),
                    status,
                    plate,
                },
            })))
        };
        let sorted = |page: Page| {
            let mut ids =
                page.edges.into_iter().map(|e| e.node.id).collect::<Vec<_>>();
            ids.sort();
            ids
        };
        let expected = |mut picked: Vec<booking::Id>| {
            picked.sort();
            picked
        };

        let all = list(None, None).await.unwrap();
        assert_eq!(sorted(all), expected(ids.clone()));

        let confirmed =
            list(Some(booking::Status::Confirmed), None).await.unwrap();
        assert_eq!(sorted(confirmed), expected(vec![ids[0], ids[2]]));

        let by_plate = list(None, PlateSearch::new("xy98")).await.unwrap();
        assert_eq!(sorted(by_plate), [ids[1]]);

        let nothing =
            list(Some(booking::Status::Cancelled), PlateSearch::new("KA"))
                .await
                .unwrap();
        assert!(nothing.edges.is_empty());
    }
}
