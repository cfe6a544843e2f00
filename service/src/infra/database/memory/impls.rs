//! [`Database`] implementations.

use std::cmp::Reverse;

use common::operations::{Acquire, By, Insert, Lock, Release, Select, Update};
use tracerr::Traced;

use crate::{
    domain::{booking, lot, Booking, Lot},
    infra::{
        database::{self, QR_TOKEN_CONSTRAINT},
        Database,
    },
    read,
};

use super::{Error, Memory, Storage};

impl<S: Storage> Database<Select<By<Option<Lot>, lot::Id>>> for Memory<S> {
    type Ok = Option<Lot>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Lot>, lot::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.0
            .with(|s| s.lots.get(&id).cloned())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<S: Storage> Database<Insert<Lot>> for Memory<S> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(lot): Insert<Lot>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0
            .with(|s| drop(s.lots.insert(lot.id, lot)))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<S: Storage> Database<Lock<By<Lot, lot::Id>>> for Memory<S> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Lot, lot::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // A transaction holds the whole `State` already.
        Ok(())
    }
}

impl<S: Storage> Database<Acquire<By<Option<Lot>, (lot::Id, booking::Hours)>>>
    for Memory<S>
{
    type Ok = Option<Lot>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Acquire(by): Acquire<By<Option<Lot>, (lot::Id, booking::Hours)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (id, hours) = by.into_inner();
        self.0
            .with(|s| {
                let lot = s.lots.get_mut(&id)?;
                lot.acquire_slot(hours.get().into()).then(|| lot.clone())
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<S: Storage> Database<Release<By<Option<Lot>, lot::Id>>> for Memory<S> {
    type Ok = Option<Lot>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Release(by): Release<By<Option<Lot>, lot::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.0
            .with(|s| {
                let lot = s.lots.get_mut(&id)?;
                lot.release_slot();
                Some(lot.clone())
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<S: Storage> Database<Select<By<Vec<Lot>, lot::Area>>> for Memory<S> {
    type Ok = Vec<Lot>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Lot>, lot::Area>>,
    ) -> Result<Self::Ok, Self::Err> {
        let area = by.into_inner();
        self.0
            .with(|s| {
                s.lots
                    .values()
                    .filter(|l| l.is_active() && area.contains(&l.location))
                    .cloned()
                    .collect()
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<S: Storage>
    Database<Select<By<read::lot::list::Page, read::lot::list::Selector>>>
    for Memory<S>
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

        // Any of the words matches, the same way `FuzzPattern` does.
        let words = query
            .as_deref()
            .map(|q| {
                q.split_ascii_whitespace()
                    .map(str::to_lowercase)
                    .collect::<Vec<_>>()
            })
            .filter(|w| !w.is_empty());
        let matches = |lot: &Lot| {
            words.as_ref().map_or(true, |words| {
                let text =
                    format!("{} {}", lot.name, lot.address).to_lowercase();
                words.iter().any(|w| text.contains(w.as_str()))
            })
        };

        let mut lots = self
            .0
            .with(|s| {
                s.lots
                    .values()
                    .filter(|l| arguments.after().map_or(true, |c| &l.id > c))
                    .filter(|l| {
                        operator_id.map_or(true, |id| l.operator_id == id)
                    })
                    .filter(|l| {
                        !only_available
                            || (l.is_active() && l.available_slots() > 0)
                    })
                    .filter(|l| matches(l))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .await
            .map_err(tracerr::wrap!())?;
        lots.sort_unstable_by_key(|l| l.id);
        lots.truncate(arguments.fetch_limit());

        Ok(read::lot::list::Page::new(
            &arguments,
            lots.into_iter().map(|l| (l.id, l)),
        ))
    }
}

impl<S: Storage> Database<Select<By<Option<Booking>, booking::Id>>>
    for Memory<S>
{
    type Ok = Option<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Booking>, booking::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.0
            .with(|s| s.bookings.get(&id).cloned())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<S: Storage> Database<Select<By<Option<Booking>, booking::QrToken>>>
    for Memory<S>
{
    type Ok = Option<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Booking>, booking::QrToken>>,
    ) -> Result<Self::Ok, Self::Err> {
        let token = by.into_inner();
        self.0
            .with(|s| {
                s.bookings.values().find(|b| b.qr_token == token).cloned()
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<S: Storage> Database<Insert<Booking>> for Memory<S> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(booking): Insert<Booking>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0
            .with(|s| {
                if s.bookings.contains_key(&booking.id) {
                    return Err(Error::UniqueViolation("bookings_pkey"));
                }
                if s.bookings.values().any(|b| b.qr_token == booking.qr_token)
                {
                    return Err(Error::UniqueViolation(QR_TOKEN_CONSTRAINT));
                }
                _ = s.bookings.insert(booking.id, booking);
                Ok(())
            })
            .await
            .map_err(tracerr::wrap!())?
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map_err(tracerr::map_from)
    }
}

impl<S: Storage> Database<Update<Booking>> for Memory<S> {
    type Ok = Option<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(mut booking): Update<Booking>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0
            .with(|s| {
                let stored = s.bookings.get_mut(&booking.id)?;
                if stored.version != booking.version {
                    return None;
                }
                booking.version = booking.version.next();
                *stored = booking.clone();
                Some(booking)
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<S: Storage> Database<Select<By<Vec<Booking>, read::booking::Overdue>>>
    for Memory<S>
{
    type Ok = Vec<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Booking>, read::booking::Overdue>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::booking::Overdue { at, limit } = by.into_inner();
        let mut overdue = self
            .0
            .with(|s| {
                s.bookings
                    .values()
                    .filter(|b| {
                        b.status == booking::Status::Confirmed
                            && b.entered_at.is_none()
                            && b.ends_at() < at.coerce()
                    })
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .await
            .map_err(tracerr::wrap!())?;
        overdue.sort_unstable_by_key(Booking::ends_at);
        overdue.truncate(limit.into());
        Ok(overdue)
    }
}

impl<S: Storage> Database<Select<By<Vec<Booking>, read::booking::History>>>
    for Memory<S>
{
    type Ok = Vec<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Booking>, read::booking::History>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::booking::History { lot_id, limit } = by.into_inner();
        let mut history = self
            .0
            .with(|s| {
                s.bookings
                    .values()
                    .filter(|b| {
                        b.lot_id == lot_id
                            && read::booking::History::STATUSES
                                .contains(&b.status)
                    })
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .await
            .map_err(tracerr::wrap!())?;
        history.sort_unstable_by_key(|b| Reverse(b.created_at));
        history.truncate(limit.into());
        Ok(history)
    }
}

impl<S: Storage>
    Database<
        Select<By<read::booking::list::Page, read::booking::list::Selector>>,
    > for Memory<S>
{
    type Ok = read::booking::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::booking::list::Page, read::booking::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        use read::booking::list::Cursor;

        let read::booking::list::Selector { arguments, filter } =
            by.into_inner();
        let key = |c: Cursor| Reverse((c.created_at, c.id));

        let mut bookings = self
            .0
            .with(|s| {
                s.bookings
                    .values()
                    .filter(|b| filter.matches(b))
                    .filter(|b| {
                        arguments.after().map_or(true, |c| {
                            key(Cursor::from(*b)) > key(*c)
                        })
                    })
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .await
            .map_err(tracerr::wrap!())?;
        bookings.sort_unstable_by_key(|b| key(Cursor::from(b)));
        bookings.truncate(arguments.fetch_limit());

        Ok(read::booking::list::Page::new(
            &arguments,
            bookings.into_iter().map(|b| (Cursor::from(&b), b)),
        ))
    }
}

#[cfg(test)]
mod spec {
    use common::{
        operations::{Acquire, By, Insert, Release, Select, Update},
        DateTime,
    };

    use crate::{
        domain::{
            booking::{self, Hours, QrToken, Vehicle},
            lot::{Address, Capacity, Coordinates, Name, Price},
            user, Booking, Lot,
        },
        infra::{database::QR_TOKEN_CONSTRAINT, Database as _},
        read,
    };

    use super::Memory;

    fn lot(slots: u16) -> Lot {
        Lot::new(
            user::Id::new(),
            Name::new("Central Mall").unwrap(),
            Address::new("1 Main St").unwrap(),
            Coordinates::new(12.97, 77.59).unwrap(),
            Capacity::new(slots).unwrap(),
            Price::new("50INR".parse().unwrap()).unwrap(),
        )
    }

    fn booking(lot: &Lot, user_id: user::Id, token: &str) -> Booking {
        Booking::new(
            user_id,
            lot,
            Vehicle {
                name: "Swift".parse().unwrap(),
                plate: "KA01AB1234".parse().unwrap(),
                kind: booking::vehicle::Kind::Car,
            },
            Hours::new(2).unwrap(),
            None,
            QrToken::new(token).unwrap(),
        )
    }

    #[tokio::test]
    async fn acquires_until_full() {
        let db = Memory::new();
        let lot = lot(2);
        db.execute(Insert(lot.clone())).await.unwrap();

        let acquire = || {
            db.execute(Acquire(By::<Option<Lot>, _>::new((
                lot.id,
                Hours::new(1).unwrap(),
            ))))
        };
        assert_eq!(acquire().await.unwrap().unwrap().available_slots(), 1);
        assert_eq!(acquire().await.unwrap().unwrap().available_slots(), 0);
        assert!(acquire().await.unwrap().is_none());

        let released = db
            .execute(Release(By::<Option<Lot>, _>::new(lot.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(released.available_slots(), 1);
    }

    #[tokio::test]
    async fn rejects_duplicate_qr_token() {
        let db = Memory::new();
        let lot = lot(5);
        let user = user::Id::new();

        db.execute(Insert(booking(&lot, user, "ABCD2345")))
            .await
            .unwrap();
        let err = db
            .execute(Insert(booking(&lot, user, "ABCD2345")))
            .await
            .unwrap_err();

        assert!(err.as_ref().is_unique_violation(Some(QR_TOKEN_CONSTRAINT)));
    }

    #[tokio::test]
    async fn updates_only_current_version() {
        let db = Memory::new();
        let lot = lot(5);
        let booking = booking(&lot, user::Id::new(), "ABCD2345");
        db.execute(Insert(booking.clone())).await.unwrap();

        let updated = db
            .execute(Update(booking.clone()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.version, booking.version.next());

        assert!(db.execute(Update(booking)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lists_bookings_newest_first() {
        let db = Memory::new();
        let lot = lot(5);
        let user = user::Id::new();
        let mut ids = vec![];
        for (i, token) in ["AAAA2222", "BBBB3333", "CCCC4444"].iter().enumerate()
        {
            let mut b = booking(&lot, user, token);
            b.created_at = DateTime::from_unix_timestamp(1_000 + i as i64)
                .unwrap()
                .coerce();
            ids.push(b.id);
            db.execute(Insert(b)).await.unwrap();
        }
        db.execute(Insert(booking(&lot, user::Id::new(), "DDDD5555")))
            .await
            .unwrap();

        let filter = read::booking::list::Filter {
            scope: read::booking::list::Scope::User(user),
            status: None,
            plate: None,
        };
        let first = db
            .execute(Select(By::new(read::booking::list::Selector {
                arguments: read::booking::list::Arguments::new(
                    Some(2),
                    None,
                    10,
                )
                .unwrap(),
                filter: filter.clone(),
            })))
            .await
            .unwrap();
        assert!(first.has_next_page);
        assert_eq!(
            first.edges.iter().map(|e| e.node.id).collect::<Vec<_>>(),
            [ids[2], ids[1]],
        );

        let second = db
            .execute(Select(By::new(read::booking::list::Selector {
                arguments: read::booking::list::Arguments::new(
                    Some(2),
                    first.end_cursor().copied(),
                    10,
                )
                .unwrap(),
                filter,
            })))
            .await
            .unwrap();
        assert!(!second.has_next_page);
        assert_eq!(
            second.edges.iter().map(|e| e.node.id).collect::<Vec<_>>(),
            [ids[0]],
        );
    }

    #[tokio::test]
    async fn lists_lot_bookings_by_status_and_plate() {
        use read::booking::list::{Filter, PlateSearch, Scope};

        let db = Memory::new();
        let lot = self::lot(5);
        let other = self::lot(5);

        let mut expected = vec![];
        for (i, (token, plate)) in [
            ("AAAA2222", "KA01AB1234"),
            ("BBBB3333", "MH12XY9876"),
            ("CCCC4444", "KA05AB7777"),
        ]
        .into_iter()
        .enumerate()
        {
            let mut b = booking(&lot, user::Id::new(), token);
            b.vehicle.plate = plate.parse().unwrap();
            b.created_at = DateTime::from_unix_timestamp(1_000 + i as i64)
                .unwrap()
                .coerce();
            if i == 1 {
                b.status = booking::Status::Cancelled;
            }
            expected.push(b.id);
            db.execute(Insert(b)).await.unwrap();
        }
        db.execute(Insert(booking(&other, user::Id::new(), "DDDD5555")))
            .await
            .unwrap();

        let list = |filter: Filter| {
            db.execute(Select(By::new(read::booking::list::Selector {
                arguments: read::booking::list::Arguments::new(
                    Some(10),
                    None,
                    10,
                )
                .unwrap(),
                filter,
            })))
        };
        let ids = |page: read::booking::list::Page| {
            page.edges.into_iter().map(|e| e.node.id).collect::<Vec<_>>()
        };

        let all = list(Filter {
            scope: Scope::Lot(lot.id),
            status: None,
            plate: None,
        })
        .await
        .unwrap();
        assert_eq!(ids(all), [expected[2], expected[1], expected[0]]);

        let confirmed = list(Filter {
            scope: Scope::Lot(lot.id),
            status: Some(booking::Status::Confirmed),
            plate: None,
        })
        .await
        .unwrap();
        assert_eq!(ids(confirmed), [expected[2], expected[0]]);

        let by_plate = list(Filter {
            scope: Scope::Lot(lot.id),
            status: None,
            plate: PlateSearch::new("ab"),
        })
        .await
        .unwrap();
        assert_eq!(ids(by_plate), [expected[2], expected[0]]);

        let nothing = list(Filter {
            scope: Scope::Lot(lot.id),
            status: Some(booking::Status::Cancelled),
            plate: PlateSearch::new("KA"),
        })
        .await
        .unwrap();
        assert!(nothing.edges.is_empty());
    }

    #[tokio::test]
    async fn searches_lots_by_any_word() {
        let db = Memory::new();
        let mall = lot(5);
        let mut station = lot(5);
        station.name = Name::new("Railway Station").unwrap();
        db.execute(Insert(mall.clone())).await.unwrap();
        db.execute(Insert(station.clone())).await.unwrap();

        let search = |query: &str| {
            db.execute(Select(By::new(read::lot::list::Selector {
                arguments: read::lot::list::Arguments::new(Some(10), None, 10)
                    .unwrap(),
                filter: read::lot::list::Filter {
                    query: Some(query.into()),
                    ..read::lot::list::Filter::default()
                },
            })))
        };

        let page = search("railway").await.unwrap();
        assert_eq!(page.edges.len(), 1);
        assert_eq!(page.edges[0].node.id, station.id);

        let page = search("MALL station").await.unwrap();
        assert_eq!(page.edges.len(), 2);
    }
}
