//! [`Query`] collection related to the multiple [`Booking`]s.

use common::operations::By;

use crate::read::booking::list;
#[cfg(doc)]
use crate::{domain::Booking, Query};

use super::DatabaseQuery;

/// Queries a list of [`Booking`]s of a single user or [`Lot`], newest first.
///
/// [`Lot`]: crate::domain::Lot
pub type List = DatabaseQuery<By<list::Page, list::Selector>>;

#[cfg(test)]
mod spec {
    use crate::{
        command::CancelBooking,
        domain::booking,
        read::booking::list::{Arguments, Filter, Scope, Selector},
        spec::{book, lot, owner_of, service},
        Command as _, Query as _,
    };

    use super::List;

    #[tokio::test]
    async fn lists_bookings_of_lot_only() {
        let svc = service();
        let lot = lot(&svc, 5).await;
        let other = self::lot(&svc, 5).await;

        let first = book(&svc, &lot).await;
        let second = book(&svc, &lot).await;
        _ = book(&svc, &other).await;
        svc.execute(CancelBooking {
            actor: owner_of(&first),
            booking_id: first.id,
            reason: None,
        })
        .await
        .unwrap();

        let list = |status| {
            svc.execute(List::by(Selector {
                arguments: Arguments::new(Some(10), None, 10).unwrap(),
                filter: Filter {
                    scope: Scope::Lot(lot.id),
                    status,
                    plate: None,
                },
            }))
        };

        let all = list(None).await.unwrap();
        assert!(!all.has_next_page);
        let mut ids = all.edges.iter().map(|e| e.node.id).collect::<Vec<_>>();
        ids.sort_unstable();
        let mut expected = vec![first.id, second.id];
        expected.sort_unstable();
        assert_eq!(ids, expected);

        let cancelled = list(Some(booking::Status::Cancelled)).await.unwrap();
        assert_eq!(
            cancelled.edges.iter().map(|e| e.node.id).collect::<Vec<_>>(),
            [first.id],
        );
    }
}
