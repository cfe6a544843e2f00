//! [`Nearby`] [`Query`] definition.

use common::operations::{By, Select};
use tracerr::Traced;

use crate::{
    domain::{lot, Lot},
    infra::{database, Database},
    read, Query, Service,
};

/// [`Query`] of the active [`Lot`]s within a [`lot::Radius`] from a point,
/// nearest first.
#[derive(Clone, Copy, Debug)]
pub struct Nearby {
    /// Point to search around.
    pub location: lot::Coordinates,

    /// Search [`lot::Radius`].
    pub radius: lot::Radius,
}

impl<Db> Query<Nearby> for Service<Db>
where
    Db: Database<
        Select<By<Vec<Lot>, lot::Area>>,
        Ok = Vec<Lot>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Vec<read::lot::Nearby>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Nearby { location, radius }: Nearby,
    ) -> Result<Self::Ok, Self::Err> {
        let candidates = self
            .database()
            .execute(Select(By::new(location.area_within(radius))))
            .await
            .map_err(tracerr::wrap!())?;

        let mut found = candidates
            .into_iter()
            .filter_map(|lot| {
                let distance = location.distance_to(&lot.location);
                (distance <= radius.meters())
                    .then_some(read::lot::Nearby { lot, distance })
            })
            .collect::<Vec<_>>();
        found.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        Ok(found)
    }
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{CreateLot, DeactivateLot},
        domain::lot::{Address, Capacity, Coordinates, Name, Price, Radius},
        spec::{operator, operator_of, service},
        Command as _, Query as _,
    };

    use super::Nearby;

    fn lot_at(latitude: f64, longitude: f64) -> CreateLot {
        CreateLot {
            actor: operator(),
            name: Name::new(format!("Lot at {latitude},{longitude}")).unwrap(),
            address: Address::new("Somewhere").unwrap(),
            location: Coordinates::new(latitude, longitude).unwrap(),
            total_slots: Capacity::new(5).unwrap(),
            price_per_hour: Price::new("40INR".parse().unwrap()).unwrap(),
        }
    }

    #[tokio::test]
    async fn finds_active_lots_nearest_first() {
        let svc = service();
        // Roughly 1.1 km, 3.3 km and 11 km to the north.
        let near = svc.execute(lot_at(12.01, 77.0)).await.unwrap();
        let far = svc.execute(lot_at(12.03, 77.0)).await.unwrap();
        let outside = svc.execute(lot_at(12.1, 77.0)).await.unwrap();
        let closed = svc.execute(lot_at(12.005, 77.0)).await.unwrap();
        _ = svc
            .execute(DeactivateLot {
                actor: operator_of(&closed),
                lot_id: closed.id,
            })
            .await
            .unwrap();

        let found = svc
            .execute(Nearby {
                location: Coordinates::new(12.0, 77.0).unwrap(),
                radius: Radius::DEFAULT,
            })
            .await
            .unwrap();

        let ids = found.iter().map(|n| n.lot.id).collect::<Vec<_>>();
        assert_eq!(ids, [near.id, far.id]);
        assert!(!ids.contains(&outside.id));
        assert!((found[0].distance - 1_112.0).abs() < 5.0);
    }
}
