//! Shared fixtures and end-to-end scenarios of the [`Service`].

use std::time::Duration;

use jsonwebtoken::DecodingKey;

use crate::{
    command::{CreateBooking, CreateLot},
    domain::{
        booking::{self, vehicle, Vehicle},
        lot::{Address, Capacity, Coordinates, Name, Price},
        user::{self, Role},
        Booking, Lot,
    },
    infra::{advisor, Memory},
    task, Command as _, Config, Service,
};

/// Secret the test [`Service`] verifies session tokens with.
pub(crate) const JWT_SECRET: &[u8] = b"parking-test-secret";

/// Creates a new [`Service`] backed by an empty [`Memory`] database, without
/// background tasks and with the advisor disabled.
pub(crate) fn service() -> Service<Memory> {
    Service::without_tasks(
        Config {
            jwt_decoding_key: DecodingKey::from_secret(JWT_SECRET),
            expire_overdue_bookings:
                task::expire_overdue_bookings::Config::default(),
            advisor: advisor::Config {
                timeout: Duration::from_secs(1),
                ..advisor::Config::default()
            },
            relay_capacity: 64,
        },
        Memory::new(),
    )
}

fn actor(role: Role) -> user::Actor {
    user::Actor {
        id: user::Id::new(),
        role,
    }
}

/// Returns a new [`Role::Driver`].
pub(crate) fn driver() -> user::Actor {
    actor(Role::Driver)
}

/// Returns a new [`Role::Operator`] owning no lots.
pub(crate) fn operator() -> user::Actor {
    actor(Role::Operator)
}

/// Returns a new [`Role::Admin`].
pub(crate) fn admin() -> user::Actor {
    actor(Role::Admin)
}

/// Returns the operator of the provided [`Lot`].
pub(crate) fn operator_of(lot: &Lot) -> user::Actor {
    user::Actor {
        id: lot.operator_id,
        role: Role::Operator,
    }
}

/// Returns the driver owning the provided [`Booking`].
pub(crate) fn owner_of(booking: &Booking) -> user::Actor {
    user::Actor {
        id: booking.user_id,
        role: Role::Driver,
    }
}

/// Returns a sample [`Vehicle`].
pub(crate) fn vehicle() -> Vehicle {
    Vehicle {
        name: vehicle::Name::new("Daily hatchback").unwrap(),
        plate: vehicle::Plate::new("KA01AB1234").unwrap(),
        kind: vehicle::Kind::Car,
    }
}

/// Creates a new [`Lot`] with the provided number of slots, charging
/// `50INR` per hour.
pub(crate) async fn lot(svc: &Service<Memory>, slots: u16) -> Lot {
    svc.execute(CreateLot {
        actor: operator(),
        name: Name::new("Central Mall").unwrap(),
        address: Address::new("1 Main St").unwrap(),
        location: Coordinates::new(12.9716, 77.5946).unwrap(),
        total_slots: Capacity::new(slots).unwrap(),
        price_per_hour: Price::new("50INR".parse().unwrap()).unwrap(),
    })
    .await
    .unwrap()
}

/// Books a single hour in the provided [`Lot`] by a new driver.
pub(crate) async fn book(svc: &Service<Memory>, lot: &Lot) -> Booking {
    svc.execute(CreateBooking {
        actor: driver(),
        lot_id: lot.id,
        vehicle: vehicle(),
        duration: booking::Hours::new(1).unwrap(),
        starts_at: None,
    })
    .await
    .unwrap()
}

/// Occupies `n` slots of the provided [`Lot`] with new [`Booking`]s.
pub(crate) async fn occupy(svc: &Service<Memory>, lot: &Lot, n: u16) {
    for _ in 0..n {
        _ = book(svc, lot).await;
    }
}

mod scenario {
    use std::collections::HashSet;

    use common::operations::{By, Release, Select};

    use crate::{
        command::{
            create_booking, CheckInBooking, CheckOutBooking, CreateBooking,
            CreateLot,
        },
        domain::{
            booking,
            lot::{Address, Capacity, Coordinates, Name, Price},
            Booking, Lot,
        },
        infra::{Database as _, Memory},
        Command as _, Service,
    };

    use super::{
        book, driver, lot, occupy, operator, owner_of, service, vehicle,
    };

    async fn available(svc: &Service<Memory>, lot: &Lot) -> u16 {
        svc.database()
            .execute(Select(By::<Option<Lot>, _>::new(lot.id)))
            .await
            .unwrap()
            .unwrap()
            .available_slots()
    }

    #[tokio::test]
    async fn single_slot_lifecycle() {
        let svc = service();
        let lot = svc
            .execute(CreateLot {
                actor: operator(),
                name: Name::new("Corner Spot").unwrap(),
                address: Address::new("7 Lake View").unwrap(),
                location: Coordinates::new(12.93, 77.62).unwrap(),
                total_slots: Capacity::new(1).unwrap(),
                price_per_hour: Price::new("100INR".parse().unwrap())
                    .unwrap(),
            })
            .await
            .unwrap();
        let create = |hours| CreateBooking {
            actor: driver(),
            lot_id: lot.id,
            vehicle: vehicle(),
            duration: booking::Hours::new(hours).unwrap(),
            starts_at: None,
        };

        let first = svc.execute(create(2)).await.unwrap();
        assert_eq!(first.amount(), "200INR".parse().unwrap());
        assert_eq!(available(&svc, &lot).await, 0);

        let err = svc.execute(create(1)).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            create_booking::ExecutionError::NoSlotsAvailable(_),
        ));

        let owner = owner_of(&first);
        _ = svc
            .execute(CheckInBooking {
                actor: owner,
                booking_id: first.id,
            })
            .await
            .unwrap();
        let done = svc
            .execute(CheckOutBooking {
                actor: owner,
                booking_id: first.id,
            })
            .await
            .unwrap();
        assert_eq!(done.status, booking::Status::Completed);
        assert_eq!(available(&svc, &lot).await, 1);

        assert!(svc.execute(create(1)).await.is_ok());
        assert_eq!(available(&svc, &lot).await, 0);
    }

    #[tokio::test]
    async fn qr_tokens_are_unique_and_resolvable() {
        let svc = service();
        let lot = lot(&svc, 50).await;
        let mut seen = HashSet::new();

        for _ in 0..50 {
            let booking = book(&svc, &lot).await;
            assert!(seen.insert(booking.qr_token.clone()));

            let found = svc
                .database()
                .execute(Select(By::<Option<Booking>, _>::new(
                    booking.qr_token.clone(),
                )))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(found.id, booking.id);
        }
    }

    #[tokio::test]
    async fn available_stays_within_total() {
        let svc = service();
        let lot = lot(&svc, 4).await;
        occupy(&svc, &lot, 4).await;
        assert_eq!(available(&svc, &lot).await, 0);

        for _ in 0..10 {
            _ = svc
                .database()
                .execute(Release(By::<Option<Lot>, _>::new(lot.id)))
                .await
                .unwrap();
        }
        assert_eq!(available(&svc, &lot).await, 4);
    }
}
