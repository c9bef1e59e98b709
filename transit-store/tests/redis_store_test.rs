//! Exercises the Lua scripts behind `RedisStore` against a live server.
//!
//! Run with `REDIS_URL=redis://127.0.0.1:6379 cargo test -p transit-store -- --ignored`.
//! Every test works on freshly generated ids, so a shared server is fine.

use std::collections::BTreeSet;
use std::env;

use chrono::{Duration, Utc};
use transit_core::repository::{BookingStore, FleetStore, SeatClaim, StatusChange, TripStore};
use transit_shared::pii::Masked;
use transit_shared::{
    Booking, Operator, PaymentStatus, Route, SeatRejection, Trip, TripPlan, TripStatus,
};
use transit_store::RedisStore;
use uuid::Uuid;

async fn store() -> RedisStore {
    let url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    RedisStore::new(&url).await.expect("Redis must be running")
}

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

fn trip(trip_id: &str, total: u32, withdrawn: BTreeSet<u32>) -> Trip {
    let start = Utc::now() + Duration::hours(2);
    Trip::new(TripPlan {
        trip_id: trip_id.to_string(),
        route_id: Uuid::new_v4(),
        bus_ntc_no: "NTC-1001".to_string(),
        start_time: start,
        end_time: start + Duration::hours(3),
        service_date: start.date_naive(),
        total_seats: total,
        withdrawn_seats: withdrawn,
    })
}

fn route(number: &str) -> Route {
    let now = Utc::now();
    Route {
        id: Uuid::new_v4(),
        number: number.to_string(),
        start: "Colombo".to_string(),
        end: "Kandy".to_string(),
        total_distance: "115 km".to_string(),
        created_at: now,
        updated_at: now,
    }
}

fn operator(email: &str) -> Operator {
    let now = Utc::now();
    Operator {
        id: Uuid::new_v4(),
        email: Masked(email.to_string()),
        name: None,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn test_concurrent_claims_on_one_seat() {
    let store = store().await;
    let trip_id = unique("T");
    assert!(store.insert_trip(&trip(&trip_id, 4, BTreeSet::new())).await.unwrap());

    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = store.clone();
        let trip_id = trip_id.clone();
        handles.push(tokio::spawn(async move { store.reserve_seat(&trip_id, 2).await }));
    }
    let mut reserved = 0;
    let mut taken = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            SeatClaim::Reserved(_) => reserved += 1,
            SeatClaim::Rejected(SeatRejection::Taken) => taken += 1,
            other => panic!("unexpected claim outcome {:?}", other),
        }
    }
    assert_eq!(reserved, 1);
    assert_eq!(taken, 15);

    let trip = store.get_trip(&trip_id).await.unwrap().unwrap();
    assert_eq!(trip.booked_seats, BTreeSet::from([2]));
    assert_eq!(trip.available_seats, 3);
    assert!(trip.occupancy_balanced());
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn test_claim_rejections_and_idempotent_release() {
    let store = store().await;
    let trip_id = unique("T");
    store
        .insert_trip(&trip(&trip_id, 3, BTreeSet::from([3])))
        .await
        .unwrap();

    assert!(matches!(
        store.reserve_seat(&trip_id, 4).await.unwrap(),
        SeatClaim::Rejected(SeatRejection::OutOfRange)
    ));
    assert!(matches!(
        store.reserve_seat(&trip_id, 3).await.unwrap(),
        SeatClaim::Rejected(SeatRejection::Withdrawn)
    ));
    assert!(matches!(
        store.reserve_seat(&unique("missing"), 1).await.unwrap(),
        SeatClaim::TripNotFound
    ));

    store.reserve_seat(&trip_id, 1).await.unwrap();
    let released = store.release_seat(&trip_id, 1).await.unwrap().unwrap();
    assert_eq!(released.available_seats, 3);
    let again = store.release_seat(&trip_id, 1).await.unwrap().unwrap();
    assert_eq!(again.available_seats, 3);
    assert!(again.booked_seats.is_empty());
    assert!(store.release_seat(&unique("missing"), 1).await.unwrap().is_none());
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn test_trip_ids_with_colons_do_not_collide() {
    let store = store().await;
    let base = unique("A");
    let shadow = format!("{}:booked", base);
    assert!(store.insert_trip(&trip(&shadow, 2, BTreeSet::new())).await.unwrap());
    assert!(store.insert_trip(&trip(&base, 2, BTreeSet::new())).await.unwrap());

    assert!(matches!(
        store.reserve_seat(&base, 1).await.unwrap(),
        SeatClaim::Reserved(_)
    ));
    let shadow_trip = store.get_trip(&shadow).await.unwrap().unwrap();
    assert!(shadow_trip.booked_seats.is_empty());
    assert_eq!(shadow_trip.available_seats, 2);
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn test_trip_status_changes_once() {
    let store = store().await;
    let trip_id = unique("T");
    store.insert_trip(&trip(&trip_id, 2, BTreeSet::new())).await.unwrap();

    assert!(matches!(
        store.transition_trip(&trip_id, TripStatus::Cancelled).await.unwrap(),
        StatusChange::Applied(t) if t.status == TripStatus::Cancelled
    ));
    assert!(matches!(
        store.transition_trip(&trip_id, TripStatus::Completed).await.unwrap(),
        StatusChange::Refused(TripStatus::Cancelled)
    ));
    assert!(matches!(
        store.reserve_seat(&trip_id, 1).await.unwrap(),
        SeatClaim::Rejected(SeatRejection::NotScheduled(TripStatus::Cancelled))
    ));
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn test_booking_status_moves_between_indexes() {
    let store = store().await;
    let trip_id = unique("T");
    let rider = unique("rider");
    let booking = Booking::pending(&trip_id, &rider, 1);
    assert!(store.insert_booking(&booking).await.unwrap());
    assert!(!store.insert_booking(&booking).await.unwrap());

    let pending_ids = |list: Vec<Booking>| {
        list.into_iter()
            .map(|b| b.booking_id)
            .collect::<BTreeSet<_>>()
    };
    assert!(pending_ids(store.bookings_with_status(PaymentStatus::Pending).await.unwrap())
        .contains(&booking.booking_id));

    let applied = store
        .transition_booking(&booking.booking_id, PaymentStatus::Pending, PaymentStatus::Confirmed)
        .await
        .unwrap();
    assert!(matches!(applied, StatusChange::Applied(b) if b.payment_status == PaymentStatus::Confirmed));
    assert!(matches!(
        store
            .transition_booking(&booking.booking_id, PaymentStatus::Pending, PaymentStatus::Cancelled)
            .await
            .unwrap(),
        StatusChange::Refused(PaymentStatus::Confirmed)
    ));

    assert!(!pending_ids(store.bookings_with_status(PaymentStatus::Pending).await.unwrap())
        .contains(&booking.booking_id));
    assert!(pending_ids(store.bookings_with_status(PaymentStatus::Confirmed).await.unwrap())
        .contains(&booking.booking_id));
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn test_delete_booking_clears_indexes() {
    let store = store().await;
    let trip_id = unique("T");
    let rider = unique("rider");
    let booking = Booking::pending(&trip_id, &rider, 2);
    store.insert_booking(&booking).await.unwrap();
    assert_eq!(store.bookings_for_rider(&rider).await.unwrap().len(), 1);
    assert_eq!(store.bookings_for_trip(&trip_id).await.unwrap().len(), 1);

    assert!(store.delete_booking(&booking.booking_id).await.unwrap());
    assert!(!store.delete_booking(&booking.booking_id).await.unwrap());
    assert!(store.get_booking(&booking.booking_id).await.unwrap().is_none());
    assert!(store.bookings_for_rider(&rider).await.unwrap().is_empty());
    assert!(store.bookings_for_trip(&trip_id).await.unwrap().is_empty());
    assert!(!store
        .bookings_with_status(PaymentStatus::Pending)
        .await
        .unwrap()
        .iter()
        .any(|b| b.booking_id == booking.booking_id));
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn test_route_number_and_operator_email_are_unique() {
    let store = store().await;
    let number = unique("R");
    let first = route(&number);
    assert!(store.insert_route(&first).await.unwrap());
    assert!(!store.insert_route(&route(&number)).await.unwrap());
    // Deleting the route frees its number.
    assert!(store.delete_route(first.id).await.unwrap());
    assert!(store.insert_route(&route(&number)).await.unwrap());

    let email = format!("{}@example.com", Uuid::new_v4());
    let op = operator(&email);
    assert!(store.insert_operator(&op).await.unwrap());
    assert!(!store
        .insert_operator(&operator(&email.to_uppercase()))
        .await
        .unwrap());
    assert!(store.delete_operator(op.id).await.unwrap());
    assert!(store.insert_operator(&operator(&email)).await.unwrap());
}
